use crate::models::{model_label, status_slug};

pub(super) struct DefaultStatus {
    pub name: &'static str,
    pub slug: &'static str,
    pub color: &'static str,
    pub content_types: &'static [&'static str],
}

/// Statuses every fresh store starts with
pub(super) fn default_statuses() -> Vec<DefaultStatus> {
    use model_label::{CABLE, DEVICE, RACK, SITE};

    vec![
        DefaultStatus { name: "Active", slug: status_slug::ACTIVE, color: "4caf50", content_types: &[SITE, RACK, DEVICE] },
        DefaultStatus { name: "Planned", slug: status_slug::PLANNED, color: "00bcd4", content_types: &[SITE, RACK, DEVICE, CABLE] },
        DefaultStatus { name: "Staged", slug: status_slug::STAGED, color: "2196f3", content_types: &[DEVICE] },
        DefaultStatus { name: "Failed", slug: status_slug::FAILED, color: "f44336", content_types: &[DEVICE] },
        DefaultStatus { name: "Offline", slug: status_slug::OFFLINE, color: "ffc107", content_types: &[DEVICE] },
        DefaultStatus { name: "Decommissioning", slug: status_slug::DECOMMISSIONING, color: "ffc107", content_types: &[SITE, RACK, DEVICE, CABLE] },
        DefaultStatus { name: "Connected", slug: status_slug::CONNECTED, color: "4caf50", content_types: &[CABLE] },
    ]
}
