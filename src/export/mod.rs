//! Fixture export. Records are written as `{"model", "fields"}` objects with
//! every reference expressed as the referenced record's natural key, so the
//! file loads into any store regardless of surrogate ids.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqliteConnection;

use crate::db::*;
use crate::models::*;

/// Record kinds left out of an export unless the caller overrides the list
pub const DEFAULT_EXCLUDES: &[&str] = &["extras.job", "extras.customfield", "auth.permission", "contenttypes"];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// `app` or `app.kind` labels to skip
    pub exclude: Vec<String>,
    pub indent: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            indent: 4,
        }
    }
}

impl ExportOptions {
    pub fn is_excluded(&self, label: &str) -> bool {
        let app = label.split('.').next().unwrap_or(label);
        self.exclude.iter().any(|e| e == label || e == app)
    }
}

/// One exported record
#[derive(Debug, Clone, Serialize)]
pub struct FixtureRecord {
    pub model: &'static str,
    /// Only kinds without a natural key keep their surrogate id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pk: Option<i64>,
    pub fields: Value,
}

impl FixtureRecord {
    fn natural(model: &'static str, fields: Value) -> Self {
        Self { model, pk: None, fields }
    }
}

/// Natural keys of already-exported records, by surrogate id
#[derive(Default)]
struct KeyIndex {
    statuses: HashMap<i64, Value>,
    regions: HashMap<i64, Value>,
    sites: HashMap<i64, Value>,
    manufacturers: HashMap<i64, Value>,
    device_roles: HashMap<i64, Value>,
    device_types: HashMap<i64, Value>,
    rack_groups: HashMap<i64, Value>,
    racks: HashMap<i64, Value>,
    devices: HashMap<i64, Value>,
    interfaces: HashMap<i64, Value>,
}

fn key_of(index: &HashMap<i64, Value>, id: i64, resource: &str) -> Result<Value> {
    index
        .get(&id)
        .cloned()
        .ok_or_else(|| StoreError::not_found(resource, id.to_string()).into())
}

fn optional_key(index: &HashMap<i64, Value>, id: Option<i64>, resource: &str) -> Result<Value> {
    match id {
        Some(id) => key_of(index, id, resource),
        None => Ok(Value::Null),
    }
}

/// Read the whole store into fixture records, parents before children.
///
/// Natural keys are indexed even for excluded kinds so references to them
/// still resolve.
pub async fn collect_fixture(conn: &mut SqliteConnection, options: &ExportOptions) -> Result<Vec<FixtureRecord>> {
    let mut keys = KeyIndex::default();
    let mut records = Vec::new();
    let mut emit = |record: FixtureRecord| {
        if !options.is_excluded(record.model) {
            records.push(record);
        }
    };

    for status in StatusRepo::list(conn).await? {
        keys.statuses.insert(status.id, json!([status.slug]));
        emit(FixtureRecord::natural(
            model_label::STATUS,
            json!({
                "name": status.name,
                "slug": status.slug,
                "color": status.color,
                "content_types": status.content_types,
            }),
        ));
    }

    let mut regions = RegionRepo::list(conn).await?;
    regions.sort_by_key(|r| r.id);
    for region in &regions {
        keys.regions.insert(region.id, json!([region.name]));
    }
    for region in regions {
        emit(FixtureRecord::natural(
            model_label::REGION,
            json!({
                "name": region.name,
                "slug": region.slug,
                "parent": optional_key(&keys.regions, region.parent_id, "Region")?,
            }),
        ));
    }

    let mut sites = SiteRepo::list(conn).await?;
    sites.sort_by_key(|s| s.id);
    for site in sites {
        keys.sites.insert(site.id, json!([site.name]));
        emit(FixtureRecord::natural(
            model_label::SITE,
            json!({
                "name": site.name,
                "slug": site.slug,
                "region": optional_key(&keys.regions, site.region_id, "Region")?,
                "status": key_of(&keys.statuses, site.status_id, "Status")?,
            }),
        ));
    }

    let mut manufacturers = ManufacturerRepo::list(conn).await?;
    manufacturers.sort_by_key(|m| m.id);
    for manufacturer in manufacturers {
        keys.manufacturers.insert(manufacturer.id, json!([manufacturer.name]));
        emit(FixtureRecord::natural(
            model_label::MANUFACTURER,
            json!({ "name": manufacturer.name, "slug": manufacturer.slug }),
        ));
    }

    let mut roles = DeviceRoleRepo::list(conn).await?;
    roles.sort_by_key(|r| r.id);
    for role in roles {
        keys.device_roles.insert(role.id, json!([role.slug]));
        emit(FixtureRecord::natural(
            model_label::DEVICE_ROLE,
            json!({ "name": role.name, "slug": role.slug, "vm_role": role.vm_role }),
        ));
    }

    let mut device_types = DeviceTypeRepo::list(conn).await?;
    device_types.sort_by_key(|d| d.id);
    for dt in device_types {
        let manufacturer = key_of(&keys.manufacturers, dt.manufacturer_id, "Manufacturer")?;
        keys.device_types.insert(dt.id, json!([manufacturer[0], dt.model]));
        emit(FixtureRecord::natural(
            model_label::DEVICE_TYPE,
            json!({
                "manufacturer": manufacturer,
                "model": dt.model,
                "slug": dt.slug,
                "u_height": dt.u_height,
                "is_full_depth": dt.is_full_depth,
            }),
        ));
    }

    for template in InterfaceTemplateRepo::list(conn).await? {
        emit(FixtureRecord::natural(
            model_label::INTERFACE_TEMPLATE,
            json!({
                "device_type": key_of(&keys.device_types, template.device_type_id, "DeviceType")?,
                "name": template.name,
                "type": template.interface_type,
            }),
        ));
    }

    let mut groups = RackGroupRepo::list(conn).await?;
    groups.sort_by_key(|g| g.id);
    for group in &groups {
        let site = key_of(&keys.sites, group.site_id, "Site")?;
        keys.rack_groups.insert(group.id, json!([site[0], group.name]));
    }
    for group in groups {
        emit(FixtureRecord::natural(
            model_label::RACK_GROUP,
            json!({
                "name": group.name,
                "slug": group.slug,
                "site": key_of(&keys.sites, group.site_id, "Site")?,
                "parent": optional_key(&keys.rack_groups, group.parent_id, "RackGroup")?,
            }),
        ));
    }

    let mut racks = RackRepo::list(conn).await?;
    racks.sort_by_key(|r| r.id);
    for rack in racks {
        let site = key_of(&keys.sites, rack.site_id, "Site")?;
        keys.racks.insert(rack.id, json!([site[0], rack.name]));
        emit(FixtureRecord::natural(
            model_label::RACK,
            json!({
                "name": rack.name,
                "site": site,
                "group": optional_key(&keys.rack_groups, rack.group_id, "RackGroup")?,
                "status": key_of(&keys.statuses, rack.status_id, "Status")?,
                "u_height": rack.u_height,
                "row_position": rack.row_position,
            }),
        ));
    }

    let mut devices = DeviceRepo::list(conn).await?;
    devices.sort_by_key(|d| d.id);
    for device in devices {
        let site = key_of(&keys.sites, device.site_id, "Site")?;
        keys.devices.insert(device.id, json!([site[0], device.name]));
        emit(FixtureRecord::natural(
            model_label::DEVICE,
            json!({
                "name": device.name,
                "device_role": key_of(&keys.device_roles, device.device_role_id, "DeviceRole")?,
                "device_type": key_of(&keys.device_types, device.device_type_id, "DeviceType")?,
                "site": site,
                "rack": optional_key(&keys.racks, device.rack_id, "Rack")?,
                "position": device.position,
                "face": device.face.map(|f| f.as_str()).unwrap_or(""),
                "status": key_of(&keys.statuses, device.status_id, "Status")?,
            }),
        ));
    }

    for iface in InterfaceRepo::list(conn).await? {
        let device = key_of(&keys.devices, iface.device_id, "Device")?;
        keys.interfaces.insert(iface.id, json!([device[0], device[1], iface.name]));
        emit(FixtureRecord::natural(
            model_label::INTERFACE,
            json!({
                "device": device,
                "name": iface.name,
                "type": iface.interface_type,
                "cable": iface.cable_id,
            }),
        ));
    }

    for cable in CableRepo::list(conn).await? {
        emit(FixtureRecord {
            model: model_label::CABLE,
            pk: Some(cable.id),
            fields: json!({
                "termination_a": key_of(&keys.interfaces, cable.termination_a_id, "Interface")?,
                "termination_b": key_of(&keys.interfaces, cable.termination_b_id, "Interface")?,
                "status": key_of(&keys.statuses, cable.status_id, "Status")?,
            }),
        });
    }

    Ok(records)
}

/// Serialize records as an indented JSON array
pub fn render_fixture(records: &[FixtureRecord], indent: usize) -> Result<Vec<u8>> {
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser).context("Failed to serialize fixture")?;
    buf.push(b'\n');
    Ok(buf)
}

/// Export the store to `path`. Returns the number of records written.
pub async fn write_fixture(conn: &mut SqliteConnection, path: &Path, options: &ExportOptions) -> Result<usize> {
    let records = collect_fixture(conn, options).await?;
    let data = render_fixture(&records, options.indent)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write fixture {}", path.display()))?;

    tracing::info!("Exported {} records to {}", records.len(), path.display());
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::generate::plan::DatacenterPlan;
    use crate::generate::{self, ExportTarget, RunOptions, TopologyPlan, TransactionMode};

    fn small_plan() -> TopologyPlan {
        TopologyPlan {
            datacenters: vec![DatacenterPlan { code: "STL".to_string(), site: "St Louis Datacenter".to_string() }],
            rows: 1,
            racks_per_row: 2,
            ..TopologyPlan::default()
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("topology-seed-{}", std::process::id()))
            .join(name)
    }

    fn of_model<'a>(records: &'a [Value], model: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        records.iter().filter(move |r| r["model"] == model)
    }

    #[test]
    fn test_exclusion_matches_app_or_label() {
        let options = ExportOptions::default();
        assert!(options.is_excluded("contenttypes.contenttype"));
        assert!(options.is_excluded("extras.job"));
        assert!(!options.is_excluded("extras.status"));
        assert!(!options.is_excluded(model_label::DEVICE));

        let options = ExportOptions { exclude: vec!["dcim".to_string()], indent: 2 };
        assert!(options.is_excluded(model_label::CABLE));
    }

    #[test]
    fn test_render_fixture_indent() {
        let records = vec![FixtureRecord::natural(model_label::MANUFACTURER, json!({ "name": "Cisco" }))];
        let text = String::from_utf8(render_fixture(&records, 2).unwrap()).unwrap();
        assert!(text.starts_with("[\n  {\n    \"model\": \"dcim.manufacturer\""));
        assert!(!text.contains("\"pk\""));
        assert!(text.ends_with("]\n"));
    }

    #[tokio::test]
    async fn test_rollback_export_uses_natural_keys() {
        let store = assert_ok!(Store::in_memory().await);
        let path = temp_path("rollback.json");
        let options = RunOptions {
            mode: TransactionMode::Rollback,
            export: Some(ExportTarget { path: path.clone(), options: ExportOptions::default() }),
        };

        let report = assert_ok!(generate::run(&store, &small_plan(), &options).await);
        assert_eq!(assert_ok!(store.counts().await), RecordCounts::default());

        let data = tokio::fs::read(&path).await.unwrap();
        let records: Vec<Value> = serde_json::from_slice(&data).unwrap();
        assert_eq!(Some(records.len()), report.exported_records);

        assert_eq!(of_model(&records, model_label::STATUS).count(), 7);
        assert_eq!(of_model(&records, model_label::DEVICE).count(), 5);
        assert_eq!(of_model(&records, model_label::CABLE).count(), 8);
        assert!(records
            .iter()
            .all(|r| r.get("pk").is_some() == (r["model"] == model_label::CABLE)));

        let eor = of_model(&records, model_label::DEVICE)
            .find(|r| r["fields"]["name"] == "stl-spn1")
            .unwrap();
        assert_eq!(eor["fields"]["site"], json!(["St Louis Datacenter"]));
        assert_eq!(eor["fields"]["rack"], json!(["St Louis Datacenter", "STL 1-1"]));
        assert_eq!(eor["fields"]["device_type"], json!(["Cisco", "Nexus 9332C"]));
        assert_eq!(eor["fields"]["device_role"], json!(["end-of-row-switch"]));

        let cable = of_model(&records, model_label::CABLE).next().unwrap();
        assert_eq!(cable["fields"]["termination_a"], json!(["St Louis Datacenter", "stl-leaf1-1-1", "Ethernet1"]));
        assert_eq!(cable["fields"]["termination_b"], json!(["St Louis Datacenter", "stl-spn1", "Ethernet1"]));
        assert_eq!(cable["fields"]["status"], json!(["connected"]));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_excluded_kinds_are_skipped() {
        let store = assert_ok!(Store::in_memory().await);
        let mut tx = store.begin().await.unwrap();
        assert_ok!(generate::generate(&mut tx, &small_plan()).await);

        let options = ExportOptions { exclude: vec![model_label::INTERFACE.to_string(), "extras".to_string()], indent: 4 };
        let records = assert_ok!(collect_fixture(&mut tx, &options).await);
        assert!(records.iter().all(|r| r.model != model_label::INTERFACE && r.model != model_label::STATUS));
        assert_eq!(records.iter().filter(|r| r.model == model_label::CABLE).count(), 8);
    }
}
