use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{default_full_depth, default_u_height, interface_type, RACK_U_HEIGHT};
use crate::utils::{expand_name_pattern, slugify, ExpandError};
use super::cabling::{eor_ports_required, interface_name, TORS_PER_RACK, UPLINKS_PER_TOR};

/// Problems found in a plan before anything is written
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("{kind} name declared twice: {name}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{kind} '{name}' references unknown {target} '{reference}'")]
    UnknownReference {
        kind: &'static str,
        name: String,
        target: &'static str,
        reference: String,
    },
    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),
    #[error("interface pattern for {model}: {source}")]
    Pattern {
        model: String,
        #[source]
        source: ExpandError,
    },
    #[error("unknown interface type {interface_type} for {model}")]
    UnknownInterfaceType { model: String, interface_type: String },
    #[error("device type {model} is missing interface {interface}")]
    MissingInterface { model: String, interface: String },
    #[error("rack position U{0} is outside the rack")]
    PositionOutOfRack(i32),
    #[error("switch positions overlap at U{0}")]
    PositionOverlap(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionPlan {
    pub name: String,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePlan {
    pub region: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfacePatternPlan {
    pub pattern: String,
    #[serde(rename = "type")]
    pub interface_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTypePlan {
    pub manufacturer: String,
    pub model: String,
    #[serde(default = "default_u_height")]
    pub u_height: i32,
    #[serde(default = "default_full_depth")]
    pub is_full_depth: bool,
    #[serde(default)]
    pub interfaces: Vec<InterfacePatternPlan>,
}

/// A datacenter site that gets rows of racks and switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterPlan {
    pub code: String,
    pub site: String,
}

/// Which roles and types the row switches use, and where they mount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchPlan {
    pub eor_role: String,
    pub tor_role: String,
    pub eor_device_type: String,
    pub tor_device_type: String,
    pub eor_position: i32,
    pub tor_positions: [i32; TORS_PER_RACK as usize],
}

/// Everything a generation run creates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyPlan {
    pub regions: Vec<RegionPlan>,
    pub sites: Vec<SitePlan>,
    pub manufacturers: Vec<String>,
    pub device_roles: Vec<String>,
    pub device_types: Vec<DeviceTypePlan>,
    pub datacenters: Vec<DatacenterPlan>,
    pub rows: u32,
    pub racks_per_row: u32,
    pub switches: SwitchPlan,
}

impl TopologyPlan {
    /// Load a plan from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Failed to parse plan {}", path.display()))
    }

    /// Expanded interface names per device type slug
    pub fn expanded_interfaces(&self) -> Result<HashMap<String, Vec<(String, String)>>, PlanError> {
        let mut by_type = HashMap::new();
        for dt in &self.device_types {
            let mut names = Vec::new();
            for iface in &dt.interfaces {
                let expanded = expand_name_pattern(&iface.pattern).map_err(|source| PlanError::Pattern {
                    model: dt.model.clone(),
                    source,
                })?;
                names.extend(expanded.into_iter().map(|n| (n, iface.interface_type.clone())));
            }
            by_type.insert(slugify(&dt.model), names);
        }
        Ok(by_type)
    }

    /// Check the plan is internally consistent and that the row switches can be cabled
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.rows == 0 {
            return Err(PlanError::ZeroCount("rows"));
        }
        if self.racks_per_row == 0 {
            return Err(PlanError::ZeroCount("racks_per_row"));
        }

        let mut regions = HashSet::new();
        for region in &self.regions {
            for name in std::iter::once(&region.name).chain(&region.children) {
                if !regions.insert(name.as_str()) {
                    return Err(PlanError::DuplicateName { kind: "region", name: name.clone() });
                }
            }
        }

        let mut sites = HashSet::new();
        for group in &self.sites {
            if !regions.contains(group.region.as_str()) {
                return Err(unknown("site group", &group.region, "region", &group.region));
            }
            for name in &group.names {
                if !sites.insert(name.as_str()) {
                    return Err(PlanError::DuplicateName { kind: "site", name: name.clone() });
                }
            }
        }

        let manufacturers: HashSet<&str> = unique(&self.manufacturers, "manufacturer")?;
        let roles: HashSet<String> = unique(&self.device_roles, "device role")?
            .into_iter()
            .map(slugify)
            .collect();

        let mut models = HashSet::new();
        for dt in &self.device_types {
            if !manufacturers.contains(dt.manufacturer.as_str()) {
                return Err(unknown("device type", &dt.model, "manufacturer", &dt.manufacturer));
            }
            if !models.insert(slugify(&dt.model)) {
                return Err(PlanError::DuplicateName { kind: "device type", name: dt.model.clone() });
            }
            for iface in &dt.interfaces {
                if !interface_type::is_valid(&iface.interface_type) {
                    return Err(PlanError::UnknownInterfaceType {
                        model: dt.model.clone(),
                        interface_type: iface.interface_type.clone(),
                    });
                }
            }
        }

        let mut codes = HashSet::new();
        for dc in &self.datacenters {
            if !sites.contains(dc.site.as_str()) {
                return Err(unknown("datacenter", &dc.code, "site", &dc.site));
            }
            if !codes.insert(dc.code.as_str()) {
                return Err(PlanError::DuplicateName { kind: "datacenter", name: dc.code.clone() });
            }
        }

        let sw = &self.switches;
        for role in [&sw.eor_role, &sw.tor_role] {
            if !roles.contains(role) {
                return Err(unknown("switch plan", role, "device role", role));
            }
        }
        for model in [&sw.eor_device_type, &sw.tor_device_type] {
            if !models.contains(model) {
                return Err(unknown("switch plan", model, "device type", model));
            }
        }

        // Per-type duplicates are left to the store's uniqueness constraint
        let expanded = self.expanded_interfaces()?;
        let has_interface = |model: &str, number: u32| {
            let name = interface_name(number);
            expanded
                .get(model)
                .map(|names| names.iter().any(|(n, _)| *n == name))
                .unwrap_or(false)
        };
        for number in 1..=eor_ports_required(self.racks_per_row) {
            if !has_interface(sw.eor_device_type.as_str(), number) {
                return Err(PlanError::MissingInterface {
                    model: sw.eor_device_type.clone(),
                    interface: interface_name(number),
                });
            }
        }
        for number in 1..=UPLINKS_PER_TOR {
            if !has_interface(sw.tor_device_type.as_str(), number) {
                return Err(PlanError::MissingInterface {
                    model: sw.tor_device_type.clone(),
                    interface: interface_name(number),
                });
            }
        }

        self.validate_positions()
    }

    /// Switch heights are checked by the store on placement; here only the slots themselves
    fn validate_positions(&self) -> Result<(), PlanError> {
        let sw = &self.switches;
        let mut used = HashSet::new();
        for position in std::iter::once(sw.eor_position).chain(sw.tor_positions) {
            if position < 1 || position > RACK_U_HEIGHT {
                return Err(PlanError::PositionOutOfRack(position));
            }
            if !used.insert(position) {
                return Err(PlanError::PositionOverlap(position));
            }
        }
        Ok(())
    }
}

fn unique<'a>(names: &'a [String], kind: &'static str) -> Result<HashSet<&'a str>, PlanError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(PlanError::DuplicateName { kind, name: name.clone() });
        }
    }
    Ok(seen)
}

fn unknown(kind: &'static str, name: &str, target: &'static str, reference: &str) -> PlanError {
    PlanError::UnknownReference {
        kind,
        name: name.to_string(),
        target,
        reference: reference.to_string(),
    }
}

fn region(name: &str, children: &[&str]) -> RegionPlan {
    RegionPlan {
        name: name.to_string(),
        children: children.iter().map(|c| c.to_string()).collect(),
    }
}

fn sites(region: &str, names: &[&str]) -> SitePlan {
    SitePlan {
        region: region.to_string(),
        names: names.iter().map(|n| n.to_string()).collect(),
    }
}

fn cisco(model: &str, u_height: i32, is_full_depth: bool, interfaces: &[(&str, &str)]) -> DeviceTypePlan {
    DeviceTypePlan {
        manufacturer: "Cisco".to_string(),
        model: model.to_string(),
        u_height,
        is_full_depth,
        interfaces: interfaces
            .iter()
            .map(|(pattern, t)| InterfacePatternPlan {
                pattern: pattern.to_string(),
                interface_type: t.to_string(),
            })
            .collect(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for TopologyPlan {
    /// Two datacenters (PHX, STL) of 8 rows x 8 racks, plus the surrounding
    /// regions, offices and hardware catalogue
    fn default() -> Self {
        use interface_type::*;

        Self {
            regions: vec![
                region("Americas", &["Argentina", "Brazil", "Canada", "Chile", "Mexico", "USA"]),
                region("APAC", &["Australia", "Indonesia", "Japan", "South Korea"]),
                region("EMEA", &["France", "Germany", "Italy", "Spain", "United Kingdom"]),
            ],
            sites: vec![
                sites("Germany", &["Frankfurt Office"]),
                sites("United Kingdom", &["London Office"]),
                sites(
                    "USA",
                    &["Los Angeles Office", "Phoenix Datacenter", "St Louis Datacenter", "Seattle Office"],
                ),
                sites("Mexico", &["Mexico City Office"]),
                sites("South Korea", &["Seoul Office"]),
                sites("Australia", &["Sydney Office"]),
            ],
            manufacturers: strings(&["Arista", "Aruba", "Brocade", "Checkpoint", "Cisco", "Juniper", "Palo Alto"]),
            device_roles: strings(&[
                "Access switch",
                "CE router",
                "Core switch",
                "Distribution switch",
                "End of row switch",
                "Firewall",
                "Top of rack switch",
            ]),
            device_types: vec![
                cisco("C2921", 2, false, &[("GigabitEthernet[0-2]", TYPE_1GE_FIXED)]),
                cisco(
                    "C9300L-48T-4X",
                    1,
                    false,
                    &[
                        ("GigabitEthernet1/0/[1-48]", TYPE_1GE_FIXED),
                        ("TengigabitEthernet1/1/[1-4]", TYPE_10GE_FIXED),
                    ],
                ),
                cisco("Nexus 3232C", 1, true, &[("Ethernet[1-32]", TYPE_100GE_QSFP28)]),
                cisco("Nexus 9332C", 1, true, &[("Ethernet[1-32]", TYPE_100GE_QSFP28)]),
                cisco("Nexus 9508", 13, true, &[("Ethernet1/[1-8]/[1-32]", TYPE_100GE_QSFP28)]),
            ],
            datacenters: vec![
                DatacenterPlan { code: "PHX".to_string(), site: "Phoenix Datacenter".to_string() },
                DatacenterPlan { code: "STL".to_string(), site: "St Louis Datacenter".to_string() },
            ],
            rows: 8,
            racks_per_row: 8,
            switches: SwitchPlan {
                eor_role: "end-of-row-switch".to_string(),
                tor_role: "top-of-rack-switch".to_string(),
                eor_device_type: "nexus-9332c".to_string(),
                tor_device_type: "nexus-3232c".to_string(),
                eor_position: 42,
                tor_positions: [41, 40],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_valid() {
        assert_eq!(TopologyPlan::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_plan_interface_counts() {
        let expanded = TopologyPlan::default().expanded_interfaces().unwrap();
        assert_eq!(expanded["c2921"].len(), 3);
        assert_eq!(expanded["c9300l-48t-4x"].len(), 52);
        assert_eq!(expanded["nexus-3232c"].len(), 32);
        assert_eq!(expanded["nexus-9332c"].len(), 32);
        assert_eq!(expanded["nexus-9508"].len(), 256);
    }

    #[test]
    fn test_row_too_wide_for_eor() {
        let mut plan = TopologyPlan::default();
        plan.racks_per_row = 9;
        assert_eq!(
            plan.validate(),
            Err(PlanError::MissingInterface {
                model: "nexus-9332c".to_string(),
                interface: "Ethernet33".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_datacenter_site() {
        let mut plan = TopologyPlan::default();
        plan.datacenters.push(DatacenterPlan { code: "AMS".to_string(), site: "Amsterdam Datacenter".to_string() });
        assert!(matches!(plan.validate(), Err(PlanError::UnknownReference { target: "site", .. })));
    }

    #[test]
    fn test_duplicate_region() {
        let mut plan = TopologyPlan::default();
        plan.regions[1].children.push("Canada".to_string());
        assert_eq!(
            plan.validate(),
            Err(PlanError::DuplicateName { kind: "region", name: "Canada".to_string() })
        );
    }

    #[test]
    fn test_zero_rows() {
        let mut plan = TopologyPlan::default();
        plan.rows = 0;
        assert_eq!(plan.validate(), Err(PlanError::ZeroCount("rows")));
    }

    #[test]
    fn test_overlapping_switch_positions() {
        let mut plan = TopologyPlan::default();
        plan.switches.tor_positions = [41, 42];
        assert_eq!(plan.validate(), Err(PlanError::PositionOverlap(42)));
    }

    #[test]
    fn test_plan_json_roundtrip_defaults() {
        let json = r#"{
            "regions": [{"name": "Americas", "children": ["USA"]}],
            "sites": [{"region": "USA", "names": ["Phoenix Datacenter"]}],
            "manufacturers": ["Cisco"],
            "device_roles": ["End of row switch", "Top of rack switch"],
            "device_types": [
                {"manufacturer": "Cisco", "model": "Nexus 3232C", "interfaces": [{"pattern": "Ethernet[1-32]", "type": "100gbase-x-qsfp28"}]},
                {"manufacturer": "Cisco", "model": "Nexus 9332C", "interfaces": [{"pattern": "Ethernet[1-32]", "type": "100gbase-x-qsfp28"}]}
            ],
            "datacenters": [{"code": "PHX", "site": "Phoenix Datacenter"}],
            "rows": 2,
            "racks_per_row": 3,
            "switches": {
                "eor_role": "end-of-row-switch",
                "tor_role": "top-of-rack-switch",
                "eor_device_type": "nexus-9332c",
                "tor_device_type": "nexus-3232c",
                "eor_position": 42,
                "tor_positions": [41, 40]
            }
        }"#;
        let plan: TopologyPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.device_types[0].u_height, 1);
        assert!(plan.device_types[0].is_full_depth);
        assert_eq!(plan.validate(), Ok(()));
    }
}
