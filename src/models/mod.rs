use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical status slugs
pub mod status_slug {
    pub const ACTIVE: &str = "active";
    pub const PLANNED: &str = "planned";
    pub const STAGED: &str = "staged";
    pub const FAILED: &str = "failed";
    pub const OFFLINE: &str = "offline";
    pub const DECOMMISSIONING: &str = "decommissioning";
    pub const CONNECTED: &str = "connected";
}

/// Record kind labels, used for status applicability and export model names
pub mod model_label {
    pub const STATUS: &str = "extras.status";
    pub const REGION: &str = "dcim.region";
    pub const SITE: &str = "dcim.site";
    pub const MANUFACTURER: &str = "dcim.manufacturer";
    pub const DEVICE_ROLE: &str = "dcim.devicerole";
    pub const DEVICE_TYPE: &str = "dcim.devicetype";
    pub const INTERFACE_TEMPLATE: &str = "dcim.interfacetemplate";
    pub const RACK_GROUP: &str = "dcim.rackgroup";
    pub const RACK: &str = "dcim.rack";
    pub const DEVICE: &str = "dcim.device";
    pub const INTERFACE: &str = "dcim.interface";
    pub const CABLE: &str = "dcim.cable";
}

/// Canonical interface type values
pub mod interface_type {
    pub const TYPE_1GE_FIXED: &str = "1000base-t";
    pub const TYPE_10GE_FIXED: &str = "10gbase-t";
    pub const TYPE_10GE_SFP_PLUS: &str = "10gbase-x-sfpp";
    pub const TYPE_100GE_QSFP28: &str = "100gbase-x-qsfp28";

    pub const ALL: &[&str] = &[TYPE_1GE_FIXED, TYPE_10GE_FIXED, TYPE_10GE_SFP_PLUS, TYPE_100GE_QSFP28];

    pub fn is_valid(value: &str) -> bool {
        ALL.contains(&value)
    }
}

/// Rack face a device is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RackFace {
    Front,
    Rear,
}

impl RackFace {
    pub fn as_str(&self) -> &'static str {
        match self {
            RackFace::Front => "front",
            RackFace::Rear => "rear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "front" => Some(RackFace::Front),
            "rear" => Some(RackFace::Rear),
            _ => None,
        }
    }
}

/// Status is a lifecycle state that applies to a set of record kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub content_types: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Region is a node in the geographic region tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRegionRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Site is a physical location attached to a region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<i64>,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    #[serde(default)]
    pub region_id: Option<i64>,
    pub status_id: i64,
}

/// Manufacturer of network equipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// DeviceRole is the functional category of a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRole {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub vm_role: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRoleRequest {
    pub name: String,
    #[serde(default)]
    pub vm_role: bool,
}

/// DeviceType is a hardware model from a manufacturer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: i64,
    pub manufacturer_id: i64,
    pub model: String,
    pub slug: String,
    pub u_height: i32,
    pub is_full_depth: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceTypeRequest {
    pub manufacturer_id: i64,
    pub model: String,
    #[serde(default = "default_u_height")]
    pub u_height: i32,
    #[serde(default = "default_full_depth")]
    pub is_full_depth: bool,
}

pub fn default_u_height() -> i32 {
    1
}

pub fn default_full_depth() -> bool {
    true
}

/// InterfaceTemplate is copied onto every device of its device type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceTemplate {
    pub id: i64,
    pub device_type_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    pub created_at: DateTime<Utc>,
}

/// RackGroup groups racks within a site (e.g. one group per row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackGroup {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub site_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRackGroupRequest {
    pub name: String,
    pub site_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Rack is a numbered cabinet in a row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rack {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub site_id: i64,
    pub status_id: i64,
    pub u_height: i32,
    pub row_position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRackRequest {
    pub name: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    pub site_id: i64,
    pub status_id: i64,
    #[serde(default)]
    pub row_position: i32,
}

/// Default height of a generated rack, in rack units
pub const RACK_U_HEIGHT: i32 = 42;

/// Device is a piece of equipment mounted in a rack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub device_role_id: i64,
    pub device_type_id: i64,
    pub site_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<RackFace>,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub device_role_id: i64,
    pub device_type_id: i64,
    pub site_id: i64,
    #[serde(default)]
    pub rack_id: Option<i64>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub face: Option<RackFace>,
    pub status_id: i64,
}

/// Interface is a physical port on a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub id: i64,
    pub device_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cable_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Cable joins exactly two interfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cable {
    pub id: i64,
    pub termination_a_id: i64,
    pub termination_b_id: i64,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCableRequest {
    pub termination_a_id: i64,
    pub termination_b_id: i64,
    pub status_id: i64,
}

/// Number of records of each kind currently in the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub regions: i64,
    pub sites: i64,
    pub manufacturers: i64,
    pub device_roles: i64,
    pub device_types: i64,
    pub interface_templates: i64,
    pub rack_groups: i64,
    pub racks: i64,
    pub devices: i64,
    pub interfaces: i64,
    pub cables: i64,
}
