//! Generation stages. Each stage takes the records earlier stages produced
//! and returns its own, so the pipeline order is fixed by the signatures.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::SqliteConnection;

use crate::db::*;
use crate::models::*;
use super::cabling::{interface_name, uplink_ports, TORS_PER_RACK};
use super::plan::TopologyPlan;

pub fn all_racks_group_name(code: &str) -> String {
    format!("{} Datacenter Racks (ALL)", code)
}

pub fn row_group_name(code: &str, row: u32) -> String {
    format!("{} Row {}", code, row)
}

pub fn rack_name(code: &str, row: u32, rack: u32) -> String {
    format!("{} {}-{}", code, row, rack)
}

pub fn eor_name(code: &str, row: u32) -> String {
    format!("{}-spn{}", code.to_lowercase(), row)
}

pub fn tor_name(code: &str, row: u32, rack: u32, slot: u32) -> String {
    format!("{}-leaf{}-{}-{}", code.to_lowercase(), row, rack, slot)
}

// ========== Stage outputs ==========

pub struct RegionSet {
    pub top_level: Vec<Region>,
    pub by_name: HashMap<String, Region>,
}

pub struct SiteSet {
    pub by_name: HashMap<String, Site>,
}

pub struct ManufacturerSet {
    pub by_name: HashMap<String, Manufacturer>,
}

pub struct RoleSet {
    pub by_slug: HashMap<String, DeviceRole>,
}

pub struct DeviceTypeSet {
    pub by_slug: HashMap<String, DeviceType>,
    pub interface_templates: usize,
}

pub struct RowGroup {
    pub row: u32,
    pub group: RackGroup,
}

/// Rack-group hierarchy of one datacenter
pub struct DatacenterRows {
    pub code: String,
    pub site: Site,
    pub all_racks: RackGroup,
    pub rows: Vec<RowGroup>,
}

pub struct RowRacks {
    pub row: u32,
    pub group: RackGroup,
    /// Ordered by position in the row, starting at 1
    pub racks: Vec<Rack>,
}

pub struct DatacenterRacks {
    pub code: String,
    pub site: Site,
    pub rows: Vec<RowRacks>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchSummary {
    pub eor_switches: usize,
    pub tor_switches: usize,
    pub cables: usize,
}

// ========== Stages ==========

pub async fn create_regions(conn: &mut SqliteConnection, plan: &TopologyPlan) -> Result<RegionSet> {
    let mut set = RegionSet { top_level: Vec::new(), by_name: HashMap::new() };

    for region in &plan.regions {
        let parent = RegionRepo::create(conn, &CreateRegionRequest { name: region.name.clone(), parent_id: None }).await?;
        for child in &region.children {
            let child = RegionRepo::create(
                conn,
                &CreateRegionRequest { name: child.clone(), parent_id: Some(parent.id) },
            )
            .await?;
            set.by_name.insert(child.name.clone(), child);
        }
        set.by_name.insert(parent.name.clone(), parent.clone());
        set.top_level.push(parent);
    }

    tracing::info!("Created {} regions under {} top-level regions", set.by_name.len(), set.top_level.len());
    Ok(set)
}

pub async fn create_sites(conn: &mut SqliteConnection, plan: &TopologyPlan, regions: &RegionSet) -> Result<SiteSet> {
    let active = StatusRepo::get_for_model(conn, model_label::SITE, status_slug::ACTIVE).await?;
    let mut set = SiteSet { by_name: HashMap::new() };

    for group in &plan.sites {
        let region = regions
            .by_name
            .get(&group.region)
            .ok_or_else(|| StoreError::not_found("Region", group.region.as_str()))?;
        for name in &group.names {
            let site = SiteRepo::create(
                conn,
                &CreateSiteRequest { name: name.clone(), region_id: Some(region.id), status_id: active.id },
            )
            .await?;
            set.by_name.insert(site.name.clone(), site);
        }
    }

    tracing::info!("Created {} sites", set.by_name.len());
    Ok(set)
}

pub async fn create_manufacturers(conn: &mut SqliteConnection, plan: &TopologyPlan) -> Result<ManufacturerSet> {
    let mut set = ManufacturerSet { by_name: HashMap::new() };
    for name in &plan.manufacturers {
        let manufacturer = ManufacturerRepo::create(conn, name).await?;
        set.by_name.insert(manufacturer.name.clone(), manufacturer);
    }
    tracing::info!("Created {} manufacturers", set.by_name.len());
    Ok(set)
}

pub async fn create_device_roles(conn: &mut SqliteConnection, plan: &TopologyPlan) -> Result<RoleSet> {
    let mut set = RoleSet { by_slug: HashMap::new() };
    for name in &plan.device_roles {
        let role = DeviceRoleRepo::create(conn, &CreateDeviceRoleRequest { name: name.clone(), vm_role: false }).await?;
        set.by_slug.insert(role.slug.clone(), role);
    }
    tracing::info!("Created {} device roles", set.by_slug.len());
    Ok(set)
}

/// Create device types, then one interface template per expanded pattern name
pub async fn create_device_types(
    conn: &mut SqliteConnection,
    plan: &TopologyPlan,
    manufacturers: &ManufacturerSet,
) -> Result<DeviceTypeSet> {
    let mut expanded = plan.expanded_interfaces()?;
    let mut set = DeviceTypeSet { by_slug: HashMap::new(), interface_templates: 0 };

    for dt in &plan.device_types {
        let manufacturer = manufacturers
            .by_name
            .get(&dt.manufacturer)
            .ok_or_else(|| StoreError::not_found("Manufacturer", dt.manufacturer.as_str()))?;
        let device_type = DeviceTypeRepo::create(
            conn,
            &CreateDeviceTypeRequest {
                manufacturer_id: manufacturer.id,
                model: dt.model.clone(),
                u_height: dt.u_height,
                is_full_depth: dt.is_full_depth,
            },
        )
        .await?;

        let names = expanded.remove(&device_type.slug).unwrap_or_default();
        for (name, iface_type) in &names {
            InterfaceTemplateRepo::create(conn, device_type.id, name, iface_type).await?;
        }
        tracing::debug!("Created {} interface templates for {}", names.len(), device_type.model);
        set.interface_templates += names.len();
        set.by_slug.insert(device_type.slug.clone(), device_type);
    }

    tracing::info!(
        "Created {} device types with {} interface templates",
        set.by_slug.len(),
        set.interface_templates
    );
    Ok(set)
}

/// One "(ALL)" group per datacenter site, with a child group per row
pub async fn create_rack_groups(
    conn: &mut SqliteConnection,
    plan: &TopologyPlan,
    sites: &SiteSet,
) -> Result<Vec<DatacenterRows>> {
    let mut datacenters = Vec::with_capacity(plan.datacenters.len());

    for dc in &plan.datacenters {
        let site = sites
            .by_name
            .get(&dc.site)
            .ok_or_else(|| StoreError::not_found("Site", dc.site.as_str()))?
            .clone();
        let all_racks = RackGroupRepo::create(
            conn,
            &CreateRackGroupRequest { name: all_racks_group_name(&dc.code), site_id: site.id, parent_id: None },
        )
        .await?;

        let mut rows = Vec::with_capacity(plan.rows as usize);
        for row in 1..=plan.rows {
            let group = RackGroupRepo::create(
                conn,
                &CreateRackGroupRequest {
                    name: row_group_name(&dc.code, row),
                    site_id: site.id,
                    parent_id: Some(all_racks.id),
                },
            )
            .await?;
            rows.push(RowGroup { row, group });
        }

        datacenters.push(DatacenterRows { code: dc.code.clone(), site, all_racks, rows });
    }

    let groups: usize = datacenters.iter().map(|dc| dc.rows.len() + 1).sum();
    tracing::info!("Created {} rack groups", groups);
    Ok(datacenters)
}

pub async fn create_racks(
    conn: &mut SqliteConnection,
    plan: &TopologyPlan,
    datacenters: Vec<DatacenterRows>,
) -> Result<Vec<DatacenterRacks>> {
    let active = StatusRepo::get_for_model(conn, model_label::RACK, status_slug::ACTIVE).await?;
    let mut out = Vec::with_capacity(datacenters.len());
    let mut total = 0;

    for dc in datacenters {
        tracing::debug!("Racking {} under {}", dc.code, dc.all_racks.name);
        let mut rows = Vec::with_capacity(dc.rows.len());
        for RowGroup { row, group } in dc.rows {
            let mut racks = Vec::with_capacity(plan.racks_per_row as usize);
            for rack_num in 1..=plan.racks_per_row {
                let rack = RackRepo::create(
                    conn,
                    &CreateRackRequest {
                        name: rack_name(&dc.code, row, rack_num),
                        group_id: Some(group.id),
                        site_id: dc.site.id,
                        status_id: active.id,
                        row_position: rack_num as i32,
                    },
                )
                .await?;
                racks.push(rack);
            }
            total += racks.len();
            rows.push(RowRacks { row, group, racks });
        }
        out.push(DatacenterRacks { code: dc.code, site: dc.site, rows });
    }

    tracing::info!("Created {} racks", total);
    Ok(out)
}

/// Mount an end-of-row switch in each row's first rack and two top-of-rack
/// switches in every rack, then cable each ToR's uplinks to the EoR
pub async fn create_switches(
    conn: &mut SqliteConnection,
    plan: &TopologyPlan,
    roles: &RoleSet,
    device_types: &DeviceTypeSet,
    datacenters: &[DatacenterRacks],
) -> Result<SwitchSummary> {
    let sw = &plan.switches;
    let active = StatusRepo::get_for_model(conn, model_label::DEVICE, status_slug::ACTIVE).await?;
    let connected = StatusRepo::get_for_model(conn, model_label::CABLE, status_slug::CONNECTED).await?;
    let role_eor = lookup(&roles.by_slug, &sw.eor_role, "DeviceRole")?;
    let role_tor = lookup(&roles.by_slug, &sw.tor_role, "DeviceRole")?;
    let type_eor = lookup(&device_types.by_slug, &sw.eor_device_type, "DeviceType")?;
    let type_tor = lookup(&device_types.by_slug, &sw.tor_device_type, "DeviceType")?;

    let mut summary = SwitchSummary::default();
    let row_width = plan.racks_per_row;

    for dc in datacenters {
        for row in &dc.rows {
            let first_rack = row
                .racks
                .first()
                .with_context(|| format!("{} has no racks", row.group.name))?;
            let eor = DeviceRepo::create(
                conn,
                &CreateDeviceRequest {
                    name: eor_name(&dc.code, row.row),
                    device_role_id: role_eor.id,
                    device_type_id: type_eor.id,
                    site_id: dc.site.id,
                    rack_id: Some(first_rack.id),
                    position: Some(sw.eor_position),
                    face: Some(RackFace::Front),
                    status_id: active.id,
                },
            )
            .await?;
            summary.eor_switches += 1;

            for rack in &row.racks {
                let rack_num = rack.row_position as u32;
                for slot in 1..=TORS_PER_RACK {
                    let tor = DeviceRepo::create(
                        conn,
                        &CreateDeviceRequest {
                            name: tor_name(&dc.code, row.row, rack_num, slot),
                            device_role_id: role_tor.id,
                            device_type_id: type_tor.id,
                            site_id: dc.site.id,
                            rack_id: Some(rack.id),
                            position: Some(sw.tor_positions[(slot - 1) as usize]),
                            face: Some(RackFace::Front),
                            status_id: active.id,
                        },
                    )
                    .await?;
                    summary.tor_switches += 1;

                    let eor_ports = uplink_ports(row_width, rack_num, slot)?;
                    summary.cables += connect_tor_to_eor(conn, &eor, &tor, &eor_ports, &connected).await?;
                }
            }
            tracing::debug!("Cabled row {} of {}", row.row, dc.code);
        }
    }

    tracing::info!(
        "Created {} end-of-row switches, {} top-of-rack switches, {} cables",
        summary.eor_switches,
        summary.tor_switches,
        summary.cables
    );
    Ok(summary)
}

/// Cable ToR `Ethernet1..` to the given EoR interface numbers, in order
async fn connect_tor_to_eor(
    conn: &mut SqliteConnection,
    eor: &Device,
    tor: &Device,
    eor_ports: &[u32],
    status: &Status,
) -> Result<usize> {
    for (i, eor_port) in eor_ports.iter().enumerate() {
        let tor_iface = InterfaceRepo::get_by_name(conn, tor.id, &interface_name(i as u32 + 1)).await?;
        let eor_iface = InterfaceRepo::get_by_name(conn, eor.id, &interface_name(*eor_port)).await?;
        CableRepo::create(
            conn,
            &CreateCableRequest {
                termination_a_id: tor_iface.id,
                termination_b_id: eor_iface.id,
                status_id: status.id,
            },
        )
        .await
        .with_context(|| format!("Failed to cable {} {} to {} {}", tor.name, tor_iface.name, eor.name, eor_iface.name))?;
    }
    Ok(eor_ports.len())
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, key: &str, resource: &str) -> Result<&'a T, StoreError> {
    map.get(key).ok_or_else(|| StoreError::not_found(resource, key))
}
