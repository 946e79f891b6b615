use sqlx::{Row, sqlite::SqliteRow};

use crate::models::*;
use super::error::StoreError;

/// Filter empty strings to None; the store writes '' instead of NULL for unset text
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// Reduce a get-by-attribute result set to exactly one row.
///
/// Zero rows is `NotFound`, more than one is `MultipleMatches`.
pub fn exactly_one(mut rows: Vec<SqliteRow>, resource: &str, key: &str) -> Result<SqliteRow, StoreError> {
    match rows.len() {
        0 => Err(StoreError::not_found(resource, key)),
        1 => Ok(rows.remove(0)),
        count => Err(StoreError::MultipleMatches {
            resource: resource.to_string(),
            key: key.to_string(),
            count,
        }),
    }
}

pub fn map_region_row(row: &SqliteRow) -> Region {
    Region {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
    }
}

pub fn map_site_row(row: &SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        region_id: row.get("region_id"),
        status_id: row.get("status_id"),
        created_at: row.get("created_at"),
    }
}

pub fn map_manufacturer_row(row: &SqliteRow) -> Manufacturer {
    Manufacturer {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
    }
}

pub fn map_device_role_row(row: &SqliteRow) -> DeviceRole {
    let vm_role: i32 = row.get("vm_role");
    DeviceRole {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        vm_role: vm_role == 1,
        created_at: row.get("created_at"),
    }
}

pub fn map_device_type_row(row: &SqliteRow) -> DeviceType {
    let is_full_depth: i32 = row.get("is_full_depth");
    DeviceType {
        id: row.get("id"),
        manufacturer_id: row.get("manufacturer_id"),
        model: row.get("model"),
        slug: row.get("slug"),
        u_height: row.get("u_height"),
        is_full_depth: is_full_depth == 1,
        created_at: row.get("created_at"),
    }
}

pub fn map_interface_template_row(row: &SqliteRow) -> InterfaceTemplate {
    InterfaceTemplate {
        id: row.get("id"),
        device_type_id: row.get("device_type_id"),
        name: row.get("name"),
        interface_type: row.get("type"),
        created_at: row.get("created_at"),
    }
}

pub fn map_rack_group_row(row: &SqliteRow) -> RackGroup {
    RackGroup {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        site_id: row.get("site_id"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
    }
}

pub fn map_rack_row(row: &SqliteRow) -> Rack {
    Rack {
        id: row.get("id"),
        name: row.get("name"),
        group_id: row.get("group_id"),
        site_id: row.get("site_id"),
        status_id: row.get("status_id"),
        u_height: row.get("u_height"),
        row_position: row.get("row_position"),
        created_at: row.get("created_at"),
    }
}

pub fn map_device_row(row: &SqliteRow) -> Device {
    Device {
        id: row.get("id"),
        name: row.get("name"),
        device_role_id: row.get("device_role_id"),
        device_type_id: row.get("device_type_id"),
        site_id: row.get("site_id"),
        rack_id: row.get("rack_id"),
        position: row.get("position"),
        face: none_if_empty(row.get("face")).and_then(|f| RackFace::parse(&f)),
        status_id: row.get("status_id"),
        created_at: row.get("created_at"),
    }
}

pub fn map_interface_row(row: &SqliteRow) -> Interface {
    Interface {
        id: row.get("id"),
        device_id: row.get("device_id"),
        name: row.get("name"),
        interface_type: row.get("type"),
        cable_id: row.get("cable_id"),
        created_at: row.get("created_at"),
    }
}

pub fn map_cable_row(row: &SqliteRow) -> Cable {
    Cable {
        id: row.get("id"),
        termination_a_id: row.get("termination_a_id"),
        termination_b_id: row.get("termination_b_id"),
        status_id: row.get("status_id"),
        created_at: row.get("created_at"),
    }
}
