use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use crate::models::*;
use super::device_types::DeviceTypeRepo;
use super::error::{classify_insert_error, StoreError};
use super::racks::RackRepo;
use super::row_helpers::{exactly_one, map_device_row, map_interface_row};

/// Device database operations
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Device>> {
        let rows = sqlx::query("SELECT * FROM devices ORDER BY site_id, name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Device>> {
        let row = sqlx::query("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, site_id: i64, name: &str) -> Result<Device> {
        let rows = sqlx::query("SELECT * FROM devices WHERE site_id = ? AND name = ?")
            .bind(site_id)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_device_row(&exactly_one(rows, "Device", name)?))
    }

    /// Create a device and instantiate its interfaces from the device type's templates
    pub async fn create(conn: &mut SqliteConnection, req: &CreateDeviceRequest) -> Result<Device> {
        let device_type = DeviceTypeRepo::get(conn, req.device_type_id)
            .await?
            .ok_or_else(|| StoreError::not_found("DeviceType", req.device_type_id.to_string()))?;
        Self::check_placement(conn, req, &device_type).await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, device_role_id, device_type_id, site_id, rack_id, position, face, status_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(req.device_role_id)
        .bind(req.device_type_id)
        .bind(req.site_id)
        .bind(req.rack_id)
        .bind(req.position)
        .bind(req.face.map(|f| f.as_str()).unwrap_or(""))
        .bind(req.status_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "Device", &req.name))?;
        let device_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO interfaces (device_id, name, type, created_at)
            SELECT ?, name, type, ? FROM interface_templates WHERE device_type_id = ? ORDER BY id
            "#,
        )
        .bind(device_id)
        .bind(now)
        .bind(req.device_type_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to instantiate interfaces for {}", req.name))?;

        Self::get(conn, device_id)
            .await?
            .context("Device not found after creation")
    }

    /// Validate rack membership and rack-unit occupancy for a new device
    async fn check_placement(conn: &mut SqliteConnection, req: &CreateDeviceRequest, device_type: &DeviceType) -> Result<()> {
        let Some(rack_id) = req.rack_id else {
            if req.position.is_some() {
                return Err(StoreError::constraint("Device", format!("{} has a position but no rack", req.name)).into());
            }
            return Ok(());
        };

        let rack = RackRepo::get(conn, rack_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Rack", rack_id.to_string()))?;
        if rack.site_id != req.site_id {
            return Err(StoreError::constraint(
                "Device",
                format!("{} is assigned to rack {} in a different site", req.name, rack.name),
            )
            .into());
        }

        let Some(position) = req.position else {
            return Ok(());
        };
        let Some(face) = req.face else {
            return Err(StoreError::constraint("Device", format!("{} has a position but no face", req.name)).into());
        };
        if device_type.u_height == 0 {
            return Ok(());
        }

        let top = position + device_type.u_height - 1;
        if position < 1 || top > rack.u_height {
            return Err(StoreError::constraint(
                "Device",
                format!("{} at U{} does not fit in rack {} ({}U)", req.name, position, rack.name, rack.u_height),
            )
            .into());
        }

        let occupants = sqlx::query(
            r#"
            SELECT d.name, d.position, d.face, t.u_height, t.is_full_depth
            FROM devices d
            JOIN device_types t ON t.id = d.device_type_id
            WHERE d.rack_id = ? AND d.position IS NOT NULL AND t.u_height > 0
            "#,
        )
        .bind(rack_id)
        .fetch_all(&mut *conn)
        .await?;

        for row in &occupants {
            let other_position: i32 = row.get("position");
            let other_height: i32 = row.get("u_height");
            let other_face: String = row.get("face");
            let other_full_depth: i32 = row.get("is_full_depth");

            let overlaps = position <= other_position + other_height - 1 && other_position <= top;
            let same_side = device_type.is_full_depth || other_full_depth == 1 || other_face == face.as_str();
            if overlaps && same_side {
                let other_name: String = row.get("name");
                return Err(StoreError::constraint(
                    "Device",
                    format!("{} at U{} collides with {} in rack {}", req.name, position, other_name, rack.name),
                )
                .into());
            }
        }
        Ok(())
    }
}

/// Interface database operations
pub struct InterfaceRepo;

impl InterfaceRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Interface>> {
        let rows = sqlx::query("SELECT * FROM interfaces ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_interface_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Interface>> {
        let row = sqlx::query("SELECT * FROM interfaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_interface_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, device_id: i64, name: &str) -> Result<Interface> {
        let rows = sqlx::query("SELECT * FROM interfaces WHERE device_id = ? AND name = ?")
            .bind(device_id)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_interface_row(&exactly_one(rows, "Interface", name)?))
    }

    pub async fn list_for_device(conn: &mut SqliteConnection, device_id: i64) -> Result<Vec<Interface>> {
        let rows = sqlx::query("SELECT * FROM interfaces WHERE device_id = ? ORDER BY id")
            .bind(device_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_interface_row).collect())
    }
}
