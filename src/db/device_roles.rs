use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use crate::utils::slugify;
use super::error::classify_insert_error;
use super::row_helpers::{exactly_one, map_device_role_row};

// ========== Device Role Repo ==========

pub struct DeviceRoleRepo;

impl DeviceRoleRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<DeviceRole>> {
        let rows = sqlx::query("SELECT * FROM device_roles ORDER BY name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_device_role_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<DeviceRole>> {
        let row = sqlx::query("SELECT * FROM device_roles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_device_role_row))
    }

    pub async fn get_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<DeviceRole> {
        let rows = sqlx::query("SELECT * FROM device_roles WHERE slug = ?")
            .bind(slug)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_device_role_row(&exactly_one(rows, "DeviceRole", slug)?))
    }

    pub async fn create(conn: &mut SqliteConnection, req: &CreateDeviceRoleRequest) -> Result<DeviceRole> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO device_roles (name, slug, vm_role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&req.name)
        .bind(slugify(&req.name))
        .bind(req.vm_role)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "DeviceRole", &req.name))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("DeviceRole not found after creation")
    }
}
