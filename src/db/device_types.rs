use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use crate::utils::slugify;
use super::error::{classify_insert_error, StoreError};
use super::row_helpers::{exactly_one, map_device_type_row, map_interface_template_row};

// ========== Device Type Repo ==========

pub struct DeviceTypeRepo;

impl DeviceTypeRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<DeviceType>> {
        let rows = sqlx::query("SELECT * FROM device_types ORDER BY model")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_device_type_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<DeviceType>> {
        let row = sqlx::query("SELECT * FROM device_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_device_type_row))
    }

    /// Model names are only unique per manufacturer, so this can match several rows
    pub async fn get_by_model(conn: &mut SqliteConnection, model: &str) -> Result<DeviceType> {
        let rows = sqlx::query("SELECT * FROM device_types WHERE model = ?")
            .bind(model)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_device_type_row(&exactly_one(rows, "DeviceType", model)?))
    }

    pub async fn get_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<DeviceType> {
        let rows = sqlx::query("SELECT * FROM device_types WHERE slug = ?")
            .bind(slug)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_device_type_row(&exactly_one(rows, "DeviceType", slug)?))
    }

    pub async fn create(conn: &mut SqliteConnection, req: &CreateDeviceTypeRequest) -> Result<DeviceType> {
        if req.u_height < 0 {
            return Err(StoreError::constraint("DeviceType", format!("{} has negative u_height", req.model)).into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO device_types (manufacturer_id, model, slug, u_height, is_full_depth, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(req.manufacturer_id)
        .bind(&req.model)
        .bind(slugify(&req.model))
        .bind(req.u_height)
        .bind(req.is_full_depth)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "DeviceType", &req.model))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("DeviceType not found after creation")
    }
}

// ========== Interface Template Repo ==========

pub struct InterfaceTemplateRepo;

impl InterfaceTemplateRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<InterfaceTemplate>> {
        let rows = sqlx::query("SELECT * FROM interface_templates ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_interface_template_row).collect())
    }

    pub async fn list_for_type(conn: &mut SqliteConnection, device_type_id: i64) -> Result<Vec<InterfaceTemplate>> {
        let rows = sqlx::query("SELECT * FROM interface_templates WHERE device_type_id = ? ORDER BY id")
            .bind(device_type_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_interface_template_row).collect())
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        device_type_id: i64,
        name: &str,
        interface_type: &str,
    ) -> Result<InterfaceTemplate> {
        if !interface_type::is_valid(interface_type) {
            return Err(StoreError::constraint("InterfaceTemplate", format!("unknown interface type {}", interface_type)).into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO interface_templates (device_type_id, name, type, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(device_type_id)
        .bind(name)
        .bind(interface_type)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "InterfaceTemplate", name))?;

        let row = sqlx::query("SELECT * FROM interface_templates WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *conn)
            .await?;
        Ok(map_interface_template_row(&row))
    }
}
