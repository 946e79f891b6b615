use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use super::error::{classify_insert_error, StoreError};
use super::rack_groups::RackGroupRepo;
use super::row_helpers::{exactly_one, map_rack_row};

/// Rack database operations
pub struct RackRepo;

impl RackRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Rack>> {
        let rows = sqlx::query("SELECT * FROM racks ORDER BY site_id, name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_rack_row).collect())
    }

    pub async fn list_for_group(conn: &mut SqliteConnection, group_id: i64) -> Result<Vec<Rack>> {
        let rows = sqlx::query("SELECT * FROM racks WHERE group_id = ? ORDER BY row_position")
            .bind(group_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_rack_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Rack>> {
        let row = sqlx::query("SELECT * FROM racks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_rack_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, site_id: i64, name: &str) -> Result<Rack> {
        let rows = sqlx::query("SELECT * FROM racks WHERE site_id = ? AND name = ?")
            .bind(site_id)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_rack_row(&exactly_one(rows, "Rack", name)?))
    }

    /// Create a rack. Its group, when given, must belong to the same site.
    pub async fn create(conn: &mut SqliteConnection, req: &CreateRackRequest) -> Result<Rack> {
        if let Some(group_id) = req.group_id {
            let group = RackGroupRepo::get(conn, group_id)
                .await?
                .ok_or_else(|| StoreError::not_found("RackGroup", group_id.to_string()))?;
            if group.site_id != req.site_id {
                return Err(StoreError::constraint(
                    "Rack",
                    format!("{} is in a different site than rack group {}", req.name, group.name),
                )
                .into());
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO racks (name, group_id, site_id, status_id, u_height, row_position, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(req.group_id)
        .bind(req.site_id)
        .bind(req.status_id)
        .bind(RACK_U_HEIGHT)
        .bind(req.row_position)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "Rack", &req.name))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Rack not found after creation")
    }
}
