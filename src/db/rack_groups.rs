use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use crate::utils::slugify;
use super::error::{classify_insert_error, StoreError};
use super::row_helpers::{exactly_one, map_rack_group_row};

/// Rack group database operations
pub struct RackGroupRepo;

impl RackGroupRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<RackGroup>> {
        let rows = sqlx::query("SELECT * FROM rack_groups ORDER BY site_id, name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_rack_group_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<RackGroup>> {
        let row = sqlx::query("SELECT * FROM rack_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_rack_group_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, site_id: i64, name: &str) -> Result<RackGroup> {
        let rows = sqlx::query("SELECT * FROM rack_groups WHERE site_id = ? AND name = ?")
            .bind(site_id)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_rack_group_row(&exactly_one(rows, "RackGroup", name)?))
    }

    pub async fn list_children(conn: &mut SqliteConnection, parent_id: i64) -> Result<Vec<RackGroup>> {
        let rows = sqlx::query("SELECT * FROM rack_groups WHERE parent_id = ? ORDER BY id")
            .bind(parent_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_rack_group_row).collect())
    }

    /// Create a rack group. A child group must live in its parent's site.
    pub async fn create(conn: &mut SqliteConnection, req: &CreateRackGroupRequest) -> Result<RackGroup> {
        if let Some(parent_id) = req.parent_id {
            let parent = Self::get(conn, parent_id)
                .await?
                .ok_or_else(|| StoreError::not_found("RackGroup", parent_id.to_string()))?;
            if parent.site_id != req.site_id {
                return Err(StoreError::constraint(
                    "RackGroup",
                    format!("{} is in a different site than its parent {}", req.name, parent.name),
                )
                .into());
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO rack_groups (name, slug, site_id, parent_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&req.name)
        .bind(slugify(&req.name))
        .bind(req.site_id)
        .bind(req.parent_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "RackGroup", &req.name))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("RackGroup not found after creation")
    }
}
