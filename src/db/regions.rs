use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use crate::utils::slugify;
use super::error::classify_insert_error;
use super::row_helpers::{exactly_one, map_region_row};

/// Region database operations
pub struct RegionRepo;

impl RegionRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Region>> {
        let rows = sqlx::query("SELECT * FROM regions ORDER BY name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_region_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Region>> {
        let row = sqlx::query("SELECT * FROM regions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_region_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Region> {
        let rows = sqlx::query("SELECT * FROM regions WHERE name = ?")
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_region_row(&exactly_one(rows, "Region", name)?))
    }

    pub async fn list_children(conn: &mut SqliteConnection, parent_id: i64) -> Result<Vec<Region>> {
        let rows = sqlx::query("SELECT * FROM regions WHERE parent_id = ? ORDER BY name")
            .bind(parent_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_region_row).collect())
    }

    pub async fn create(conn: &mut SqliteConnection, req: &CreateRegionRequest) -> Result<Region> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO regions (name, slug, parent_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&req.name)
            .bind(slugify(&req.name))
            .bind(req.parent_id)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| classify_insert_error(e, "Region", &req.name))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Region not found after creation")
    }
}
