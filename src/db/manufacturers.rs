use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use crate::utils::slugify;
use super::error::classify_insert_error;
use super::row_helpers::{exactly_one, map_manufacturer_row};

/// Manufacturer database operations
pub struct ManufacturerRepo;

impl ManufacturerRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Manufacturer>> {
        let rows = sqlx::query("SELECT * FROM manufacturers ORDER BY name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_manufacturer_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Manufacturer>> {
        let row = sqlx::query("SELECT * FROM manufacturers WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_manufacturer_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Manufacturer> {
        let rows = sqlx::query("SELECT * FROM manufacturers WHERE name = ?")
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_manufacturer_row(&exactly_one(rows, "Manufacturer", name)?))
    }

    pub async fn create(conn: &mut SqliteConnection, name: &str) -> Result<Manufacturer> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO manufacturers (name, slug, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(slugify(name))
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| classify_insert_error(e, "Manufacturer", name))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Manufacturer not found after creation")
    }
}
