use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use crate::utils::slugify;
use super::error::classify_insert_error;
use super::row_helpers::{exactly_one, map_site_row};

/// Site database operations
pub struct SiteRepo;

impl SiteRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Site>> {
        let rows = sqlx::query("SELECT * FROM sites ORDER BY name")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_site_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Site>> {
        let row = sqlx::query("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_site_row))
    }

    pub async fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Site> {
        let rows = sqlx::query("SELECT * FROM sites WHERE name = ?")
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_site_row(&exactly_one(rows, "Site", name)?))
    }

    pub async fn get_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<Site> {
        let rows = sqlx::query("SELECT * FROM sites WHERE slug = ?")
            .bind(slug)
            .fetch_all(&mut *conn)
            .await?;
        Ok(map_site_row(&exactly_one(rows, "Site", slug)?))
    }

    pub async fn create(conn: &mut SqliteConnection, req: &CreateSiteRequest) -> Result<Site> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO sites (name, slug, region_id, status_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&req.name)
        .bind(slugify(&req.name))
        .bind(req.region_id)
        .bind(req.status_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "Site", &req.name))?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Site not found after creation")
    }
}
