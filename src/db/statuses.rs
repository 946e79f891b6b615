use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};

use crate::models::*;
use super::error::classify_insert_error;
use super::row_helpers::exactly_one;

fn map_status_row(row: &SqliteRow, content_types: Vec<String>) -> Status {
    Status {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        color: row.get("color"),
        content_types,
        created_at: row.get("created_at"),
    }
}

/// Status database operations
pub struct StatusRepo;

impl StatusRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Status>> {
        let rows = sqlx::query("SELECT * FROM statuses ORDER BY name")
            .fetch_all(&mut *conn)
            .await?;

        let mut statuses = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            let content_types = Self::content_types(conn, id).await?;
            statuses.push(map_status_row(row, content_types));
        }
        Ok(statuses)
    }

    pub async fn get_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<Option<Status>> {
        let row = sqlx::query("SELECT * FROM statuses WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => {
                let content_types = Self::content_types(conn, row.get("id")).await?;
                Ok(Some(map_status_row(&row, content_types)))
            }
            None => Ok(None),
        }
    }

    /// Look up a status by slug among the statuses applicable to `model`
    pub async fn get_for_model(conn: &mut SqliteConnection, model: &str, slug: &str) -> Result<Status> {
        let rows = sqlx::query(
            r#"
            SELECT s.* FROM statuses s
            JOIN status_content_types ct ON ct.status_id = s.id
            WHERE ct.model = ? AND s.slug = ?
            "#,
        )
        .bind(model)
        .bind(slug)
        .fetch_all(&mut *conn)
        .await?;

        let row = exactly_one(rows, "Status", &format!("{} for {}", slug, model))?;
        let content_types = Self::content_types(conn, row.get("id")).await?;
        Ok(map_status_row(&row, content_types))
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        name: &str,
        slug: &str,
        color: &str,
        content_types: &[&str],
    ) -> Result<Status> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO statuses (name, slug, color, created_at) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(slug)
            .bind(color)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| classify_insert_error(e, "Status", slug))?;

        let status_id = result.last_insert_rowid();
        for model in content_types {
            sqlx::query("INSERT INTO status_content_types (status_id, model) VALUES (?, ?)")
                .bind(status_id)
                .bind(model)
                .execute(&mut *conn)
                .await?;
        }

        Self::get_by_slug(conn, slug)
            .await?
            .context("Status not found after creation")
    }

    async fn content_types(conn: &mut SqliteConnection, status_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT model FROM status_content_types WHERE status_id = ? ORDER BY model",
        )
        .bind(status_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(m,)| m).collect())
    }
}
