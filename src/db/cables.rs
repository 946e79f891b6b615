use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;
use super::devices::InterfaceRepo;
use super::error::{classify_insert_error, StoreError};
use super::row_helpers::map_cable_row;

/// Cable database operations
pub struct CableRepo;

impl CableRepo {
    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Cable>> {
        let rows = sqlx::query("SELECT * FROM cables ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_cable_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Cable>> {
        let row = sqlx::query("SELECT * FROM cables WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_cable_row))
    }

    /// Connect two interfaces. Both must exist, differ, and be free.
    pub async fn create(conn: &mut SqliteConnection, req: &CreateCableRequest) -> Result<Cable> {
        if req.termination_a_id == req.termination_b_id {
            return Err(StoreError::constraint(
                "Cable",
                format!("interface {} cannot be cabled to itself", req.termination_a_id),
            )
            .into());
        }

        for id in [req.termination_a_id, req.termination_b_id] {
            let iface = InterfaceRepo::get(conn, id)
                .await?
                .ok_or_else(|| StoreError::not_found("Interface", id.to_string()))?;
            if let Some(cable_id) = iface.cable_id {
                return Err(StoreError::constraint(
                    "Cable",
                    format!("interface {} ({}) already has cable {}", iface.name, iface.id, cable_id),
                )
                .into());
            }
        }

        let key = format!("{}<->{}", req.termination_a_id, req.termination_b_id);
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO cables (termination_a_id, termination_b_id, status_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(req.termination_a_id)
        .bind(req.termination_b_id)
        .bind(req.status_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_insert_error(e, "Cable", &key))?;
        let cable_id = result.last_insert_rowid();

        sqlx::query("UPDATE interfaces SET cable_id = ? WHERE id IN (?, ?)")
            .bind(cable_id)
            .bind(req.termination_a_id)
            .bind(req.termination_b_id)
            .execute(&mut *conn)
            .await?;

        Self::get(conn, cable_id)
            .await?
            .context("Cable not found after creation")
    }
}
