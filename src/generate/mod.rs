pub mod cabling;
pub mod plan;
pub mod stages;

use std::path::PathBuf;

use anyhow::Result;
use sqlx::SqliteConnection;

use crate::db::{count_records, Store};
use crate::export::{self, ExportOptions};
use crate::models::RecordCounts;

pub use plan::TopologyPlan;
pub use stages::SwitchSummary;

/// What happens to the run's transaction once generation (and export) is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    Commit,
    /// Discard everything; used to produce a fixture without touching the store
    Rollback,
}

#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub options: ExportOptions,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: TransactionMode,
    pub export: Option<ExportTarget>,
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub switches: SwitchSummary,
    /// Store contents at the end of the run, before commit or rollback
    pub counts: RecordCounts,
    pub exported_records: Option<usize>,
    pub committed: bool,
}

/// Run every generation stage in order on one connection
pub async fn generate(conn: &mut SqliteConnection, plan: &TopologyPlan) -> Result<SwitchSummary> {
    let regions = stages::create_regions(conn, plan).await?;
    let sites = stages::create_sites(conn, plan, &regions).await?;
    let manufacturers = stages::create_manufacturers(conn, plan).await?;
    let roles = stages::create_device_roles(conn, plan).await?;
    let device_types = stages::create_device_types(conn, plan, &manufacturers).await?;
    let rack_groups = stages::create_rack_groups(conn, plan, &sites).await?;
    let racks = stages::create_racks(conn, plan, rack_groups).await?;
    stages::create_switches(conn, plan, &roles, &device_types, &racks).await
}

/// Validate the plan and generate it inside a single transaction.
///
/// Any failure drops the transaction, which rolls back everything the run wrote.
pub async fn run(store: &Store, plan: &TopologyPlan, options: &RunOptions) -> Result<GenerationReport> {
    plan.validate()?;

    let mut tx = store.begin().await?;
    let switches = generate(&mut tx, plan).await?;
    let counts = count_records(&mut tx).await?;

    let exported_records = match &options.export {
        Some(target) => Some(export::write_fixture(&mut tx, &target.path, &target.options).await?),
        None => None,
    };

    let committed = match options.mode {
        TransactionMode::Commit => {
            tx.commit().await?;
            true
        }
        TransactionMode::Rollback => {
            tx.rollback().await?;
            tracing::info!("Rolled back generated records");
            false
        }
    };

    Ok(GenerationReport { switches, counts, exported_records, committed })
}
