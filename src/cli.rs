//! Command-line arguments for topology-seed.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::generate::plan::DatacenterPlan;

/// Populate a network inventory database with synthetic datacenter topology.
#[derive(Parser)]
#[command(name = "topology-seed")]
#[command(version)]
pub struct Cli {
    /// SQLite database file (overrides DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate regions, sites, hardware, racks, switches and cables
    Generate(GenerateArgs),

    /// Delete all generated records
    Clear,

    /// Print record counts per kind
    Stats,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// JSON plan file (overrides PLAN_PATH); the built-in plan is used otherwise
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Datacenter to build as CODE=SITE; repeat for several. Replaces the plan's list.
    #[arg(long = "datacenter", value_parser = parse_datacenter)]
    pub datacenters: Vec<DatacenterPlan>,

    /// Rows per datacenter
    #[arg(long)]
    pub rows: Option<u32>,

    /// Racks per row
    #[arg(long)]
    pub racks: Option<u32>,

    /// Write a natural-key JSON fixture; defaults to EXPORT_PATH when no file is given
    #[arg(long, num_args = 0..=1)]
    pub export: Option<Option<PathBuf>>,

    /// Extra `app` or `app.kind` labels to leave out of the export
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Spaces per indent level in the export
    #[arg(long, default_value_t = 4)]
    pub indent: usize,

    /// Roll back instead of committing, leaving the database untouched
    #[arg(long)]
    pub rollback: bool,
}

fn parse_datacenter(value: &str) -> Result<DatacenterPlan, String> {
    let (code, site) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=SITE, got '{}'", value))?;
    let (code, site) = (code.trim(), site.trim());
    if code.is_empty() || site.is_empty() {
        return Err(format!("expected CODE=SITE, got '{}'", value));
    }
    Ok(DatacenterPlan { code: code.to_string(), site: site.to_string() })
}
