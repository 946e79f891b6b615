use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topology_seed::cli::{Cli, Commands, GenerateArgs};
use topology_seed::config::Config;
use topology_seed::db::Store;
use topology_seed::export::ExportOptions;
use topology_seed::generate::{self, ExportTarget, RunOptions, TopologyPlan, TransactionMode};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topology_seed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut cfg = Config::load();
    if let Some(db) = cli.db {
        cfg.db_path = db;
    }
    tracing::info!("Database: {}", cfg.db_path);

    let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;

    match cli.command {
        Commands::Generate(args) => run_generate(&store, &cfg, args).await?,
        Commands::Clear => {
            let removed = store.clear().await?;
            tracing::info!(
                "Cleared {} devices, {} cables, {} racks, {} sites",
                removed.devices,
                removed.cables,
                removed.racks,
                removed.sites
            );
        }
        Commands::Stats => {
            let counts = store.counts().await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }

    Ok(())
}

async fn run_generate(store: &Store, cfg: &Config, args: GenerateArgs) -> Result<()> {
    let plan_path = args.plan.or_else(|| cfg.plan_path.as_ref().map(PathBuf::from));
    let mut plan = match plan_path {
        Some(path) => {
            tracing::info!("Plan: {}", path.display());
            TopologyPlan::load(&path).await?
        }
        None => TopologyPlan::default(),
    };
    if !args.datacenters.is_empty() {
        plan.datacenters = args.datacenters;
    }
    if let Some(rows) = args.rows {
        plan.rows = rows;
    }
    if let Some(racks) = args.racks {
        plan.racks_per_row = racks;
    }

    let export = args.export.map(|path| {
        let mut options = ExportOptions { indent: args.indent, ..ExportOptions::default() };
        options.exclude.extend(args.exclude);
        ExportTarget {
            path: path.unwrap_or_else(|| PathBuf::from(&cfg.export_path)),
            options,
        }
    });
    let options = RunOptions {
        mode: if args.rollback { TransactionMode::Rollback } else { TransactionMode::Commit },
        export,
    };

    let report = match generate::run(store, &plan, &options).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Generation failed, nothing was written: {:#}", e);
            return Err(e);
        }
    };

    tracing::info!(
        "Generated {} regions, {} sites, {} racks, {} end-of-row and {} top-of-rack switches, {} interfaces, {} cables ({})",
        report.counts.regions,
        report.counts.sites,
        report.counts.racks,
        report.switches.eor_switches,
        report.switches.tor_switches,
        report.counts.interfaces,
        report.counts.cables,
        if report.committed { "committed" } else { "rolled back" }
    );
    if let Some(records) = report.exported_records {
        tracing::info!("Fixture holds {} records", records);
    }
    Ok(())
}
