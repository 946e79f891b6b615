//! Synthetic datacenter topology for network inventory stores.
//!
//! The [`generate`] pipeline fills a SQLite [`db::Store`] with regions, sites,
//! hardware, racks, switches and cables in one transaction, and [`export`]
//! writes the result as a natural-key JSON fixture.

pub mod cli;
pub mod config;
pub mod db;
pub mod export;
pub mod generate;
pub mod models;
pub mod utils;
