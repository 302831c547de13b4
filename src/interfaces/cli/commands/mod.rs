//! CLI command implementations

mod config_gen;
mod migrate;
mod reconcile;

pub use config_gen::config_generate;
pub use migrate::run_migrate;
pub use reconcile::{export_report, print_reconciliation};
