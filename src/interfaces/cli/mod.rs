//! CLI interface module
//!
//! 除 `config generate` 外，每个命令都直接连接数据库（启动时自动执行迁移）。

pub mod commands;

use std::fmt;

use crate::cli::{Commands, ConfigCommands};
use crate::storage::{SeaOrmStorage, StorageFactory};
use commands::{config_generate, export_report, print_reconciliation, run_migrate};
use std::sync::Arc;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::FundlinkerError> for CliError {
    fn from(err: crate::errors::FundlinkerError) -> Self {
        if err.is_validation() {
            CliError::ParseError(err.to_string())
        } else {
            CliError::StorageError(err.to_string())
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::CommandError(err.to_string())
    }
}

async fn open_storage() -> Result<Arc<SeaOrmStorage>, CliError> {
    StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))
}

/// Run a CLI command from clap-parsed input
///
/// `serve` 不在这里处理，由 runtime 的 server 模式负责
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Serve => Err(CliError::CommandError(
            "serve must be dispatched to server mode".to_string(),
        )),
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => config_generate(output_path, force).await,
        Commands::Migrate => {
            let storage = open_storage().await?;
            run_migrate(storage).await
        }
        Commands::Reconcile { campaign_id, json } => {
            let storage = open_storage().await?;
            print_reconciliation(storage, &campaign_id, json).await
        }
        Commands::Export {
            campaign_id,
            output,
            status,
        } => {
            let storage = open_storage().await?;
            export_report(storage, &campaign_id, output, status).await
        }
    }
}
