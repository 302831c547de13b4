//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::storage::PaymentStatus;

/// Fundlinker - seller attribution and payment reconciliation for fundraising campaigns
#[derive(Parser, Debug)]
#[command(name = "fundlinker")]
#[command(version)]
#[command(about = "Seller attribution and payment reconciliation service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Run database migrations and exit
    Migrate,

    /// Print the reconciliation summary of a campaign
    Reconcile {
        campaign_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the reconciliation report of a campaign as CSV
    Export {
        campaign_id: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,

        /// Only include orders with this payment status (pending | paid)
        #[arg(long)]
        status: Option<PaymentStatus>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// 未指定子命令时默认启动服务器
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_means_serve() {
        let cli = Cli::try_parse_from(["fundlinker"]).unwrap();
        assert_eq!(cli.command_or_default(), Commands::Serve);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_export_arguments() {
        let cli = Cli::try_parse_from([
            "fundlinker",
            "export",
            "camp-1",
            "--status",
            "pending",
            "-o",
            "out.csv",
            "-c",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        assert_eq!(
            cli.command_or_default(),
            Commands::Export {
                campaign_id: "camp-1".into(),
                output: Some("out.csv".into()),
                status: Some(PaymentStatus::Pending),
            }
        );
    }

    #[test]
    fn test_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["fundlinker", "export", "c", "--status", "refunded"]).is_err());
    }

    #[test]
    fn test_config_generate() {
        let cli = Cli::try_parse_from(["fundlinker", "config", "generate", "--force"]).unwrap();
        assert_eq!(
            cli.command_or_default(),
            Commands::Config {
                action: ConfigCommands::Generate {
                    output_path: None,
                    force: true,
                }
            }
        );
    }
}
