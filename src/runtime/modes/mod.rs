//! Mode routing
//!
//! - Server mode (HTTP server, the default)
//! - CLI mode (one-shot commands)

pub mod cli;
pub mod server;

pub use cli::run_cli;
pub use server::{configure_app, run_server};

use crate::cli::Commands;

/// Mode detection result
#[derive(Debug, PartialEq)]
pub enum Mode {
    Server,
    Cli,
}

/// `serve` 或未指定子命令 → Server，其余 → CLI
pub fn detect_mode(command: &Commands) -> Mode {
    match command {
        Commands::Serve => Mode::Server,
        _ => Mode::Cli,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(detect_mode(&Commands::Serve), Mode::Server);
        assert_eq!(detect_mode(&Commands::Migrate), Mode::Cli);
        assert_eq!(
            detect_mode(&Commands::Reconcile {
                campaign_id: "c".into(),
                json: true
            }),
            Mode::Cli
        );
    }
}
