use anyhow::Result;
use clap::Parser;

use fundlinker::cli::Cli;
use fundlinker::config::{get_config, init_config_from};
use fundlinker::runtime::modes::{self, Mode};
use fundlinker::system::logging::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());

    let command = cli.command_or_default();
    match modes::detect_mode(&command) {
        Mode::Server => {
            // 持有 guard 直到退出
            let _guard = init_logging(&get_config())?;
            modes::run_server().await
        }
        Mode::Cli => {
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
