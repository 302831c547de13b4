//! CLI 命令测试：参数解析 + 直接调用命令实现

mod common;

use clap::Parser;

use common::{Fixture, manual_order};
use fundlinker::cli::{Cli, Commands, ConfigCommands};
use fundlinker::interfaces::cli::CliError;
use fundlinker::interfaces::cli::commands::{
    config_generate, export_report, print_reconciliation, run_migrate,
};
use fundlinker::storage::{PaymentMethod, PaymentStatus};

#[test]
fn test_parse_export_with_filters() {
    let cli = Cli::try_parse_from([
        "fundlinker",
        "-c",
        "prod.toml",
        "export",
        "camp-1",
        "-o",
        "out.csv",
        "--status",
        "pending",
    ])
    .unwrap();

    assert_eq!(cli.config.as_deref(), Some("prod.toml"));
    assert_eq!(
        cli.command_or_default(),
        Commands::Export {
            campaign_id: "camp-1".to_string(),
            output: Some("out.csv".to_string()),
            status: Some(PaymentStatus::Pending),
        }
    );
}

#[test]
fn test_parse_defaults_to_serve() {
    let cli = Cli::try_parse_from(["fundlinker"]).unwrap();
    assert_eq!(cli.command_or_default(), Commands::Serve);

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

#[test]
fn test_parse_rejects_unknown_status() {
    assert!(Cli::try_parse_from(["fundlinker", "export", "camp-1", "--status", "refunded"]).is_err());
    assert!(Cli::try_parse_from(["fundlinker", "reconcile"]).is_err());
}

#[tokio::test]
async fn test_export_command_writes_csv_file() {
    let fx = Fixture::new().await;
    fx.ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(None, fx.standard_cart(), PaymentMethod::Cash, true),
        )
        .await
        .unwrap();
    fx.ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(None, fx.standard_cart(), PaymentMethod::Check, false),
        )
        .await
        .unwrap();

    let out_dir = tempfile::TempDir::new().unwrap();
    let path = out_dir.path().join("paid.csv");
    export_report(
        fx.storage.clone(),
        &fx.campaign.id,
        Some(path.display().to_string()),
        Some(PaymentStatus::Paid),
    )
    .await
    .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("FR-000001,"));
    assert!(lines[1].contains(",paid,manual,"));
}

#[tokio::test]
async fn test_reconcile_command_and_migrate() {
    let fx = Fixture::new().await;
    print_reconciliation(fx.storage.clone(), &fx.campaign.id, true)
        .await
        .unwrap();
    print_reconciliation(fx.storage.clone(), &fx.campaign.id, false)
        .await
        .unwrap();
    run_migrate(fx.storage.clone()).await.unwrap();

    let err = print_reconciliation(fx.storage.clone(), "missing", false)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::StorageError(_)));
}

#[tokio::test]
async fn test_config_generate_respects_force() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    config_generate(Some(path.display().to_string()), true)
        .await
        .unwrap();
    let first = std::fs::read_to_string(&path).unwrap();
    assert!(first.contains("[orders]"));

    config_generate(Some(path.display().to_string()), true)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
}
