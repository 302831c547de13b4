use std::sync::Arc;

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::storage::SeaOrmStorage;

/// 迁移在连接数据库时已经执行，这里只做连通性确认
pub async fn run_migrate(storage: Arc<SeaOrmStorage>) -> Result<(), CliError> {
    storage.ping().await?;
    println!(
        "{} {}",
        "Migrations applied on".green(),
        storage.get_backend_config().storage_type.blue()
    );
    Ok(())
}
