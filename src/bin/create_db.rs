/// 创建测试日志数据库
///
/// 用法: create_db [数据库路径]
/// 未给出路径时使用配置文件中的 database_config.db_path
use std::path::PathBuf;

use pcba_viewer_lib::services::traits::BaseService;
use pcba_viewer_lib::services::DatabaseManager;
use pcba_viewer_lib::utils::config::{get_global_config, init_global_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    init_global_config(None).await?;
    let db_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => get_global_config()?.database_config.db_path,
    };

    println!("正在创建数据库: {}", db_path.display());
    let manager = DatabaseManager::new(&db_path).await?;
    manager.health_check().await?;

    let stats = manager.queries().database_stats().await?;
    println!("数据库就绪，现有 {} 条测试日志", stats.total_test_logs);
    Ok(())
}
