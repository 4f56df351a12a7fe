/// 运行数据库迁移
///
/// 用法: migrate_database [--info] [数据库路径]
/// `--info` 在迁移后打印每张表的列和行数
use std::path::PathBuf;

use pcba_viewer_lib::database_migration::DatabaseMigration;
use pcba_viewer_lib::services::DatabaseManager;
use pcba_viewer_lib::utils::config::{get_global_config, init_global_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut show_info = false;
    let mut db_path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        if arg == "--info" {
            show_info = true;
        } else {
            db_path = Some(PathBuf::from(arg));
        }
    }

    init_global_config(None).await?;
    let db_path = match db_path {
        Some(path) => path,
        None => get_global_config()?.database_config.db_path,
    };

    // DatabaseManager::new 会执行迁移
    let manager = DatabaseManager::new(&db_path).await?;
    println!("迁移完成: {}", db_path.display());

    if show_info {
        let connection = manager.connection();
        for table in DatabaseMigration::describe_tables(&connection).await? {
            println!("\n{} ({} 行)", table.name, table.row_count);
            for column in &table.columns {
                println!("  - {}", column);
            }
        }
    }
    Ok(())
}
