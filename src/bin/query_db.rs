/// 命令行查询测试日志数据库
///
/// 用法:
///   query_db stats
///   query_db recent [数量]
///   query_db search <关键字>
///   query_db export <xlsx 路径>
use std::path::PathBuf;

use pcba_viewer_lib::models::structs::{TestLogFilter, TestLogSummary};
use pcba_viewer_lib::services::infrastructure::DatabaseExporter;
use pcba_viewer_lib::services::DatabaseManager;
use pcba_viewer_lib::utils::config::{get_global_config, init_global_config};

fn print_logs(logs: &[TestLogSummary]) {
    for log in logs {
        let verdict = match (log.full_test_completed, log.full_test_passed) {
            (true, true) => "PASS",
            (true, false) => "FAIL",
            _ => "INCOMPLETE",
        };
        println!("{:>6}  {:<10}  {}", log.id, verdict, log.display_label());
    }
    println!("共 {} 条", logs.len());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("stats");

    init_global_config(None).await?;
    let config = get_global_config()?;
    if !config.database_config.db_path.exists() {
        println!("数据库文件不存在: {}", config.database_config.db_path.display());
        return Ok(());
    }
    let manager = DatabaseManager::new(&config.database_config.db_path).await?;
    let queries = manager.queries();

    match command {
        "stats" => {
            let stats = queries.database_stats().await?;
            println!("板卡: {}", stats.total_boards);
            println!("PMT: {}", stats.total_pmts);
            println!("测试日志: {}", stats.total_test_logs);
            println!("完整测试: {}", stats.completed_tests);
            println!("通过: {}", stats.passed_tests);
        }
        "recent" => {
            let limit = match args.get(1) {
                Some(n) => n.parse::<u64>()?,
                None => config.database_config.recent_log_limit,
            };
            let filter = TestLogFilter { limit: Some(limit), ..Default::default() };
            print_logs(&queries.list_test_logs(&filter).await?);
        }
        "search" => {
            let term = args.get(1).ok_or("search 需要关键字")?;
            print_logs(&queries.search_test_logs(term).await?);
        }
        "export" => {
            let path = PathBuf::from(args.get(1).ok_or("export 需要输出路径")?);
            let connection = manager.connection();
            let sheets = DatabaseExporter::export_database_to_excel(&connection, &path).await?;
            println!("已导出 {} 个工作表到 {}", sheets, path.display());
        }
        other => {
            println!("未知命令: {}（可用: stats, recent, search, export）", other);
        }
    }
    Ok(())
}
