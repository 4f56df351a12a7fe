/// 写入随机开发数据
///
/// 用法: populate_test_data [板卡数量] [每块板卡的测试次数]
use pcba_viewer_lib::services::infrastructure::TestDataGenerator;
use rand::{rngs::StdRng, SeedableRng};
use pcba_viewer_lib::services::DatabaseManager;
use pcba_viewer_lib::utils::config::{get_global_config, init_global_config};

const DEFAULT_BOARDS: usize = 20;
const DEFAULT_LOGS_PER_BOARD: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let board_count = match args.next() {
        Some(n) => n.parse::<usize>()?,
        None => DEFAULT_BOARDS,
    };
    let logs_per_board = match args.next() {
        Some(n) => n.parse::<usize>()?,
        None => DEFAULT_LOGS_PER_BOARD,
    };

    init_global_config(None).await?;
    let db_path = get_global_config()?.database_config.db_path;
    let manager = DatabaseManager::new(&db_path).await?;

    let mut rng = StdRng::from_entropy();
    let connection = manager.connection();
    let written = TestDataGenerator::populate_random(connection.as_ref(), &mut rng, board_count, logs_per_board).await?;

    println!("已写入 {} 条测试日志到 {}", written, db_path.display());
    Ok(())
}
