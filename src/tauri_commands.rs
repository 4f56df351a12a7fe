/// 应用状态
///
/// 持有数据库和四个页面的服务。桌面外壳通过 `tauri::State<AppState>` 访问，
/// 无头构建和测试直接构造。
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::structs::DatabaseStats;
use crate::services::application::{DatabaseBrowserService, GraphPageService, ReportGenerationService, SearchService};
use crate::services::infrastructure::{DatabaseManager, QueryRunner};
use crate::services::traits::BaseService;
use crate::utils::config::{get_global_config, init_global_config, AppConfig, ThemeConfig};
use crate::utils::error::AppResult;

/// 临时 HTML 报告所在的子目录
const TEMP_SUBDIR: &str = "pcba_viewer";

/// 应用状态，包含所有服务实例
pub struct AppState {
    pub config: AppConfig,
    pub database: DatabaseManager,
    pub graph_service: Mutex<GraphPageService>,
    /// 绘图页查询调度者，取消查询不需要等服务锁
    pub graph_queries: Arc<QueryRunner>,
    pub browser_service: Mutex<DatabaseBrowserService>,
    pub report_service: Mutex<ReportGenerationService>,
    pub search_service: Mutex<SearchService>,
}

/// 系统状态信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub database_path: Option<String>,
    pub database_healthy: bool,
    pub stats: DatabaseStats,
    pub theme: ThemeConfig,
}

impl AppState {
    /// 打开配置中的数据库文件并创建各页面服务
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let database = DatabaseManager::new(&config.database_config.db_path).await?;
        Self::with_database(config, database)
    }

    pub fn with_database(config: AppConfig, database: DatabaseManager) -> AppResult<Self> {
        let queries = database.queries();
        let graph = GraphPageService::new(
            queries.clone(),
            config.graph_config.clone(),
            config.database_config.query_batch_size,
        );
        let graph_queries = graph.query_runner();
        let browser = DatabaseBrowserService::new(database.clone());
        let reports = ReportGenerationService::new(queries.clone(), config.report_config.clone());
        let search = SearchService::new(
            queries,
            config.search_config.clone(),
            std::env::temp_dir().join(TEMP_SUBDIR),
        )?;

        Ok(Self {
            config,
            database,
            graph_service: Mutex::new(graph),
            graph_queries,
            browser_service: Mutex::new(browser),
            report_service: Mutex::new(reports),
            search_service: Mutex::new(search),
        })
    }

    pub async fn system_status(&self) -> AppResult<SystemStatus> {
        let stats = self.database.queries().database_stats().await?;
        Ok(SystemStatus {
            version: self.config.app_settings.app_version.clone(),
            database_path: self.database.db_file_path().map(|p| p.display().to_string()),
            database_healthy: self.database.health_check().await.is_ok(),
            stats,
            theme: self.config.theme_config.clone(),
        })
    }
}

/// 加载配置、初始化日志、打开数据库，并清理过期的临时报告
pub async fn init_app_state(config_path: Option<PathBuf>) -> AppResult<AppState> {
    init_global_config(config_path).await?;
    let config = get_global_config()?;
    crate::logging::init_logging(&config.logging_config);

    let state = AppState::new(config).await?;
    match state.search_service.lock().await.cleanup_temp_files() {
        Ok(removed) => log::debug!("启动时清理临时报告 {} 个", removed),
        Err(e) => log::warn!("清理临时报告失败: {}", e),
    }
    log::info!("应用状态初始化完成");
    Ok(state)
}
