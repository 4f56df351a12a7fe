use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::models::report::ExportStyle;
use crate::utils::error::{AppError, AppResult};

/// 环境变量前缀，例如 `PCBA_DATABASE_CONFIG__DB_PATH=/tmp/x.db`
pub const ENV_PREFIX: &str = "PCBA";

/// 应用程序主配置结构
/// 包含应用程序运行所需的所有配置信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 应用程序基本设置
    #[serde(default)]
    pub app_settings: AppSettings,
    /// 数据库配置
    #[serde(default)]
    pub database_config: DatabaseConfig,
    /// 主题配置
    #[serde(default)]
    pub theme_config: ThemeConfig,
    /// 报表页配置
    #[serde(default)]
    pub report_config: ReportConfig,
    /// 搜索页配置
    #[serde(default)]
    pub search_config: SearchConfig,
    /// 绘图页配置
    #[serde(default)]
    pub graph_config: GraphPageConfig,
    /// 日志配置
    #[serde(default)]
    pub logging_config: LoggingConfig,
}

/// 应用程序基本设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 应用程序名称
    pub app_name: String,
    /// 应用程序版本
    pub app_version: String,
    /// 运行环境 (development, testing, production)
    pub environment: String,
    /// 是否启用调试模式
    pub debug_mode: bool,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 数据库文件路径
    pub db_path: PathBuf,
    /// 最近测试日志默认条数
    pub recent_log_limit: u64,
    /// 后台查询每批读取行数
    pub query_batch_size: u64,
}

/// 主题配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// 主题名称
    pub theme_name: String,
    /// dark | light
    pub mode: String,
}

/// 报表页配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// 默认导出样式
    #[serde(default)]
    pub default_style: ExportStyle,
    /// 每个设备保留的最大测试次数
    pub max_tests_per_device: usize,
    /// 默认导出目录，None 时使用系统临时目录
    pub export_directory: Option<PathBuf>,
}

/// 搜索页配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 最近报告列表长度
    pub max_recent_reports: usize,
    /// 临时 HTML 文件保留小时数
    pub temp_retention_hours: u64,
}

/// 绘图页配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPageConfig {
    /// 默认配色方案 (light_normal, light_high, dark_normal, dark_high)
    pub default_color_scheme: String,
    /// 导出图片宽度（像素）
    pub export_width: u32,
    /// 导出图片高度（像素）
    pub export_height: u32,
    /// 坐标轴留白百分比
    pub axis_margin_percent: f64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 日志文件路径
    pub log_file_path: Option<PathBuf>,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 是否启用文件输出
    pub file_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_settings: AppSettings::default(),
            database_config: DatabaseConfig::default(),
            theme_config: ThemeConfig::default(),
            report_config: ReportConfig::default(),
            search_config: SearchConfig::default(),
            graph_config: GraphPageConfig::default(),
            logging_config: LoggingConfig::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "PCBA Log Viewer".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            debug_mode: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/Combined_database.db"),
            recent_log_limit: 100,
            query_batch_size: 100,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            theme_name: "ocean".to_string(),
            mode: "dark".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_style: ExportStyle::default(),
            max_tests_per_device: 5,
            export_directory: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_recent_reports: 10,
            temp_retention_hours: 24,
        }
    }
}

impl Default for GraphPageConfig {
    fn default() -> Self {
        Self {
            default_color_scheme: "light_normal".to_string(),
            export_width: 1920,
            export_height: 1080,
            axis_margin_percent: 10.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file_path: Some(PathBuf::from("logs/pcba_viewer.log")),
            console_output: true,
            file_output: true,
        }
    }
}

/// 校验 `#RRGGBB` 颜色
fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// 配置管理器
/// 负责加载、保存和管理应用程序配置
pub struct ConfigManager {
    config: AppConfig,
    config_file_path: PathBuf,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_file_path: PathBuf) -> Self {
        Self {
            config: AppConfig::default(),
            config_file_path,
        }
    }

    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_file_path
    }

    /// 从文件加载配置
    /// 文件不存在时写出默认配置；存在时再叠加 `PCBA_` 前缀的环境变量
    pub async fn load_from_file(&mut self) -> AppResult<()> {
        if !self.config_file_path.exists() {
            // 如果配置文件不存在，创建默认配置文件
            self.save_to_file().await?;
        }

        let content = tokio::fs::read_to_string(&self.config_file_path)
            .await
            .map_err(|e| AppError::io_error(format!("读取配置文件失败: {}", e), e.kind().to_string()))?;

        self.config = Self::layered(&content)?;
        Ok(())
    }

    /// 文件内容 + 环境变量分层合并
    fn layered(file_content: &str) -> AppResult<AppConfig> {
        let built = config::Config::builder()
            .add_source(config::File::from_str(file_content, config::FileFormat::Json))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration_error(format!("解析配置文件失败: {}", e)))?;

        built
            .try_deserialize::<AppConfig>()
            .map_err(|e| AppError::configuration_error(format!("解析配置文件失败: {}", e)))
    }

    /// 将配置保存到文件
    pub async fn save_to_file(&self) -> AppResult<()> {
        // 确保目录存在
        if let Some(parent) = self.config_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await
                    .map_err(|e| AppError::io_error(format!("创建配置目录失败: {}", e), e.kind().to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| AppError::json_error(format!("序列化配置失败: {}", e)))?;

        tokio::fs::write(&self.config_file_path, content)
            .await
            .map_err(|e| AppError::io_error(format!("写入配置文件失败: {}", e), e.kind().to_string()))?;

        Ok(())
    }

    /// 从环境变量覆盖常用配置项
    /// 与 `PCBA_` 分层来源并存，兼容旧的短变量名
    pub fn override_from_env(&mut self) {
        if let Ok(db_path) = std::env::var("PCBA_DB_PATH") {
            self.config.database_config.db_path = PathBuf::from(db_path);
        }
        if let Ok(env) = std::env::var("PCBA_ENVIRONMENT") {
            self.config.app_settings.environment = env;
        }
        if let Ok(log_level) = std::env::var("PCBA_LOG_LEVEL") {
            self.config.logging_config.log_level = log_level.to_lowercase();
        }
        if let Ok(mode) = std::env::var("PCBA_THEME_MODE") {
            self.config.theme_config.mode = mode.to_lowercase();
        }
    }

    /// 获取配置的只读引用
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取配置的可变引用
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> AppResult<()> {
        // 验证环境配置
        let valid_environments = ["development", "testing", "production"];
        if !valid_environments.contains(&self.config.app_settings.environment.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的环境配置: {}，有效值: {:?}",
                self.config.app_settings.environment, valid_environments
            )));
        }

        // 验证日志级别
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging_config.log_level.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.config.logging_config.log_level, valid_log_levels
            )));
        }

        let valid_modes = ["dark", "light"];
        if !valid_modes.contains(&self.config.theme_config.mode.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的主题模式: {}，有效值: {:?}",
                self.config.theme_config.mode, valid_modes
            )));
        }

        let valid_schemes = ["light_normal", "light_high", "dark_normal", "dark_high"];
        if !valid_schemes.contains(&self.config.graph_config.default_color_scheme.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的配色方案: {}，有效值: {:?}",
                self.config.graph_config.default_color_scheme, valid_schemes
            )));
        }

        if self.config.database_config.db_path.as_os_str().is_empty() {
            return Err(AppError::configuration_error("数据库路径不能为空"));
        }
        if self.config.database_config.recent_log_limit == 0
            || self.config.database_config.query_batch_size == 0
        {
            return Err(AppError::configuration_error("数据库查询条数必须大于0"));
        }
        if self.config.report_config.max_tests_per_device == 0 {
            return Err(AppError::configuration_error("每设备最大测试次数必须大于0"));
        }
        if self.config.search_config.max_recent_reports == 0 {
            return Err(AppError::configuration_error("最近报告数量必须大于0"));
        }
        if self.config.graph_config.export_width == 0 || self.config.graph_config.export_height == 0 {
            return Err(AppError::configuration_error("导出图片尺寸必须大于0"));
        }
        if !(0.0..=100.0).contains(&self.config.graph_config.axis_margin_percent) {
            return Err(AppError::configuration_error("坐标轴留白百分比必须在 0-100 之间"));
        }

        let style = &self.config.report_config.default_style;
        for (name, color) in style.named_colors() {
            if !is_hex_color(color) {
                return Err(AppError::configuration_error(format!(
                    "无效的颜色配置 {}: {}",
                    name, color
                )));
            }
        }

        Ok(())
    }

    /// 重置为默认配置
    pub fn reset_to_default(&mut self) {
        self.config = AppConfig::default();
    }
}

/// 全局配置管理器实例
/// 使用 once_cell 确保全局唯一性
use once_cell::sync::OnceCell;
use std::sync::Mutex;

static GLOBAL_CONFIG: OnceCell<Mutex<ConfigManager>> = OnceCell::new();

/// 初始化全局配置管理器
pub async fn init_global_config(config_path: Option<PathBuf>) -> AppResult<()> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("config/pcba_viewer.json"));
    let mut config_manager = ConfigManager::new(config_path);

    // 从文件加载配置
    config_manager.load_from_file().await?;

    // 从环境变量覆盖配置
    config_manager.override_from_env();

    // 验证配置
    config_manager.validate_config()?;

    // 设置全局配置
    GLOBAL_CONFIG
        .set(Mutex::new(config_manager))
        .map_err(|_| AppError::configuration_error("全局配置已经初始化"))?;

    Ok(())
}

/// 获取全局配置的只读访问
/// 未初始化时返回默认配置，便于命令行工具与测试直接使用
pub fn get_global_config() -> AppResult<AppConfig> {
    let Some(cell) = GLOBAL_CONFIG.get() else {
        return Ok(AppConfig::default());
    };
    let config_manager = cell
        .lock()
        .map_err(|_| AppError::concurrency_error("获取全局配置锁失败"))?;

    Ok(config_manager.get_config().clone())
}

/// 更新全局配置
pub async fn update_global_config<F>(updater: F) -> AppResult<()>
where
    F: FnOnce(&mut AppConfig),
{
    let config_manager = GLOBAL_CONFIG
        .get()
        .ok_or_else(|| AppError::configuration_error("全局配置未初始化"))?;

    // 锁不能跨 await 持有，先在锁内修改并取出快照
    let (snapshot, path) = {
        let mut manager = config_manager
            .lock()
            .map_err(|_| AppError::concurrency_error("获取全局配置锁失败"))?;

        let previous = manager.get_config().clone();
        updater(manager.get_config_mut());
        if let Err(e) = manager.validate_config() {
            *manager.get_config_mut() = previous;
            return Err(e);
        }
        (manager.get_config().clone(), manager.config_file_path().clone())
    };

    let mut writer = ConfigManager::new(path);
    *writer.get_config_mut() = snapshot;
    writer.save_to_file().await
}
