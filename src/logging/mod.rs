//! # 日志记录模块 (Logging Module)
//!
//! ## 业务说明
//! 记录用户操作、查询失败和导出失败，为问题定位提供依据。
//! 各子系统在消息前加标签，例如 `[QUERY]`、`[EXPORT]`、`[IMPORT]`。
//!
//! ## 日志策略
//! - 优先安装 `SimpleLogger`（控制台 + 文件）
//! - 文件无法打开时退回 `env_logger`，仍然保留控制台输出
//! - 测试中使用 `env_logger::builder().is_test(true).try_init()`

pub mod logger_config;
pub mod simple_logger;

pub use logger_config::*;
pub use simple_logger::SimpleLogger;

use crate::utils::config::LoggingConfig;

/// 按配置初始化全局日志
/// 重复调用时直接返回（全局 logger 只能设置一次）
pub fn init_logging(config: &LoggingConfig) {
    let logger_config = LoggerConfig::from(config);
    let level: log::LevelFilter = logger_config.level.into();

    match SimpleLogger::new(logger_config).init() {
        Ok(()) => {
            log::info!("日志系统初始化完成, 级别: {}", level);
        }
        Err(e) => {
            let fallback = env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .try_init();
            if fallback.is_ok() {
                log::warn!("文件日志初始化失败, 已退回 env_logger: {}", e);
            }
        }
    }
}

/// 记录查询失败日志
#[macro_export]
macro_rules! log_query_failure {
    ($msg:expr) => {
        log::error!("[查询失败] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[查询失败] {}", format!($msg, $($arg)*));
    };
}

/// 记录导出失败日志
#[macro_export]
macro_rules! log_export_failure {
    ($msg:expr) => {
        log::error!("[导出失败] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[导出失败] {}", format!($msg, $($arg)*));
    };
}

/// 记录用户操作日志
#[macro_export]
macro_rules! log_user_operation {
    ($msg:expr) => {
        log::info!("[用户操作] {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        log::info!("[用户操作] {}", format!($msg, $($arg)*));
    };
}

// 重新导出宏
pub use log_query_failure;
pub use log_export_failure;
pub use log_user_operation;
