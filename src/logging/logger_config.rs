//! 日志配置模块
//!
//! 把配置文件中的 `logging_config` 转换为日志器可直接使用的结构

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::config::LoggingConfig;

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志输出目标
    pub targets: Vec<LogTarget>,
    /// 日志格式
    pub format: LogFormat,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("未知的日志级别: {}", other)),
        }
    }
}

/// 日志输出目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogTarget {
    Console,
    File { path: PathBuf },
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// 只有时间、级别和消息
    Plain,
    /// 额外带上 target（模块路径）
    Structured,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            targets: vec![LogTarget::Console],
            format: LogFormat::Structured,
        }
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(cfg: &LoggingConfig) -> Self {
        let mut targets = Vec::new();
        if cfg.console_output {
            targets.push(LogTarget::Console);
        }
        if cfg.file_output {
            if let Some(path) = &cfg.log_file_path {
                targets.push(LogTarget::File { path: path.clone() });
            }
        }

        Self {
            level: cfg.log_level.parse().unwrap_or(LogLevel::Info),
            targets,
            format: LogFormat::Structured,
        }
    }
}

impl LoggerConfig {
    /// 第一个文件目标
    pub fn file_path(&self) -> Option<&PathBuf> {
        self.targets.iter().find_map(|t| match t {
            LogTarget::File { path } => Some(path),
            LogTarget::Console => None,
        })
    }
}
