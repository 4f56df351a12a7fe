use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序统一错误类型
///
/// 查询、绘图、导入导出各层的错误都收敛到这里。
/// 桌面命令只把 Display 文本交给前端，所以消息本身要能直接给用户看。
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail")]
pub enum AppError {
    #[error("{message}")]
    Generic { message: String },

    /// 文件读写失败，kind 是 `std::io::ErrorKind` 的调试文本
    #[error("文件操作失败: {message} ({kind})")]
    Io { message: String, kind: String },

    /// 数据库连接、查询、事务失败
    #[error("数据库错误: {message}")]
    Database { message: String },

    #[error("配置错误: {message}")]
    Config { message: String },

    /// 用户输入不合法，消息原样显示在弹窗里
    #[error("{message}")]
    Validation { message: String },

    /// 后台查询已在运行、锁被占用等
    #[error("并发错误: {message}")]
    Concurrency { message: String },

    #[error("{resource}: {message}")]
    NotFound { resource: String, message: String },

    #[error("{operation} 已取消")]
    Cancelled { operation: String },

    #[error("JSON 解析失败: {message}")]
    Json { message: String },

    /// 报表、数据库导出和厂商数据导入
    #[error("Excel 错误: {message}")]
    Excel { message: String },

    /// 报表内容无法组织成工作表
    #[error("报表生成失败: {message}")]
    Report { message: String },

    /// 图表 PNG 渲染或编码
    #[error("图像错误: {message}")]
    Image { message: String },

    /// HTML 对比页模板
    #[error("模板错误: {message}")]
    Template { message: String },

    /// 绘图数据准备（分组、配对、离群点）
    #[error("数据分析错误: {message}")]
    Analysis { message: String },
}

impl AppError {
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic { message: message.into() }
    }

    pub fn io_error(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::Io { message: message.into(), kind: kind.into() }
    }

    pub fn persistence_error(message: impl Into<String>) -> Self {
        Self::Database { message: message.into() }
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn concurrency_error(message: impl Into<String>) -> Self {
        Self::Concurrency { message: message.into() }
    }

    /// `resource` 是实体名，例如 "TestLog"、"Spec"
    pub fn not_found_error(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into(), message: message.into() }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled { operation: operation.into() }
    }

    pub fn json_error(message: impl Into<String>) -> Self {
        Self::Json { message: message.into() }
    }

    pub fn excel_error(message: impl Into<String>) -> Self {
        Self::Excel { message: message.into() }
    }

    pub fn report_generation_error(message: impl Into<String>) -> Self {
        Self::Report { message: message.into() }
    }

    pub fn image_error(message: impl Into<String>) -> Self {
        Self::Image { message: message.into() }
    }

    pub fn template_error(message: impl Into<String>) -> Self {
        Self::Template { message: message.into() }
    }

    pub fn analysis_error(message: impl Into<String>) -> Self {
        Self::Analysis { message: message.into() }
    }

    /// 日志与前端使用的错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Generic { .. } => "GENERIC",
            AppError::Io { .. } => "IO_ERROR",
            AppError::Database { .. } => "PERSISTENCE_ERROR",
            AppError::Config { .. } => "CONFIGURATION_ERROR",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Concurrency { .. } => "CONCURRENCY_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND_ERROR",
            AppError::Cancelled { .. } => "CANCELLED",
            AppError::Json { .. } => "JSON_ERROR",
            AppError::Excel { .. } => "EXCEL_ERROR",
            AppError::Report { .. } => "REPORT_GENERATION_ERROR",
            AppError::Image { .. } => "IMAGE_ERROR",
            AppError::Template { .. } => "TEMPLATE_ERROR",
            AppError::Analysis { .. } => "ANALYSIS_ERROR",
        }
    }

    /// 用户取消不算失败，调用方据此跳过错误弹窗
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled { .. })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::io_error(err.to_string(), format!("{:?}", err.kind()))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::json_error(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        AppError::Generic { message }
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        AppError::generic(message)
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::persistence_error(err.to_string())
    }
}

/// 事务闭包自己的错误原样返回，连接错误按数据库错误处理
impl From<sea_orm::TransactionError<AppError>> for AppError {
    fn from(err: sea_orm::TransactionError<AppError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => db_err.into(),
            sea_orm::TransactionError::Transaction(app_err) => app_err,
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::excel_error(format!("写入失败: {}", err))
    }
}

impl From<calamine::XlsxError> for AppError {
    fn from(err: calamine::XlsxError) -> Self {
        AppError::excel_error(format!("读取失败: {}", err))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::image_error(err.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::template_error(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
