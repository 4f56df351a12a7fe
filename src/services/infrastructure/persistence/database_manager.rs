// 文件: src/services/infrastructure/persistence/database_manager.rs
// 数据库会话工厂：连接、迁移、事务与查询门面

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::queries::Queries;
use crate::database_migration::DatabaseMigration;
use crate::services::traits::BaseService;
use crate::utils::error::{AppError, AppResult};

// 数据库URL前缀
const SQLITE_URL_PREFIX: &str = "sqlite://";
const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

/// 数据库管理器
///
/// 持有共享连接，打开时执行迁移，对外提供查询门面和事务入口
#[derive(Clone)]
pub struct DatabaseManager {
    db_conn: Arc<DatabaseConnection>,
    /// 内存数据库时为 None
    db_file_path: Option<PathBuf>,
}

impl DatabaseManager {
    /// 打开（必要时创建）数据库文件并执行迁移
    pub async fn new(db_path: &Path) -> AppResult<Self> {
        if let Some(parent_dir) = db_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                tokio::fs::create_dir_all(parent_dir).await.map_err(|e| {
                    AppError::io_error(format!("创建数据库目录失败: {:?}", parent_dir), e.kind().to_string())
                })?;
            }
        }

        let db_url = format!("{}{}?mode=rwc", SQLITE_URL_PREFIX, db_path.to_string_lossy());
        let mut options = ConnectOptions::new(db_url);
        options.sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|db_err| AppError::persistence_error(format!("连接数据库失败: {}", db_err)))?;
        DatabaseMigration::migrate(&conn).await?;

        log::info!("[DB] 数据库已打开: {}", db_path.display());
        Ok(Self {
            db_conn: Arc::new(conn),
            db_file_path: Some(db_path.to_path_buf()),
        })
    }

    /// 内存数据库，测试使用
    pub async fn in_memory() -> AppResult<Self> {
        // 内存库每个连接各自独立，只能使用单连接
        let mut options = ConnectOptions::new(SQLITE_MEMORY_URL.to_string());
        options.max_connections(1).min_connections(1).sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|db_err| AppError::persistence_error(format!("连接内存数据库失败: {}", db_err)))?;
        DatabaseMigration::migrate(&conn).await?;

        Ok(Self {
            db_conn: Arc::new(conn),
            db_file_path: None,
        })
    }

    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.db_conn.clone()
    }

    pub fn db_file_path(&self) -> Option<&Path> {
        self.db_file_path.as_deref()
    }

    pub fn queries(&self) -> Queries {
        Queries::new(self.db_conn.clone())
    }

    /// 在事务中执行回调，Ok 时提交，Err 时回滚
    pub async fn transaction<F, T>(&self, callback: F) -> AppResult<T>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, AppResult<T>> + Send,
        T: Send,
    {
        self.db_conn
            .transaction::<F, T, AppError>(callback)
            .await
            .map_err(|e| {
                log::error!("[DB] 事务已回滚: {}", e);
                AppError::from(e)
            })
    }
}

#[async_trait]
impl BaseService for DatabaseManager {
    fn service_name(&self) -> &'static str {
        "DatabaseManager"
    }

    async fn health_check(&self) -> AppResult<()> {
        self.db_conn
            .ping()
            .await
            .map_err(|db_err| AppError::persistence_error(format!("数据库健康检查失败: {}", db_err)))?;
        log::debug!("数据库连接健康。");
        Ok(())
    }
}
