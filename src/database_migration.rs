//! # 数据库迁移模块 (Database Migration Module)
//!
//! ## 业务说明
//! 测试日志数据库由上游测试流程生成，不同时期的数据库文件结构略有差异。
//! 本模块在打开数据库时保证表结构完整：
//! - **表创建**: 按实体定义创建缺失的表
//! - **列添加**: 旧数据库缺少 `spec.plot_data` 时补齐
//! - **索引管理**: 为常用查询字段建立索引
//!
//! 所有步骤都可以重复执行。
//!
//! ## 调用链路
//! ```text
//! DatabaseManager::new() → DatabaseMigration::migrate() → 各项迁移任务
//! migrate_database --info → DatabaseMigration::describe_tables()
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema, Statement};
use std::collections::HashSet;

use crate::models::entities;
use crate::models::structs::TableDescription;
use crate::utils::error::AppError;

/// 所有业务表名，按外键依赖顺序排列
pub const TABLE_NAMES: [&str; 8] = [
    "pia_board",
    "pmt_device",
    "test_log",
    "sub_test",
    "spec",
    "manufacturer",
    "manufacturer_device_batch",
    "manufacturer_spec",
];

/// 查询常用的索引：(索引名, 表名, 列名)
const LOOKUP_INDEXES: [(&str, &str, &str); 5] = [
    ("idx_spec_name", "spec", "name"),
    ("idx_spec_sub_test_id", "spec", "sub_test_id"),
    ("idx_sub_test_test_log_id", "sub_test", "test_log_id"),
    ("idx_test_log_created_at", "test_log", "created_at"),
    ("idx_pia_board_serial_number", "pia_board", "serial_number"),
];

/// 数据库迁移管理器
///
/// 单元结构体，所有方法都是关联函数
pub struct DatabaseMigration;

impl DatabaseMigration {
    /// 执行全部迁移步骤
    pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
        log::info!("[MIGRATION] 开始检查数据库结构");

        Self::create_missing_tables(db).await?;
        Self::add_spec_plot_data_column(db).await?;
        Self::create_lookup_indexes(db).await?;

        log::info!("[MIGRATION] 数据库结构检查完成");
        Ok(())
    }

    /// 按实体定义创建缺失的表
    async fn create_missing_tables(db: &DatabaseConnection) -> Result<(), AppError> {
        Self::create_table(db, entities::pia_board::Entity).await?;
        Self::create_table(db, entities::pmt_device::Entity).await?;
        Self::create_table(db, entities::test_log::Entity).await?;
        Self::create_table(db, entities::sub_test::Entity).await?;
        Self::create_table(db, entities::spec::Entity).await?;
        Self::create_table(db, entities::manufacturer::Entity).await?;
        Self::create_table(db, entities::manufacturer_device_batch::Entity).await?;
        Self::create_table(db, entities::manufacturer_spec::Entity).await?;
        Ok(())
    }

    async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), AppError> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let table = entity.table_name().to_string();

        if Self::check_table_exists(db, &table).await? {
            return Ok(());
        }

        let stmt = schema.create_table_from_entity(entity).if_not_exists().to_owned();
        db.execute(backend.build(&stmt))
            .await
            .map_err(|e| AppError::persistence_error(format!("创建 {} 表失败: {}", table, e)))?;
        log::info!("[MIGRATION] 创建表 {}", table);
        Ok(())
    }

    /// 旧数据库中 spec 表没有 plot_data 列
    async fn add_spec_plot_data_column(db: &DatabaseConnection) -> Result<(), AppError> {
        let columns = Self::get_existing_columns(db, "spec").await?;
        if columns.contains("plot_data") {
            return Ok(());
        }

        log::info!("[MIGRATION] 为 spec 表添加 plot_data 列");
        db.execute(Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            "ALTER TABLE spec ADD COLUMN plot_data TEXT".to_string(),
        ))
        .await
        .map_err(|e| AppError::persistence_error(format!("添加 plot_data 列失败: {}", e)))?;
        Ok(())
    }

    async fn create_lookup_indexes(db: &DatabaseConnection) -> Result<(), AppError> {
        for (index, table, column) in LOOKUP_INDEXES {
            let sql = format!("CREATE INDEX IF NOT EXISTS {} ON {} ({})", index, table, column);
            db.execute(Statement::from_string(sea_orm::DatabaseBackend::Sqlite, sql))
                .await
                .map_err(|e| AppError::persistence_error(format!("创建索引 {} 失败: {}", index, e)))?;
        }
        Ok(())
    }

    /// 表名 → 列名与行数
    pub async fn describe_tables(db: &DatabaseConnection) -> Result<Vec<TableDescription>, AppError> {
        let rows = db
            .query_all(Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
                    .to_string(),
            ))
            .await
            .map_err(|e| AppError::persistence_error(format!("读取表列表失败: {}", e)))?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("", "name")
                .map_err(|e| AppError::persistence_error(format!("读取表名失败: {}", e)))?;

            let columns = Self::get_ordered_columns(db, &name).await?;
            let row_count = Self::count_rows(db, &name).await?;
            tables.push(TableDescription { name, columns, row_count });
        }
        Ok(tables)
    }

    pub async fn check_table_exists(db: &DatabaseConnection, table_name: &str) -> Result<bool, AppError> {
        let sql = "SELECT name FROM sqlite_master WHERE type='table' AND name=?";
        let result = db
            .query_all(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Sqlite,
                sql,
                vec![table_name.into()],
            ))
            .await
            .map_err(|e| AppError::persistence_error(format!("检查表是否存在失败: {}", e)))?;
        Ok(!result.is_empty())
    }

    async fn get_existing_columns(db: &DatabaseConnection, table_name: &str) -> Result<HashSet<String>, AppError> {
        Ok(Self::get_ordered_columns(db, table_name).await?.into_iter().collect())
    }

    /// PRAGMA table_info 按定义顺序返回列
    async fn get_ordered_columns(db: &DatabaseConnection, table_name: &str) -> Result<Vec<String>, AppError> {
        let sql = format!("PRAGMA table_info(\"{}\")", table_name);
        let result = db
            .query_all(Statement::from_string(sea_orm::DatabaseBackend::Sqlite, sql))
            .await
            .map_err(|e| AppError::persistence_error(format!("获取表结构失败: {}", e)))?;

        Ok(result
            .into_iter()
            .filter_map(|row| row.try_get::<String>("", "name").ok())
            .collect())
    }

    async fn count_rows(db: &DatabaseConnection, table_name: &str) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) AS cnt FROM \"{}\"", table_name);
        let row = db
            .query_one(Statement::from_string(sea_orm::DatabaseBackend::Sqlite, sql))
            .await
            .map_err(|e| AppError::persistence_error(format!("统计 {} 行数失败: {}", table_name, e)))?;
        Ok(row.and_then(|r| r.try_get::<i64>("", "cnt").ok()).unwrap_or(0))
    }
}
