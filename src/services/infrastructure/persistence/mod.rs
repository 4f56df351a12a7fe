/// 数据持久化相关模块
///
/// - `database_manager`: 连接、迁移、事务
/// - `queries`: 各页面的查询
/// - `test_data`: 开发与测试数据写入

pub mod database_manager;
pub mod queries;
pub mod test_data;

#[cfg(test)]
mod tests;

pub use database_manager::DatabaseManager;
pub use queries::{compute_file_sha256, sha256_digest, Queries};
pub use test_data::{NewSpec, NewTestLog, TestDataGenerator};
