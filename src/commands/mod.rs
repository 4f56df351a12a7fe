/// Tauri命令模块
///
/// 每个页面一个子模块，命令统一返回 `Result<T, String>`

pub mod database;
pub mod graph;
pub mod reports;
pub mod search;
pub mod system;
