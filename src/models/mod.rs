/// 核心枚举定义模块
pub mod enums;
/// 核心结构体定义模块
pub mod structs;
/// SeaORM实体定义模块
pub mod entities;
/// 绘图配置与绘图数据
pub mod graph;
/// 报表页模型
pub mod report;

// 重新导出常用类型，方便其他模块使用
pub use enums::*;
pub use structs::*;
