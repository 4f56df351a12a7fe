/// 基础设施层服务模块
/// 负责数据库访问、后台查询、Excel 读写和图片渲染

/// 数据持久化相关模块
pub mod persistence;

/// 后台查询
pub mod query_worker;

/// Excel 导入导出
pub mod excel;

/// 绘图渲染
pub mod plot_renderer;

// 重新导出常用接口和实现
pub use excel::*;
pub use persistence::*;
pub use plot_renderer::PlotRenderer;
pub use query_worker::{QueryEvent, QueryRunner};
