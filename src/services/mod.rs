/// 服务层模块
///
/// - Application Layer: 每个页面的服务，组织查询、编辑与导出
/// - Infrastructure Layer: 数据库、后台查询、Excel 与图片渲染

/// 应用层服务模块
pub mod application;

/// 基础设施层服务模块
pub mod infrastructure;

/// 服务层基础trait定义
pub mod traits;

pub use traits::BaseService;

pub use application::{
    DatabaseBrowserService, GraphPageService, ReportGenerationService, SearchService,
};

pub use infrastructure::{DatabaseManager, PlotRenderer, Queries, QueryRunner};
