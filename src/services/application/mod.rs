/// 应用层服务：每个页面一个服务，协调查询、后台任务与导出
pub mod database_browser_service;
pub mod graph_generator;
pub mod graph_service;
pub mod report_generation_service;
pub mod search_service;

pub use database_browser_service::{
    BrowserFilters, BrowserListing, DatabaseBrowserService, DeleteConfirmation, DeleteImpact, NewManufacturer,
    RecordDetail, RecordUpdate,
};
pub use graph_generator::GraphGenerator;
pub use graph_service::{GraphFilters, GraphPageMode, GraphPageService, GraphRequest};
pub use report_generation_service::{ReportFilterOptions, ReportGenerationService, ReportTable};
pub use search_service::{load_report_html, SearchResult, SearchService};
