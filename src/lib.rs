/// PCBA/PMT 测试日志查看器 - Rust 核心库
///
/// 数据库浏览、绘图、报表与 HTML 报告搜索四个页面的服务。
/// 桌面外壳（Tauri）在 `desktop` feature 下编译。
pub mod database_migration;
pub mod logging;
pub mod models;
pub mod services;
pub mod tauri_commands;
pub mod utils;

#[cfg(feature = "desktop")]
pub mod commands;

// 重新导出常用类型，方便使用
pub use models::*;
pub use services::*;
pub use tauri_commands::{init_app_state, AppState, SystemStatus};
pub use utils::{AppConfig, AppError, AppResult};

/// 启动桌面应用
#[cfg(feature = "desktop")]
pub fn run() {
    use commands::{database, graph, reports, search, system};

    // 使用 tokio 运行时初始化应用状态
    let app_state = match tauri::async_runtime::block_on(init_app_state(None)) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("初始化应用状态失败: {}", e);
            std::process::exit(1);
        }
    };

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            system::get_system_status,
            system::get_theme,
            graph::graph_set_mode,
            graph::graph_y_axis_choices,
            graph::graph_x_axis_choices,
            graph::graph_filter_choices,
            graph::generate_graph,
            graph::cancel_graph_query,
            graph::graph_relational_pairs,
            graph::graph_comparison_pairs,
            graph::graph_delete_point,
            graph::graph_reset_deletions,
            graph::export_graph,
            database::browser_load,
            database::browser_default_filters,
            database::browser_fixture_options,
            database::browser_stats_text,
            database::browser_record_detail,
            database::browser_save_changes,
            database::browser_add_manufacturer,
            database::browser_request_delete,
            database::browser_confirm_delete,
            database::browser_cancel_delete,
            database::import_manufacturer_data,
            database::export_import_template,
            database::export_database,
            database::search_database,
            reports::report_filter_options,
            reports::report_default_request,
            reports::generate_report,
            reports::report_delete_rows,
            reports::report_delete_columns,
            reports::report_reset,
            reports::report_style,
            reports::report_set_style,
            reports::export_report,
            search::search_load_autocomplete,
            search::search_suggestions,
            search::search_test_logs,
            search::search_select_result,
            search::search_load_report,
            search::search_set_compare_mode,
            search::search_compare_select,
            search::search_clear_compare,
            search::search_recent_reports,
            search::search_clear_recent,
            search::search_zoom,
            search::search_default_export_name,
            search::export_report_html,
            search::export_comparison_html,
            search::open_report_in_browser,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        log::error!("Tauri 应用运行失败: {}", e);
        std::process::exit(1);
    }
}
