/// 绘图页命令
use std::path::PathBuf;

use tauri::State;

use crate::models::graph::{CompareBy, ComparisonPair, GroupField, PreparedData, RelationalPair};
use crate::services::application::graph_service::{FilterChoices, GraphFilters, GraphPageMode, GraphRequest};
use crate::AppState;

#[tauri::command]
pub async fn graph_set_mode(state: State<'_, AppState>, mode: GraphPageMode) -> Result<(), String> {
    state.graph_service.lock().await.set_mode(mode);
    Ok(())
}

#[tauri::command]
pub async fn graph_y_axis_choices(state: State<'_, AppState>) -> Result<Vec<String>, String> {
    state.graph_service.lock().await.y_axis_choices().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn graph_x_axis_choices(
    state: State<'_, AppState>,
    y_measurement: Option<String>,
) -> Result<Vec<String>, String> {
    state
        .graph_service
        .lock()
        .await
        .x_axis_choices(y_measurement.as_deref())
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn graph_filter_choices(state: State<'_, AppState>) -> Result<FilterChoices, String> {
    state.graph_service.lock().await.filter_choices().await.map_err(|e| e.to_string())
}

/// 生成图表
#[tauri::command]
pub async fn generate_graph(state: State<'_, AppState>, request: GraphRequest) -> Result<PreparedData, String> {
    state
        .graph_service
        .lock()
        .await
        .generate_graph(request)
        .await
        .map_err(|e| e.to_string())
}

/// 取消正在运行的查询，不经过服务锁
#[tauri::command]
pub fn cancel_graph_query(state: State<'_, AppState>) {
    state.graph_queries.cancel();
}

#[tauri::command]
pub async fn graph_relational_pairs(
    state: State<'_, AppState>,
    y_measurement: String,
    x_measurement: String,
    filters: GraphFilters,
    group_by: Option<GroupField>,
) -> Result<Vec<RelationalPair>, String> {
    state
        .graph_service
        .lock()
        .await
        .relational_pairs(&y_measurement, &x_measurement, filters, group_by)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn graph_comparison_pairs(
    state: State<'_, AppState>,
    spec_name: String,
    filters: GraphFilters,
    compare_by: CompareBy,
) -> Result<Vec<ComparisonPair>, String> {
    state
        .graph_service
        .lock()
        .await
        .comparison_pairs(&spec_name, filters, compare_by)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn graph_delete_point(
    state: State<'_, AppState>,
    group: String,
    index: usize,
) -> Result<PreparedData, String> {
    state.graph_service.lock().await.delete_point(&group, index).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn graph_reset_deletions(state: State<'_, AppState>) -> Result<PreparedData, String> {
    state.graph_service.lock().await.reset_deletions().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn export_graph(
    state: State<'_, AppState>,
    file_path: String,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<(), String> {
    state
        .graph_service
        .lock()
        .await
        .export_graph(&PathBuf::from(file_path), width, height)
        .map_err(|e| e.to_string())
}
