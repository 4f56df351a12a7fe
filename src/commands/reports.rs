/// 报表页命令
use std::path::PathBuf;

use tauri::State;

use crate::models::report::{ExportStyle, ReportColumn, ReportRequest};
use crate::services::application::report_generation_service::{ReportFilterOptions, ReportTable};
use crate::AppState;

#[tauri::command]
pub async fn report_filter_options(state: State<'_, AppState>) -> Result<ReportFilterOptions, String> {
    state.report_service.lock().await.filter_options().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn report_default_request(
    state: State<'_, AppState>,
    spec_names: Vec<String>,
) -> Result<ReportRequest, String> {
    Ok(state.report_service.lock().await.default_request(spec_names))
}

#[tauri::command]
pub async fn generate_report(state: State<'_, AppState>, request: ReportRequest) -> Result<ReportTable, String> {
    state
        .report_service
        .lock()
        .await
        .generate_report(request)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn report_delete_rows(state: State<'_, AppState>, indices: Vec<usize>) -> Result<ReportTable, String> {
    let mut reports = state.report_service.lock().await;
    reports.delete_rows(&indices);
    Ok(reports.table())
}

#[tauri::command]
pub async fn report_delete_columns(
    state: State<'_, AppState>,
    columns: Vec<ReportColumn>,
) -> Result<ReportTable, String> {
    let mut reports = state.report_service.lock().await;
    reports.delete_columns(&columns).map_err(|e| e.to_string())?;
    Ok(reports.table())
}

#[tauri::command]
pub async fn report_reset(state: State<'_, AppState>) -> Result<ReportTable, String> {
    state.report_service.lock().await.reset().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn report_style(state: State<'_, AppState>) -> Result<ExportStyle, String> {
    Ok(state.report_service.lock().await.style().clone())
}

#[tauri::command]
pub async fn report_set_style(state: State<'_, AppState>, style: ExportStyle) -> Result<(), String> {
    state.report_service.lock().await.set_style(style).map_err(|e| e.to_string())
}

/// 导出报表，返回实际写入的路径
#[tauri::command]
pub async fn export_report(state: State<'_, AppState>, file_path: Option<String>) -> Result<String, String> {
    let reports = state.report_service.lock().await;
    let path = reports.resolve_export_path(file_path.map(PathBuf::from).as_deref());
    reports.export_to_excel(&path).map_err(|e| e.to_string())?;
    Ok(path.display().to_string())
}
