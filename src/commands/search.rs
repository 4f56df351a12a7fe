/// 搜索页命令
use std::path::PathBuf;

use tauri::State;

use crate::services::application::search_service::{
    CompareSide, LoadedReport, RecentReport, SearchResult, SelectionOutcome,
};
use crate::AppState;

#[tauri::command]
pub async fn search_load_autocomplete(state: State<'_, AppState>) -> Result<usize, String> {
    state.search_service.lock().await.load_autocomplete().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn search_suggestions(state: State<'_, AppState>, text: String) -> Result<Vec<String>, String> {
    Ok(state.search_service.lock().await.suggestions(&text))
}

#[tauri::command]
pub async fn search_test_logs(state: State<'_, AppState>, term: String) -> Result<Vec<SearchResult>, String> {
    state.search_service.lock().await.search(&term).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn search_select_result(
    state: State<'_, AppState>,
    test_log_id: i32,
) -> Result<SelectionOutcome, String> {
    state
        .search_service
        .lock()
        .await
        .select_result(test_log_id)
        .await
        .map_err(|e| e.to_string())
}

/// 打开报告（数据库浏览页的“查看报告”也走这里）
#[tauri::command]
pub async fn search_load_report(state: State<'_, AppState>, test_log_id: i32) -> Result<LoadedReport, String> {
    state
        .search_service
        .lock()
        .await
        .load_report(test_log_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn search_set_compare_mode(state: State<'_, AppState>, enabled: bool) -> Result<(), String> {
    state.search_service.lock().await.set_compare_mode(enabled);
    Ok(())
}

#[tauri::command]
pub async fn search_compare_select(
    state: State<'_, AppState>,
    test_log_id: i32,
) -> Result<(CompareSide, LoadedReport), String> {
    state
        .search_service
        .lock()
        .await
        .compare_select(test_log_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn search_clear_compare(state: State<'_, AppState>) -> Result<(), String> {
    state.search_service.lock().await.clear_compare();
    Ok(())
}

#[tauri::command]
pub async fn search_recent_reports(state: State<'_, AppState>) -> Result<Vec<RecentReport>, String> {
    Ok(state.search_service.lock().await.recent_reports().to_vec())
}

#[tauri::command]
pub async fn search_clear_recent(state: State<'_, AppState>) -> Result<(), String> {
    state.search_service.lock().await.clear_recent();
    Ok(())
}

#[tauri::command]
pub async fn search_zoom(state: State<'_, AppState>, direction: String) -> Result<u32, String> {
    let mut search = state.search_service.lock().await;
    let viewer = search.viewer_mut();
    Ok(match direction.as_str() {
        "in" => viewer.zoom_in(),
        "out" => viewer.zoom_out(),
        _ => viewer.zoom_reset(),
    })
}

#[tauri::command]
pub async fn search_default_export_name(state: State<'_, AppState>) -> Result<Option<String>, String> {
    Ok(state.search_service.lock().await.default_export_name())
}

#[tauri::command]
pub async fn export_report_html(state: State<'_, AppState>, file_path: String) -> Result<(), String> {
    state
        .search_service
        .lock()
        .await
        .export_html(&PathBuf::from(file_path))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn export_comparison_html(state: State<'_, AppState>, file_path: String) -> Result<(), String> {
    state
        .search_service
        .lock()
        .await
        .export_comparison(&PathBuf::from(file_path))
        .await
        .map_err(|e| e.to_string())
}

/// 写出临时文件，前端用系统浏览器打开返回的路径
#[tauri::command]
pub async fn open_report_in_browser(state: State<'_, AppState>) -> Result<String, String> {
    let path = state
        .search_service
        .lock()
        .await
        .write_temp_html()
        .await
        .map_err(|e| e.to_string())?;
    Ok(path.display().to_string())
}
