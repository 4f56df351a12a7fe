/// 数据库浏览页命令
use std::path::PathBuf;

use tauri::State;

use crate::models::enums::{ImportFormat, ViewMode};
use crate::models::entities::manufacturer;
use crate::models::structs::{ImportResult, StringMatch};
use crate::services::application::database_browser_service::{
    BrowserFilters, BrowserListing, DeleteConfirmation, DeleteImpact, NewManufacturer, RecordDetail, RecordUpdate,
};
use crate::AppState;

#[tauri::command]
pub async fn browser_load(
    state: State<'_, AppState>,
    view_mode: ViewMode,
    filters: BrowserFilters,
) -> Result<BrowserListing, String> {
    let mut browser = state.browser_service.lock().await;
    browser.set_view_mode(view_mode);
    browser.set_filters(filters);
    browser.load_data().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_default_filters() -> Result<BrowserFilters, String> {
    Ok(BrowserFilters::default())
}

#[tauri::command]
pub async fn browser_fixture_options(state: State<'_, AppState>) -> Result<Vec<String>, String> {
    state.browser_service.lock().await.fixture_options().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_stats_text(state: State<'_, AppState>) -> Result<String, String> {
    state.browser_service.lock().await.stats_text().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_record_detail(
    state: State<'_, AppState>,
    kind: ViewMode,
    id: i32,
) -> Result<RecordDetail, String> {
    state
        .browser_service
        .lock()
        .await
        .record_detail(kind, id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_save_changes(state: State<'_, AppState>, update: RecordUpdate) -> Result<(), String> {
    state
        .browser_service
        .lock()
        .await
        .save_changes(update)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_add_manufacturer(
    state: State<'_, AppState>,
    manufacturer: NewManufacturer,
) -> Result<manufacturer::Model, String> {
    state
        .browser_service
        .lock()
        .await
        .add_manufacturer(manufacturer)
        .await
        .map_err(|e| e.to_string())
}

/// 删除第一步：返回影响范围和确认令牌
#[tauri::command]
pub async fn browser_request_delete(
    state: State<'_, AppState>,
    kind: ViewMode,
    id: i32,
) -> Result<DeleteConfirmation, String> {
    state
        .browser_service
        .lock()
        .await
        .request_delete(kind, id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_confirm_delete(state: State<'_, AppState>, token: String) -> Result<DeleteImpact, String> {
    state
        .browser_service
        .lock()
        .await
        .confirm_delete(&token)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn browser_cancel_delete(state: State<'_, AppState>, token: String) -> Result<bool, String> {
    Ok(state.browser_service.lock().await.cancel_delete(&token))
}

#[tauri::command]
pub async fn import_manufacturer_data(
    state: State<'_, AppState>,
    file_path: String,
    format: ImportFormat,
) -> Result<ImportResult, String> {
    Ok(state
        .browser_service
        .lock()
        .await
        .import_manufacturer_data(&PathBuf::from(file_path), format)
        .await)
}

#[tauri::command]
pub async fn export_import_template(
    state: State<'_, AppState>,
    file_path: String,
    format: ImportFormat,
) -> Result<(), String> {
    state
        .browser_service
        .lock()
        .await
        .export_import_template(&PathBuf::from(file_path), format)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn export_database(state: State<'_, AppState>, file_path: String) -> Result<usize, String> {
    state
        .browser_service
        .lock()
        .await
        .export_database(&PathBuf::from(file_path))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn search_database(state: State<'_, AppState>, needle: String) -> Result<Vec<StringMatch>, String> {
    state
        .browser_service
        .lock()
        .await
        .search_database(&needle)
        .await
        .map_err(|e| e.to_string())
}
