/// 系统命令：状态与主题
use tauri::State;

use crate::tauri_commands::SystemStatus;
use crate::utils::config::ThemeConfig;
use crate::AppState;

#[tauri::command]
pub async fn get_system_status(state: State<'_, AppState>) -> Result<SystemStatus, String> {
    state.system_status().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_theme(state: State<'_, AppState>) -> Result<ThemeConfig, String> {
    Ok(state.config.theme_config.clone())
}
