fn main() {
    // 仅桌面外壳需要生成 Tauri 上下文
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
