//! 搜索页服务
//!
//! 按序列号、料号、批次或测试名称搜索测试日志，查看 HTML 报告，
//! 左右对比两份报告，维护最近打开的报告列表。

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use filetime::FileTime;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use uuid::Uuid;

use crate::models::structs::TestLogSummary;
use crate::services::infrastructure::persistence::Queries;
use crate::services::traits::BaseService;
use crate::utils::config::SearchConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils::FILE_STAMP_FORMAT;

/// 自动补全最多返回的条数
pub const MAX_SUGGESTIONS: usize = 20;
/// 临时 HTML 文件名前缀
pub const TEMP_FILE_PREFIX: &str = "pcba_report_";

pub const ZOOM_MIN: u32 = 50;
pub const ZOOM_MAX: u32 = 200;
const ZOOM_STEP: u32 = 10;

const NO_HTML: &str = "<html><body><h2>No HTML content available</h2></body></html>";
const COMPARE_TEMPLATE: &str = "compare.html";
const COMPARE_TEMPLATE_SRC: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{{ left.title }} vs {{ right.title }}</title>
<style>
  body { margin: 0; font-family: sans-serif; background: #0f172a; color: #f8fafc; }
  .row { display: flex; height: 100vh; }
  .side { flex: 1; display: flex; flex-direction: column; border-right: 1px solid #334155; }
  .side h3 { margin: 0; padding: 8px 12px; background: #1e293b; font-size: 14px; }
  iframe { flex: 1; border: 0; background: #ffffff; }
</style>
</head>
<body>
<div class="row">
  <div class="side"><h3>{{ left.title }}</h3><iframe srcdoc="{{ left.html }}"></iframe></div>
  <div class="side"><h3>{{ right.title }}</h3><iframe srcdoc="{{ right.html }}"></iframe></div>
</div>
<p style="display:none">generated {{ generated_at }}</p>
</body>
</html>
"#;

/// 读取测试日志的 HTML：优先数据库中的内容，其次 html_path 指向的文件
///
/// 两者都没有，或文件无法读取时，返回占位页面。
pub async fn load_report_html(queries: &Queries, test_log_id: i32) -> AppResult<String> {
    if let Some(content) = queries.get_html_content(test_log_id).await? {
        return Ok(content);
    }
    if let Some(path) = queries.get_html_path(test_log_id).await? {
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => return Ok(content),
            Err(e) => warn!("[SEARCH] 读取报告文件 {} 失败: {}", path, e),
        }
    }
    Ok(NO_HTML.to_string())
}

/// 搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub test_log_id: i32,
    pub label: String,
    pub tooltip: String,
}

impl From<&TestLogSummary> for SearchResult {
    fn from(log: &TestLogSummary) -> Self {
        let result = if log.full_test_passed { "PASS" } else { "FAIL" };
        Self {
            test_log_id: log.id,
            label: log.display_label(),
            tooltip: format!(
                "Test: {}\nPIA: {}\nPMT: {}\nDate: {}\nResult: {}",
                log.name.as_deref().unwrap_or("N/A"),
                log.pia_serial,
                log.pmt_serial.as_deref().unwrap_or("N/A"),
                log.created_at,
                result
            ),
        }
    }
}

/// 已加载的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedReport {
    pub test_log_id: i32,
    pub title: String,
    pub pia_serial: String,
    pub created_at: NaiveDateTime,
    pub html: String,
}

impl LoadedReport {
    /// 导出时的默认文件名
    pub fn default_file_name(&self) -> String {
        format!(
            "test_report_{}_{}.html",
            self.pia_serial,
            self.created_at.format(FILE_STAMP_FORMAT)
        )
    }
}

/// 单个报告视图：当前报告和缩放比例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportViewer {
    pub report: Option<LoadedReport>,
    pub zoom_percent: u32,
}

impl Default for ReportViewer {
    fn default() -> Self {
        Self { report: None, zoom_percent: 100 }
    }
}

impl ReportViewer {
    pub fn zoom_in(&mut self) -> u32 {
        self.zoom_percent = (self.zoom_percent + ZOOM_STEP).min(ZOOM_MAX);
        self.zoom_percent
    }

    pub fn zoom_out(&mut self) -> u32 {
        self.zoom_percent = self.zoom_percent.saturating_sub(ZOOM_STEP).max(ZOOM_MIN);
        self.zoom_percent
    }

    pub fn zoom_reset(&mut self) -> u32 {
        self.zoom_percent = 100;
        self.zoom_percent
    }

    fn load(&mut self, report: LoadedReport) {
        self.report = Some(report);
        self.zoom_reset();
    }

    pub fn clear(&mut self) {
        self.report = None;
        self.zoom_reset();
    }

    pub fn info_text(&self) -> String {
        self.report
            .as_ref()
            .map(|r| r.title.clone())
            .unwrap_or_else(|| "No report loaded".to_string())
    }
}

/// 最近打开的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentReport {
    pub test_log_id: i32,
    pub title: String,
    pub opened_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareSide {
    Left,
    Right,
}

/// 选择一条结果后发生了什么
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target")]
pub enum SelectionOutcome {
    Single { report: LoadedReport },
    Compare { side: CompareSide, report: LoadedReport },
}

pub struct SearchService {
    queries: Queries,
    settings: SearchConfig,
    temp_dir: PathBuf,
    templates: Tera,
    autocomplete: Vec<String>,
    compare_mode: bool,
    single: ReportViewer,
    left: ReportViewer,
    right: ReportViewer,
    recent: Vec<RecentReport>,
}

impl SearchService {
    pub fn new(queries: Queries, settings: SearchConfig, temp_dir: PathBuf) -> AppResult<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_template(COMPARE_TEMPLATE, COMPARE_TEMPLATE_SRC)
            .map_err(|e| AppError::template_error(format!("加载对比模板失败: {}", e)))?;
        Ok(Self {
            queries,
            settings,
            temp_dir,
            templates,
            autocomplete: Vec::new(),
            compare_mode: false,
            single: ReportViewer::default(),
            left: ReportViewer::default(),
            right: ReportViewer::default(),
            recent: Vec::new(),
        })
    }

    /// 自动补全候选：板卡序列号、料号、PMT 序列号和批次，去重排序
    pub async fn load_autocomplete(&mut self) -> AppResult<usize> {
        let mut values = self.queries.board_serial_numbers().await?;
        values.extend(self.queries.board_part_numbers().await?);
        values.extend(self.queries.pmt_serial_numbers().await?);
        values.extend(self.queries.pmt_batch_numbers().await?);
        values.retain(|v| !v.is_empty());
        values.sort();
        values.dedup();
        self.autocomplete = values;
        debug!("[SEARCH] 自动补全候选 {} 个", self.autocomplete.len());
        Ok(self.autocomplete.len())
    }

    /// 前缀匹配在前，其余子串匹配在后
    pub fn suggestions(&self, text: &str) -> Vec<String> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let (mut prefix, substring): (Vec<&String>, Vec<&String>) = self
            .autocomplete
            .iter()
            .filter(|v| v.to_lowercase().contains(&needle))
            .partition(|v| v.to_lowercase().starts_with(&needle));
        prefix.extend(substring);
        prefix.into_iter().take(MAX_SUGGESTIONS).cloned().collect()
    }

    pub async fn search(&self, term: &str) -> AppResult<Vec<SearchResult>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::validation_error(
                "Please enter a serial number or part number to search.",
            ));
        }
        let logs = self.queries.search_test_logs(term).await.map_err(|e| {
            crate::log_query_failure!("搜索 '{}': {}", term, e);
            e
        })?;
        info!("[SEARCH] '{}' 找到 {} 条结果", term, logs.len());
        Ok(logs.iter().map(SearchResult::from).collect())
    }

    async fn fetch_report(&self, test_log_id: i32) -> AppResult<LoadedReport> {
        let log = self
            .queries
            .get_test_log(test_log_id)
            .await?
            .ok_or_else(|| AppError::not_found_error("TestLog", "Test log not found in database."))?;
        let pia_serial = self
            .queries
            .find_board_by_id(log.pia_board_id)
            .await?
            .map(|b| b.serial_number)
            .unwrap_or_else(|| "N/A".to_string());
        let html = load_report_html(&self.queries, test_log_id).await?;
        Ok(LoadedReport {
            test_log_id,
            title: format!(
                "{} | {} | {}",
                log.name.as_deref().unwrap_or("Test Log"),
                pia_serial,
                log.created_at.format("%Y-%m-%d %H:%M")
            ),
            pia_serial,
            created_at: log.created_at,
            html,
        })
    }

    /// 在单视图中打开报告，并退出对比模式
    pub async fn load_report(&mut self, test_log_id: i32) -> AppResult<LoadedReport> {
        let report = self.fetch_report(test_log_id).await?;
        if self.compare_mode {
            self.set_compare_mode(false);
        }
        self.single.load(report.clone());
        self.add_to_recent(&report);
        info!("[SEARCH] 打开测试日志 {} 的报告", test_log_id);
        Ok(report)
    }

    /// 点击结果：对比模式下填入左/右侧，否则在单视图中打开
    pub async fn select_result(&mut self, test_log_id: i32) -> AppResult<SelectionOutcome> {
        if self.compare_mode {
            let (side, report) = self.compare_select(test_log_id).await?;
            Ok(SelectionOutcome::Compare { side, report })
        } else {
            let report = self.load_report(test_log_id).await?;
            Ok(SelectionOutcome::Single { report })
        }
    }

    pub fn compare_mode(&self) -> bool {
        self.compare_mode
    }

    /// 关闭对比模式时清空左右两侧
    pub fn set_compare_mode(&mut self, enabled: bool) {
        self.compare_mode = enabled;
        if !enabled {
            self.clear_compare();
        }
    }

    /// 先填左侧，再填右侧；两侧都有时替换右侧
    pub async fn compare_select(&mut self, test_log_id: i32) -> AppResult<(CompareSide, LoadedReport)> {
        let report = self.fetch_report(test_log_id).await?;
        let side = if self.left.report.is_none() {
            self.left.load(report.clone());
            CompareSide::Left
        } else {
            self.right.load(report.clone());
            CompareSide::Right
        };
        Ok((side, report))
    }

    pub fn clear_compare(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    pub fn viewer(&self) -> &ReportViewer {
        &self.single
    }

    pub fn viewer_mut(&mut self) -> &mut ReportViewer {
        &mut self.single
    }

    pub fn compare_viewers(&self) -> (&ReportViewer, &ReportViewer) {
        (&self.left, &self.right)
    }

    /// 其它页面直接显示一段 HTML
    pub fn display_html(&mut self, html: String, title: &str) {
        if self.compare_mode {
            self.set_compare_mode(false);
        }
        self.single.load(LoadedReport {
            test_log_id: 0,
            title: title.to_string(),
            pia_serial: "unknown".to_string(),
            created_at: crate::utils::time_utils::now_naive_utc(),
            html,
        });
    }

    fn add_to_recent(&mut self, report: &LoadedReport) {
        self.recent.retain(|r| r.test_log_id != report.test_log_id);
        self.recent.insert(
            0,
            RecentReport {
                test_log_id: report.test_log_id,
                title: format!("{} | {}", report.pia_serial, report.created_at.format("%Y-%m-%d %H:%M")),
                opened_at: Utc::now(),
            },
        );
        self.recent.truncate(self.settings.max_recent_reports);
    }

    pub fn recent_reports(&self) -> &[RecentReport] {
        &self.recent
    }

    pub fn clear_recent(&mut self) {
        self.recent.clear();
    }

    fn current_report(&self) -> AppResult<&LoadedReport> {
        self.single
            .report
            .as_ref()
            .ok_or_else(|| AppError::validation_error("No report loaded to export."))
    }

    pub fn default_export_name(&self) -> Option<String> {
        self.single.report.as_ref().map(LoadedReport::default_file_name)
    }

    /// 导出当前报告的 HTML
    pub async fn export_html(&self, path: &Path) -> AppResult<()> {
        let report = self.current_report()?;
        tokio::fs::write(path, &report.html).await.map_err(|e| {
            crate::log_export_failure!("导出 HTML {}: {}", path.display(), e);
            AppError::from(e)
        })?;
        crate::log_user_operation!("导出报告 {} 到 {}", report.test_log_id, path.display());
        Ok(())
    }

    /// 左右两侧报告并排的单个 HTML 页面
    pub fn render_comparison(&self) -> AppResult<String> {
        let (left, right) = match (&self.left.report, &self.right.report) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(AppError::validation_error("对比需要先选择左右两份报告")),
        };
        let mut context = Context::new();
        context.insert("left", left);
        context.insert("right", right);
        context.insert("generated_at", &Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());
        Ok(self.templates.render(COMPARE_TEMPLATE, &context)?)
    }

    pub async fn export_comparison(&self, path: &Path) -> AppResult<()> {
        let page = self.render_comparison()?;
        tokio::fs::write(path, page).await?;
        crate::log_user_operation!("导出对比页面到 {}", path.display());
        Ok(())
    }

    /// 把当前报告写入临时文件，交给系统浏览器打开
    pub async fn write_temp_html(&self) -> AppResult<PathBuf> {
        let report = self.current_report()?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let path = self.temp_dir.join(format!("{}{}.html", TEMP_FILE_PREFIX, Uuid::new_v4()));
        tokio::fs::write(&path, &report.html).await?;
        debug!("[SEARCH] 临时报告文件 {}", path.display());
        Ok(path)
    }

    /// 删除超过保留时长的临时报告文件，返回删除数量
    pub fn cleanup_temp_files(&self) -> AppResult<usize> {
        let retention = Duration::from_secs(self.settings.temp_retention_hours * 3600);
        cleanup_temp_dir(&self.temp_dir, retention, SystemTime::now())
    }
}

#[async_trait]
impl BaseService for SearchService {
    fn service_name(&self) -> &'static str {
        "SearchService"
    }

    /// 退出时删除过期的临时报告
    async fn shutdown(&mut self) -> AppResult<()> {
        let removed = self.cleanup_temp_files()?;
        debug!("[SEARCH] 关闭时清理临时报告 {} 个", removed);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        if self.temp_dir.exists() && !self.temp_dir.is_dir() {
            return Err(AppError::io_error(
                format!("临时目录 {} 不是目录", self.temp_dir.display()),
                "NotADirectory",
            ));
        }
        Ok(())
    }
}

/// 只处理本服务写出的 `pcba_report_*.html`
pub fn cleanup_temp_dir(dir: &Path, retention: Duration, now: SystemTime) -> AppResult<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let cutoff = FileTime::from_system_time(now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH));
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(TEMP_FILE_PREFIX) || !name.ends_with(".html") {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        if FileTime::from_last_modification_time(&metadata) < cutoff {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("[SEARCH] 删除临时文件 {} 失败: {}", name, e),
            }
        }
    }
    if removed > 0 {
        info!("[SEARCH] 清理了 {} 个过期临时报告", removed);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::persistence::{DatabaseManager, NewTestLog, TestDataGenerator};
    use crate::utils::time_utils;
    use chrono::Duration as ChronoDuration;

    async fn seeded(temp: &Path) -> (DatabaseManager, SearchService) {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();
        let base = time_utils::days_ago(3);

        let file_report = temp.join("stored.html");
        std::fs::write(&file_report, "<html>from file</html>").unwrap();

        let mut logs = Vec::new();
        for i in 0..12 {
            let mut log = NewTestLog::new(&format!("PIA-{:02}", i), base + ChronoDuration::minutes(i))
                .part("PART-X")
                .html(&format!("<html>report {}</html>", i));
            log.name = Some(format!("Full Test {}", i));
            logs.push(log);
        }
        let mut from_file = NewTestLog::new("PIA-FILE", base).pmt("PMT-77", "BATCH-7");
        from_file.html_path = Some(file_report.to_string_lossy().to_string());
        logs.push(from_file);
        logs.push(NewTestLog::new("PIA-EMPTY", base));

        for log in &logs {
            TestDataGenerator::insert_test_log(db.as_ref(), log).await.unwrap();
        }
        let svc = SearchService::new(manager.queries(), SearchConfig::default(), temp.join("tmp")).unwrap();
        (manager, svc)
    }

    async fn id_of(manager: &DatabaseManager, serial: &str) -> i32 {
        let board = manager.queries().find_board_by_serial(serial).await.unwrap().unwrap();
        manager.queries().test_logs_for_board(board.id).await.unwrap()[0].id
    }

    #[tokio::test]
    async fn search_labels_and_empty_term() {
        let dir = tempfile::tempdir().unwrap();
        let (_m, svc) = seeded(dir.path()).await;
        assert!(svc.search("  ").await.is_err());

        let results = svc.search("pia-0").await.unwrap();
        assert_eq!(results.len(), 10);
        assert!(results[0].label.starts_with("Full Test 9 | PIA-09 | "));

        let by_batch = svc.search("batch-7").await.unwrap();
        assert_eq!(by_batch.len(), 1);
        assert!(by_batch[0].tooltip.contains("PMT: PMT-77"));
    }

    #[tokio::test]
    async fn autocomplete_prefers_prefix_matches() {
        let dir = tempfile::tempdir().unwrap();
        let (_m, mut svc) = seeded(dir.path()).await;
        let count = svc.load_autocomplete().await.unwrap();
        // 14 个板卡序列号、1 个料号、1 个 PMT 序列号、1 个批次
        assert_eq!(count, 17);

        let hits = svc.suggestions("pmt");
        assert_eq!(hits, vec!["PMT-77"]);
        let hits = svc.suggestions("7");
        assert_eq!(hits, vec!["BATCH-7", "PIA-07", "PMT-77"]);
        assert_eq!(svc.suggestions("pia").len(), 14);
        assert!(svc.suggestions("").is_empty());
    }

    #[tokio::test]
    async fn html_falls_back_to_file_then_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _svc) = seeded(dir.path()).await;
        let queries = manager.queries();

        let stored = id_of(&manager, "PIA-03").await;
        assert_eq!(load_report_html(&queries, stored).await.unwrap(), "<html>report 3</html>");

        let from_file = id_of(&manager, "PIA-FILE").await;
        assert_eq!(load_report_html(&queries, from_file).await.unwrap(), "<html>from file</html>");

        let empty = id_of(&manager, "PIA-EMPTY").await;
        assert!(load_report_html(&queries, empty).await.unwrap().contains("No HTML content"));

        // 文件已被删除时同样显示占位页面
        let mut missing = NewTestLog::new("PIA-GONE", time_utils::days_ago(1));
        missing.html_path = Some(dir.path().join("deleted.html").to_string_lossy().to_string());
        let gone = TestDataGenerator::insert_test_log(manager.connection().as_ref(), &missing)
            .await
            .unwrap()
            .id;
        assert!(load_report_html(&queries, gone).await.unwrap().contains("No HTML content"));
    }

    #[tokio::test]
    async fn recent_list_is_deduplicated_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut svc) = seeded(dir.path()).await;
        for i in 0..12 {
            let id = id_of(&manager, &format!("PIA-{:02}", i)).await;
            svc.load_report(id).await.unwrap();
        }
        assert_eq!(svc.recent_reports().len(), 10);
        assert!(svc.recent_reports()[0].title.starts_with("PIA-11 | "));

        let again = id_of(&manager, "PIA-05").await;
        svc.load_report(again).await.unwrap();
        assert_eq!(svc.recent_reports().len(), 10);
        assert_eq!(svc.recent_reports()[0].test_log_id, again);
        assert_eq!(svc.recent_reports().iter().filter(|r| r.test_log_id == again).count(), 1);

        svc.clear_recent();
        assert!(svc.recent_reports().is_empty());
        assert!(svc.load_report(99_999).await.is_err());
    }

    #[tokio::test]
    async fn compare_fills_left_then_replaces_right() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut svc) = seeded(dir.path()).await;
        let a = id_of(&manager, "PIA-01").await;
        let b = id_of(&manager, "PIA-02").await;
        let c = id_of(&manager, "PIA-03").await;

        svc.set_compare_mode(true);
        assert!(matches!(
            svc.select_result(a).await.unwrap(),
            SelectionOutcome::Compare { side: CompareSide::Left, .. }
        ));
        assert!(svc.render_comparison().is_err());
        svc.select_result(b).await.unwrap();
        let (side, _) = svc.compare_select(c).await.unwrap();
        assert_eq!(side, CompareSide::Right);

        let (left, right) = svc.compare_viewers();
        assert_eq!(left.report.as_ref().unwrap().test_log_id, a);
        assert_eq!(right.report.as_ref().unwrap().test_log_id, c);

        let page = svc.render_comparison().unwrap();
        assert!(page.contains("&lt;html&gt;report 1&lt;&#x2F;html&gt;"));
        assert!(page.contains("PIA-03"));

        // 打开单个报告会退出对比模式
        svc.load_report(a).await.unwrap();
        assert!(!svc.compare_mode());
        assert!(svc.compare_viewers().0.report.is_none());
    }

    #[tokio::test]
    async fn export_html_and_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut svc) = seeded(dir.path()).await;
        assert!(svc.export_html(&dir.path().join("none.html")).await.is_err());

        let id = id_of(&manager, "PIA-04").await;
        let report = svc.load_report(id).await.unwrap();
        let name = svc.default_export_name().unwrap();
        assert_eq!(
            name,
            format!("test_report_PIA-04_{}.html", report.created_at.format("%Y%m%d_%H%M%S"))
        );

        let out = dir.path().join(&name);
        svc.export_html(&out).await.unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "<html>report 4</html>");
    }

    #[tokio::test]
    async fn temp_files_are_cleaned_after_retention() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut svc) = seeded(dir.path()).await;
        let id = id_of(&manager, "PIA-00").await;
        svc.load_report(id).await.unwrap();

        let fresh = svc.write_temp_html().await.unwrap();
        let stale = svc.write_temp_html().await.unwrap();
        let unrelated = dir.path().join("tmp").join("keep.html");
        std::fs::write(&unrelated, "x").unwrap();

        let two_days_ago = SystemTime::now() - Duration::from_secs(48 * 3600);
        filetime::set_file_mtime(&stale, FileTime::from_system_time(two_days_ago)).unwrap();
        filetime::set_file_mtime(&unrelated, FileTime::from_system_time(two_days_ago)).unwrap();

        assert_eq!(svc.cleanup_temp_files().unwrap(), 1);
        assert!(fresh.exists());
        assert!(!stale.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewer = ReportViewer::default();
        for _ in 0..20 {
            viewer.zoom_in();
        }
        assert_eq!(viewer.zoom_percent, ZOOM_MAX);
        for _ in 0..30 {
            viewer.zoom_out();
        }
        assert_eq!(viewer.zoom_percent, ZOOM_MIN);
        assert_eq!(viewer.zoom_reset(), 100);
        assert_eq!(viewer.info_text(), "No report loaded");
    }
}
