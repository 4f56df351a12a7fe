/// 报表页服务
///
/// 按选中的测量项和过滤条件生成报表行，支持删行、隐藏列、恢复，
/// 最后交给 `ReportWriter` 写出 Excel。
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::models::enums::OrderKey;
use crate::models::report::{evaluate_limits, ExportStyle, ReportColumn, ReportRequest, ReportRow};
use crate::models::structs::{MeasurementRecord, SpecQueryFilter};
use crate::services::infrastructure::excel::report_writer::{visible_columns, ReportExportSummary, ReportWriter};
use crate::services::infrastructure::persistence::Queries;
use crate::utils::config::ReportConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

const NA: &str = "N/A";
/// 页面上每设备测试次数的可选范围
pub const MAX_TESTS_RANGE: (usize, usize) = (1, 10);

/// 报表页各下拉框的候选值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilterOptions {
    pub spec_names: Vec<String>,
    pub pia_parts: Vec<String>,
    pub pia_serials: Vec<String>,
    pub pmt_batches: Vec<String>,
    pub pmt_serials: Vec<String>,
    pub test_fixtures: Vec<String>,
}

/// 当前表格的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<ReportRow>,
    pub subtitle: String,
}

/// 测量项列表的客户端过滤（不区分大小写的子串）
pub fn filter_spec_names<'a>(names: &'a [String], text: &str) -> Vec<&'a str> {
    let needle = text.to_lowercase();
    names
        .iter()
        .filter(|n| n.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

/// 默认导出文件名
pub fn default_export_file_name() -> String {
    format!("pcba_report_{}.xlsx", time_utils::file_stamp())
}

fn or_na(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_else(|| NA.to_string())
}

impl From<&MeasurementRecord> for ReportRow {
    fn from(record: &MeasurementRecord) -> Self {
        let spec = &record.spec;
        let log = &record.test_log;
        let pmt = record.pmt.as_ref();
        ReportRow {
            spec_id: spec.id,
            spec_name: spec.name.clone().unwrap_or_default(),
            measurement: spec.measurement,
            unit: spec.unit.clone().unwrap_or_default(),
            lower_limit: spec.lower_limit,
            upper_limit: spec.upper_limit,
            nominal: spec.nominal,
            result: spec.result,
            passed: evaluate_limits(spec.measurement, spec.lower_limit, spec.upper_limit),
            has_plot: spec.has_plot.unwrap_or(false),
            plot_data: spec.plot_data.clone(),
            pia_serial: record.board.serial_number.clone(),
            pia_part: or_na(record.board.part_number.as_deref()),
            pmt_serial: or_na(pmt.and_then(|p| p.pmt_serial_number.as_deref())),
            pmt_batch: or_na(pmt.and_then(|p| p.batch_number.as_deref())),
            test_name: or_na(log.name.as_deref()),
            test_fixture: or_na(log.test_fixture.as_deref()),
            test_date: log.created_at,
            test_log_id: log.id,
        }
    }
}

/// 按（板卡, PMT, 测量项）分组，每组最多保留 `max_tests` 行
///
/// 输入按时间倒序，分组按首次出现的顺序输出。
pub fn cap_per_device(records: &[MeasurementRecord], max_tests: usize) -> Vec<ReportRow> {
    let mut groups: Vec<((String, String, String), Vec<ReportRow>)> = Vec::new();
    for record in records {
        let row = ReportRow::from(record);
        let key = (row.pia_serial.clone(), row.pmt_serial.clone(), row.spec_name.clone());
        let idx = match groups.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                groups.push((key, Vec::new()));
                groups.len() - 1
            }
        };
        let rows = &mut groups[idx].1;
        if rows.len() < max_tests {
            rows.push(row);
        }
    }
    groups.into_iter().flat_map(|(_, rows)| rows).collect()
}

pub struct ReportGenerationService {
    queries: Queries,
    settings: ReportConfig,
    style: ExportStyle,
    original: Vec<ReportRow>,
    rows: Vec<ReportRow>,
    hidden_columns: HashSet<ReportColumn>,
    selected_spec_count: usize,
}

impl ReportGenerationService {
    pub fn new(queries: Queries, settings: ReportConfig) -> Self {
        let style = settings.default_style.clone();
        Self {
            queries,
            settings,
            style,
            original: Vec::new(),
            rows: Vec::new(),
            hidden_columns: HashSet::new(),
            selected_spec_count: 0,
        }
    }

    /// 新请求的默认值：最近六个月、每设备次数取配置值
    pub fn default_request(&self, spec_names: Vec<String>) -> ReportRequest {
        let mut request = ReportRequest::new(spec_names);
        request.max_tests = self.settings.max_tests_per_device;
        request.date_from = Some(time_utils::months_ago(6));
        request.date_to = Some(time_utils::now_naive_utc().date());
        request
    }

    pub async fn filter_options(&self) -> AppResult<ReportFilterOptions> {
        Ok(ReportFilterOptions {
            spec_names: self.queries.spec_names().await?,
            pia_parts: self.queries.board_part_numbers().await?,
            pia_serials: self.queries.board_serial_numbers().await?,
            pmt_batches: self.queries.pmt_batch_numbers().await?,
            pmt_serials: self.queries.pmt_serial_numbers().await?,
            test_fixtures: self.queries.test_fixtures().await?,
        })
    }

    fn query_filter(request: &ReportRequest) -> SpecQueryFilter {
        let clean = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        SpecQueryFilter {
            spec_names: request.spec_names.clone(),
            pia_part: clean(&request.pia_part),
            pia_serial: clean(&request.pia_serial),
            pmt_batch: clean(&request.pmt_batch),
            pmt_serial: clean(&request.pmt_serial),
            test_fixture: clean(&request.test_fixture),
            date_from: request.date_from,
            date_to: request.date_to,
            order_key: Some(OrderKey::Recent),
            ..Default::default()
        }
    }

    /// 生成报表，成功后同时保存一份原始快照供恢复
    pub async fn generate_report(&mut self, request: ReportRequest) -> AppResult<ReportTable> {
        if request.spec_names.is_empty() {
            return Err(AppError::validation_error("Please select at least one spec to generate a report."));
        }
        if let (Some(from), Some(to)) = (request.date_from, request.date_to) {
            if from > to {
                return Err(AppError::validation_error(format!("起始日期 {} 晚于结束日期 {}", from, to)));
            }
        }
        let max_tests = request.max_tests.clamp(MAX_TESTS_RANGE.0, MAX_TESTS_RANGE.1);

        let records = self
            .queries
            .measurements(&Self::query_filter(&request))
            .await
            .map_err(|e| {
                crate::log_query_failure!("报表查询失败: {}", e);
                e
            })?;

        self.rows = cap_per_device(&records, max_tests);
        self.original = self.rows.clone();
        self.hidden_columns.clear();
        self.selected_spec_count = request.spec_names.len();
        info!(
            "[REPORT] 生成报表 {} 行（{} 个测量项, {} 条原始记录）",
            self.rows.len(),
            self.selected_spec_count,
            records.len()
        );

        let subtitle = format!("{} measurements from {} specs", self.rows.len(), self.selected_spec_count);
        Ok(self.table_with_subtitle(subtitle))
    }

    fn table_with_subtitle(&self, subtitle: String) -> ReportTable {
        ReportTable {
            columns: visible_columns(&self.style, &self.hidden_columns),
            rows: self.rows.clone(),
            subtitle,
        }
    }

    pub fn table(&self) -> ReportTable {
        self.table_with_subtitle(format!("{} measurements", self.rows.len()))
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// 删除指定下标的行，越界下标忽略，返回删除的行数
    pub fn delete_rows(&mut self, indices: &[usize]) -> usize {
        let mut sorted: Vec<usize> = indices.iter().copied().filter(|i| *i < self.rows.len()).collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for idx in &sorted {
            self.rows.remove(*idx);
        }
        sorted.len()
    }

    /// 隐藏列（导出时同样不输出）
    ///
    /// 转置布局按测量项名称展开列，不支持隐藏。
    pub fn delete_columns(&mut self, columns: &[ReportColumn]) -> AppResult<()> {
        if self.style.transpose {
            return Err(AppError::validation_error("转置布局下不能删除列，请先关闭转置"));
        }
        let remaining = visible_columns(&self.style, &self.hidden_columns)
            .into_iter()
            .filter(|c| !columns.contains(c))
            .count();
        if remaining == 0 {
            return Err(AppError::validation_error("至少需要保留一列"));
        }
        self.hidden_columns.extend(columns.iter().copied());
        Ok(())
    }

    /// 恢复到生成时的行和列
    pub fn reset(&mut self) -> AppResult<ReportTable> {
        if self.original.is_empty() {
            return Err(AppError::validation_error(
                "No original data to reset to. Please generate a report first.",
            ));
        }
        self.rows = self.original.clone();
        self.hidden_columns.clear();
        Ok(self.table())
    }

    pub fn style(&self) -> &ExportStyle {
        &self.style
    }

    /// 更新导出样式，颜色必须是合法的十六进制值
    pub fn set_style(&mut self, style: ExportStyle) -> AppResult<()> {
        if style.transpose && !self.hidden_columns.is_empty() {
            return Err(AppError::validation_error("已删除的列在转置布局中无法保留，请先重置表格"));
        }
        for (name, value) in style.named_colors() {
            crate::services::infrastructure::plot_renderer::parse_hex_color(value)
                .map_err(|_| AppError::validation_error(format!("{} 颜色值无效: {}", name, value)))?;
        }
        self.style = style;
        Ok(())
    }

    /// 未指定路径时写入配置的导出目录
    pub fn resolve_export_path(&self, path: Option<&Path>) -> PathBuf {
        match path {
            Some(p) => p.to_path_buf(),
            None => self
                .settings
                .export_directory
                .clone()
                .unwrap_or_else(std::env::temp_dir)
                .join(default_export_file_name()),
        }
    }

    pub fn export_to_excel(&self, path: &Path) -> AppResult<ReportExportSummary> {
        if self.rows.is_empty() {
            return Err(AppError::validation_error("Please generate a report first before exporting."));
        }
        let summary = ReportWriter::write_report(path, &self.rows, &self.style, &self.hidden_columns).map_err(|e| {
            crate::log_export_failure!("报表导出 {}: {}", path.display(), e);
            e
        })?;
        crate::log_user_operation!("导出报表 {} ({} 行)", path.display(), summary.data_rows);
        Ok(summary)
    }

    /// 报表涉及的测试日期范围
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.test_date.date()).min()?;
        let max = self.rows.iter().map(|r| r.test_date.date()).max()?;
        Some((min, max))
    }
}
