//! 报表页数据模型：导出样式、报表请求与报表行

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::time_utils;

/// Excel 导出样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportStyle {
    // 表头
    pub header_bg_color: String,
    pub header_text_color: String,
    pub header_font_bold: bool,
    pub header_font_size: f64,

    // 数据行
    pub data_bg_color: String,
    pub data_text_color: String,
    pub data_font_size: f64,

    // 斑马纹
    pub zebra_enabled: bool,
    pub zebra_color: String,

    // 边框
    pub border_color: String,
    /// thin | medium | thick | none
    pub border_style: String,

    // 条件格式
    pub pass_color: String,
    pub fail_color: String,
    pub conditional_enabled: bool,

    // 布局
    pub transpose: bool,
    pub include_limits: bool,
    pub include_units: bool,
    pub include_timestamps: bool,
    pub include_plots: bool,

    // 分组表头
    pub group_header_enabled: bool,
    pub group_header_bg_color: String,
}

impl Default for ExportStyle {
    fn default() -> Self {
        Self {
            header_bg_color: "#1e293b".to_string(),
            header_text_color: "#f8fafc".to_string(),
            header_font_bold: true,
            header_font_size: 12.0,
            data_bg_color: "#0f172a".to_string(),
            data_text_color: "#f8fafc".to_string(),
            data_font_size: 11.0,
            zebra_enabled: true,
            zebra_color: "#1e293b".to_string(),
            border_color: "#334155".to_string(),
            border_style: "thin".to_string(),
            pass_color: "#22c55e".to_string(),
            fail_color: "#ef4444".to_string(),
            conditional_enabled: true,
            transpose: false,
            include_limits: true,
            include_units: true,
            include_timestamps: true,
            include_plots: true,
            group_header_enabled: true,
            group_header_bg_color: "#334155".to_string(),
        }
    }
}

impl ExportStyle {
    /// 所有颜色字段（名称, 值），用于配置校验
    pub fn named_colors(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("header_bg_color", self.header_bg_color.as_str()),
            ("header_text_color", self.header_text_color.as_str()),
            ("data_bg_color", self.data_bg_color.as_str()),
            ("data_text_color", self.data_text_color.as_str()),
            ("zebra_color", self.zebra_color.as_str()),
            ("border_color", self.border_color.as_str()),
            ("pass_color", self.pass_color.as_str()),
            ("fail_color", self.fail_color.as_str()),
            ("group_header_bg_color", self.group_header_bg_color.as_str()),
        ]
    }
}

/// 报表生成请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    /// 选中的测量项名称，不能为空
    pub spec_names: Vec<String>,
    pub pia_part: Option<String>,
    pub pia_serial: Option<String>,
    pub pmt_batch: Option<String>,
    pub pmt_serial: Option<String>,
    pub test_fixture: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// 每个（板卡, PMT, 测量项）最多保留的测试次数
    pub max_tests: usize,
}

impl ReportRequest {
    pub fn new(spec_names: Vec<String>) -> Self {
        Self {
            spec_names,
            pia_part: None,
            pia_serial: None,
            pmt_batch: None,
            pmt_serial: None,
            test_fixture: None,
            date_from: None,
            date_to: None,
            max_tests: 5,
        }
    }
}

/// 报表中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub spec_id: i32,
    pub spec_name: String,
    pub measurement: Option<f64>,
    pub unit: String,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub nominal: Option<f64>,
    pub result: Option<bool>,
    /// 由上下限计算出的判定
    pub passed: Option<bool>,
    pub has_plot: bool,
    pub plot_data: Option<String>,
    pub pia_serial: String,
    pub pia_part: String,
    pub pmt_serial: String,
    pub pmt_batch: String,
    pub test_name: String,
    pub test_fixture: String,
    pub test_date: NaiveDateTime,
    pub test_log_id: i32,
}

impl ReportRow {
    pub fn status_text(&self) -> &'static str {
        match self.passed {
            Some(true) => "PASS",
            Some(false) => "FAIL",
            None => "N/A",
        }
    }

    pub fn test_date_text(&self) -> String {
        time_utils::format_display(&self.test_date)
    }

    /// 转置布局中的设备键
    pub fn device_key(&self) -> String {
        format!("{}_{}", self.pia_serial, self.pmt_serial)
    }
}

/// 按上下限判定测量是否通过
///
/// 两个限值都有时闭区间判断；只有一个限值时单边判断；没有限值或没有测量值时无法判定
pub fn evaluate_limits(measurement: Option<f64>, lower: Option<f64>, upper: Option<f64>) -> Option<bool> {
    let m = measurement?;
    match (lower, upper) {
        (Some(lo), Some(hi)) => Some(lo <= m && m <= hi),
        (Some(lo), None) => Some(m >= lo),
        (None, Some(hi)) => Some(m <= hi),
        (None, None) => None,
    }
}

/// 普通布局中的列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportColumn {
    SpecName,
    Unit,
    LowerLimit,
    UpperLimit,
    Measurement,
    Status,
    PiaSerial,
    PiaPart,
    PmtSerial,
    PmtBatch,
    TestName,
    TestFixture,
    TestDate,
}

impl ReportColumn {
    pub const ALL: [ReportColumn; 13] = [
        ReportColumn::SpecName,
        ReportColumn::Unit,
        ReportColumn::LowerLimit,
        ReportColumn::UpperLimit,
        ReportColumn::Measurement,
        ReportColumn::Status,
        ReportColumn::PiaSerial,
        ReportColumn::PiaPart,
        ReportColumn::PmtSerial,
        ReportColumn::PmtBatch,
        ReportColumn::TestName,
        ReportColumn::TestFixture,
        ReportColumn::TestDate,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            ReportColumn::SpecName => "Spec Name",
            ReportColumn::Unit => "Unit",
            ReportColumn::LowerLimit => "Lower Limit",
            ReportColumn::UpperLimit => "Upper Limit",
            ReportColumn::Measurement => "Measurement",
            ReportColumn::Status => "Status",
            ReportColumn::PiaSerial => "PIA Serial",
            ReportColumn::PiaPart => "PIA Part",
            ReportColumn::PmtSerial => "PMT Serial",
            ReportColumn::PmtBatch => "PMT Batch",
            ReportColumn::TestName => "Test Name",
            ReportColumn::TestFixture => "Test Fixture",
            ReportColumn::TestDate => "Test Date",
        }
    }

    /// 按样式开关决定是否输出
    pub fn enabled_by(&self, style: &ExportStyle) -> bool {
        match self {
            ReportColumn::Unit => style.include_units,
            ReportColumn::LowerLimit | ReportColumn::UpperLimit => style.include_limits,
            ReportColumn::TestDate => style.include_timestamps,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_evaluation() {
        assert_eq!(evaluate_limits(Some(1.0), Some(0.0), Some(2.0)), Some(true));
        assert_eq!(evaluate_limits(Some(2.0), Some(0.0), Some(2.0)), Some(true));
        assert_eq!(evaluate_limits(Some(2.1), Some(0.0), Some(2.0)), Some(false));
        assert_eq!(evaluate_limits(Some(-1.0), Some(0.0), None), Some(false));
        assert_eq!(evaluate_limits(Some(5.0), None, Some(4.0)), Some(false));
        assert_eq!(evaluate_limits(Some(5.0), None, None), None);
        assert_eq!(evaluate_limits(None, Some(0.0), Some(1.0)), None);
    }

    #[test]
    fn default_style_matches_dark_palette() {
        let style = ExportStyle::default();
        assert_eq!(style.header_bg_color, "#1e293b");
        assert_eq!(style.pass_color, "#22c55e");
        assert!(!style.transpose);
        assert!(style.include_plots);
    }
}
