use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::entities::{pia_board, pmt_device, spec, sub_test, test_log};
use super::enums::{OrderKey, ResultFilter};
use crate::utils::time_utils;

/// 一条曲线数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    #[serde(default)]
    pub x: Vec<f64>,
    #[serde(default)]
    pub y: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// plot_data 列的两种存储形式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlotPayload {
    Single(PlotSeries),
    Multiple(Vec<PlotSeries>),
}

impl PlotPayload {
    pub fn into_series(self) -> Vec<PlotSeries> {
        match self {
            PlotPayload::Single(s) => vec![s],
            PlotPayload::Multiple(v) => v,
        }
    }
}

/// 完整加载的测量记录：测量项及其子测试、测试日志、板卡和可选 PMT
///
/// 查询时一次性加载全部父对象，绘图、报表不再访问数据库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub spec: spec::Model,
    pub sub_test: sub_test::Model,
    pub test_log: test_log::Model,
    pub board: pia_board::Model,
    pub pmt: Option<pmt_device::Model>,
}

/// 按字段路径取出的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Time(NaiveDateTime),
    Flag(bool),
}

impl FieldValue {
    /// 绘图用数值，时间取 epoch 秒，文本无法转换时为 None
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Time(t) => Some(time_utils::to_epoch_seconds(t)),
            FieldValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Time(t) => write!(f, "{}", t),
            FieldValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

fn text(v: &Option<String>) -> Option<FieldValue> {
    v.as_ref().map(|s| FieldValue::Text(s.clone()))
}

fn number(v: Option<f64>) -> Option<FieldValue> {
    v.map(FieldValue::Number)
}

impl MeasurementRecord {
    pub fn spec_id(&self) -> i32 {
        self.spec.id
    }

    pub fn name(&self) -> Option<&str> {
        self.spec.name.as_deref()
    }

    pub fn measurement(&self) -> Option<f64> {
        self.spec.measurement
    }

    pub fn test_log_id(&self) -> i32 {
        self.test_log.id
    }

    pub fn board_serial(&self) -> &str {
        &self.board.serial_number
    }

    pub fn pmt_serial(&self) -> Option<&str> {
        self.pmt.as_ref().and_then(|p| p.pmt_serial_number.as_deref())
    }

    pub fn pmt_batch(&self) -> Option<&str> {
        self.pmt.as_ref().and_then(|p| p.batch_number.as_deref())
    }

    pub fn fixture(&self) -> Option<&str> {
        self.test_log.test_fixture.as_deref()
    }

    /// 是否为需要叠加显示的曲线型测量
    pub fn is_plot(&self) -> bool {
        self.spec.has_plot.unwrap_or(false)
            && self.spec.plot_data.as_deref().map_or(false, |d| !d.trim().is_empty())
    }

    /// 按点号路径取字段
    ///
    /// 无前缀的字段属于测量项本身（`created_at` 即测量项时间）；
    /// 前缀 `sub_test.`、`test_log.`、`board.`/`pia.`、`pmt.` 指向对应父对象
    pub fn field_value(&self, path: &str) -> Option<FieldValue> {
        let (owner, field) = match path.split_once('.') {
            Some((owner, field)) => (owner, field),
            None => ("spec", path),
        };

        match owner {
            "spec" => match field {
                "id" => Some(FieldValue::Number(self.spec.id as f64)),
                "name" => text(&self.spec.name),
                "unit" => text(&self.spec.unit),
                "created_at" => Some(FieldValue::Time(self.spec.created_at)),
                "measurement" => number(self.spec.measurement),
                "lower_limit" => number(self.spec.lower_limit),
                "nominal" => number(self.spec.nominal),
                "upper_limit" => number(self.spec.upper_limit),
                "result" => self.spec.result.map(FieldValue::Flag),
                _ => None,
            },
            "sub_test" => match field {
                "id" => Some(FieldValue::Number(self.sub_test.id as f64)),
                "name" => text(&self.sub_test.name),
                "created_at" => Some(FieldValue::Time(self.sub_test.created_at)),
                _ => None,
            },
            "test_log" => match field {
                "id" => Some(FieldValue::Number(self.test_log.id as f64)),
                "name" => text(&self.test_log.name),
                "test_fixture" => text(&self.test_log.test_fixture),
                "generation_project" => text(&self.test_log.generation_project),
                "script_version" => text(&self.test_log.script_version),
                "created_at" => Some(FieldValue::Time(self.test_log.created_at)),
                "full_test_completed" => Some(FieldValue::Flag(self.test_log.full_test_completed)),
                "full_test_passed" => Some(FieldValue::Flag(self.test_log.full_test_passed)),
                _ => None,
            },
            "board" | "pia" | "pia_board" => match field {
                "serial_number" => Some(FieldValue::Text(self.board.serial_number.clone())),
                "part_number" => text(&self.board.part_number),
                "generation_project" => text(&self.board.generation_project),
                "version" => text(&self.board.version),
                _ => None,
            },
            "pmt" | "pmt_device" => {
                let pmt = self.pmt.as_ref()?;
                match field {
                    "pmt_serial_number" => text(&pmt.pmt_serial_number),
                    "batch_number" => text(&pmt.batch_number),
                    "generation" => text(&pmt.generation),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// 测量查询过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecQueryFilter {
    /// 测量项名称，为空表示不限
    #[serde(default)]
    pub spec_names: Vec<String>,
    /// CSV 标识列表，与板卡序列号、料号、PMT 序列号做大写比较
    #[serde(default)]
    pub csv_identifiers: Vec<String>,
    pub pia_serial: Option<String>,
    pub pia_part: Option<String>,
    pub pmt_serial: Option<String>,
    pub pmt_batch: Option<String>,
    pub test_fixture: Option<String>,
    /// 包含式日期范围
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub full_tests_only: bool,
    pub order_key: Option<OrderKey>,
}

impl SpecQueryFilter {
    pub fn for_spec(name: impl Into<String>) -> Self {
        Self {
            spec_names: vec![name.into()],
            ..Default::default()
        }
    }
}

/// 测试日志浏览过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestLogFilter {
    pub search_term: Option<String>,
    pub test_fixture: Option<String>,
    #[serde(default)]
    pub result: ResultFilter,
    #[serde(default)]
    pub full_tests_only: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u64>,
}

/// 测试日志列表行（不含 HTML）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestLogSummary {
    pub id: i32,
    pub name: Option<String>,
    pub test_fixture: Option<String>,
    pub created_at: NaiveDateTime,
    pub full_test_completed: bool,
    pub full_test_passed: bool,
    pub pia_board_id: i32,
    pub pia_serial: String,
    pub pia_part: Option<String>,
    pub pmt_id: Option<i32>,
    pub pmt_serial: Option<String>,
    pub pmt_batch: Option<String>,
    pub has_html: bool,
}

impl TestLogSummary {
    pub fn from_models(
        log: &test_log::Model,
        board: &pia_board::Model,
        pmt: Option<&pmt_device::Model>,
    ) -> Self {
        Self {
            id: log.id,
            name: log.name.clone(),
            test_fixture: log.test_fixture.clone(),
            created_at: log.created_at,
            full_test_completed: log.full_test_completed,
            full_test_passed: log.full_test_passed,
            pia_board_id: board.id,
            pia_serial: board.serial_number.clone(),
            pia_part: board.part_number.clone(),
            pmt_id: pmt.map(|p| p.id),
            pmt_serial: pmt.and_then(|p| p.pmt_serial_number.clone()),
            pmt_batch: pmt.and_then(|p| p.batch_number.clone()),
            has_html: log.html_content.is_some() || log.html_path.is_some(),
        }
    }

    /// 搜索结果列表显示文本
    pub fn display_label(&self) -> String {
        format!(
            "{} | {} | {}",
            self.name.as_deref().unwrap_or("Unnamed Test"),
            self.pia_serial,
            time_utils::format_display(&self.created_at)
        )
    }
}

/// 板卡列表行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub board: pia_board::Model,
    pub test_log_count: u64,
}

/// PMT 列表行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmtSummary {
    pub pmt: pmt_device::Model,
    pub test_log_count: u64,
}

/// 厂商列表行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub contact_info: Option<String>,
    pub website: Option<String>,
    pub spec_count: u64,
    pub batch_count: u64,
}

/// 仪表盘统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_boards: u64,
    pub total_pmts: u64,
    pub total_test_logs: u64,
    pub completed_tests: u64,
    pub passed_tests: u64,
}

/// 厂商参考数据点（设备序列号、测量值、厂商名）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerDataPoint {
    pub device_serial: String,
    pub measurement: f64,
    pub manufacturer: String,
}

/// 厂商数据导入结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub manufacturers_added: u32,
    pub batches_added: u32,
    pub specs_added: u32,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn new() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }
}

/// 表结构说明（--info 输出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: i64,
}

/// 全库字符串搜索命中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringMatch {
    pub table: String,
    pub column: String,
    pub row_index: usize,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::MeasurementType;
    use chrono::NaiveDate;

    fn record() -> MeasurementRecord {
        let t = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();
        MeasurementRecord {
            spec: spec::Model {
                id: 7,
                sub_test_id: 3,
                name: Some("Gain".into()),
                unit: Some("dB".into()),
                created_at: t,
                measurement_type: MeasurementType::Range,
                measurement: Some(1.5),
                has_plot: Some(false),
                plot_image: None,
                plot_data: None,
                lower_limit: Some(1.0),
                nominal: Some(1.5),
                upper_limit: Some(2.0),
                result: Some(true),
            },
            sub_test: sub_test::Model {
                id: 3,
                test_log_id: 2,
                name: Some("Amp".into()),
                description: None,
                generation_project: None,
                script_version: None,
                created_at: t,
            },
            test_log: test_log::Model {
                id: 2,
                pia_board_id: 1,
                pmt_id: None,
                name: Some("Full".into()),
                description: None,
                generation_project: None,
                script_version: None,
                test_fixture: Some("FX-1".into()),
                created_at: t,
                full_test_completed: true,
                full_test_passed: true,
                html_path: None,
                html_content: None,
                html_hash: None,
            },
            board: pia_board::Model {
                id: 1,
                serial_number: "PIA-001".into(),
                part_number: Some("P-9".into()),
                generation_project: None,
                version: None,
                created_at: t,
                updated_at: t,
            },
            pmt: None,
        }
    }

    #[test]
    fn field_paths_resolve_to_parents() {
        let r = record();
        assert_eq!(
            r.field_value("test_log.test_fixture"),
            Some(FieldValue::Text("FX-1".into()))
        );
        assert_eq!(
            r.field_value("board.serial_number"),
            Some(FieldValue::Text("PIA-001".into()))
        );
        assert_eq!(r.field_value("measurement"), Some(FieldValue::Number(1.5)));
        assert!(r.field_value("pmt.batch_number").is_none());
        assert!(r.field_value("nonsense.field").is_none());
    }

    #[test]
    fn time_field_converts_to_epoch() {
        let r = record();
        let v = r.field_value("created_at").unwrap();
        assert!(v.as_f64().unwrap() > 1.7e9);
        assert_eq!(FieldValue::Text("x".into()).as_f64(), None);
    }
}
