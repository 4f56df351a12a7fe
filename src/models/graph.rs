//! 绘图配置与绘图数据模型

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::error::{AppError, AppResult};

/// 图表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphType {
    #[default]
    Scatter,
    Line,
    Histogram,
}

pub const TABLEAU_10: [&str; 10] = [
    "#4E79A7", "#F28E2B", "#E15759", "#76B7B2", "#59A14F",
    "#EDC948", "#B07AA1", "#FF9DA7", "#9C755F", "#BAB0AC",
];

pub const COLORBLIND_SAFE: [&str; 10] = [
    "#0173B2", "#DE8F05", "#029E73", "#CC78BC", "#CA9161",
    "#949494", "#ECE133", "#56B4E9", "#FBAFE4", "#FFFF00",
];

pub const TABLEAU_10_DARK: [&str; 10] = [
    "#5DA5DA", "#FAA43A", "#F17CB0", "#B2912F", "#B276B2",
    "#DECF3F", "#F15854", "#60BD68", "#FAA43A", "#B2912F",
];

pub const COLORBLIND_SAFE_DARK: [&str; 10] = [
    "#56B4E9", "#F0E442", "#009E73", "#E69F00", "#CC79A7",
    "#D55E00", "#0072B2", "#999999", "#FFD700", "#00CED1",
];

/// 配色方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    #[default]
    LightNormal,
    LightHigh,
    DarkNormal,
    DarkHigh,
}

impl ColorScheme {
    pub fn palette(&self) -> &'static [&'static str; 10] {
        match self {
            ColorScheme::LightNormal => &TABLEAU_10,
            ColorScheme::LightHigh => &COLORBLIND_SAFE,
            ColorScheme::DarkNormal => &TABLEAU_10_DARK,
            ColorScheme::DarkHigh => &COLORBLIND_SAFE_DARK,
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, ColorScheme::DarkNormal | ColorScheme::DarkHigh)
    }

    pub fn background(&self) -> &'static str {
        if self.is_dark() { "#1e1e1e" } else { "#ffffff" }
    }

    pub fn foreground(&self) -> &'static str {
        if self.is_dark() { "#dddddd" } else { "#333333" }
    }

    /// 第 i 个分组的颜色，超过 10 个时循环
    pub fn color(&self, index: usize) -> &'static str {
        let palette = self.palette();
        palette[index % palette.len()]
    }

    pub fn upper_limit_color(&self) -> &'static str {
        if self.is_dark() { "#ff4444" } else { "#cc0000" }
    }

    pub fn lower_limit_color(&self) -> &'static str {
        if self.is_dark() { "#ff8800" } else { "#ff6600" }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "light_normal" => Some(ColorScheme::LightNormal),
            "light_high" => Some(ColorScheme::LightHigh),
            "dark_normal" => Some(ColorScheme::DarkNormal),
            "dark_high" => Some(ColorScheme::DarkHigh),
            _ => None,
        }
    }
}

/// 比较模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    #[default]
    None,
    SameMeasurement,
    DifferentMeasurements,
}

/// 分组字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    PiaSerial,
    PiaPart,
    PmtSerial,
    PmtBatch,
    PmtGeneration,
    TestFixture,
    TestDate,
}

impl GroupField {
    /// 对应 MeasurementRecord 的字段路径
    pub fn field_path(&self) -> &'static str {
        match self {
            GroupField::PiaSerial => "board.serial_number",
            GroupField::PiaPart => "board.part_number",
            GroupField::PmtSerial => "pmt.pmt_serial_number",
            GroupField::PmtBatch => "pmt.batch_number",
            GroupField::PmtGeneration => "pmt.generation",
            GroupField::TestFixture => "test_log.test_fixture",
            GroupField::TestDate => "test_log.created_at",
        }
    }
}

/// 配对设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairingDevice {
    #[default]
    Pia,
    Pmt,
}

/// 同一设备多条测量时的取值策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairingStrategy {
    First,
    #[default]
    Last,
    /// 最接近标称值
    Best,
}

/// 图例位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// 绘图页的比较来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareBy {
    Manufacturer,
    TestFixture,
    FirstVsLast,
    PiaBatch,
    PmtBatch,
}

/// 绘图配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub graph_type: GraphType,
    pub color_scheme: ColorScheme,

    pub show_spec_lines: bool,
    pub show_legend: bool,
    pub legend_position: LegendPosition,
    pub legend_bg_opacity: i32,
    pub legend_border_width: f64,
    pub enable_grouping_boxes: bool,
    pub group_by_field: Option<GroupField>,

    pub comparison_mode: ComparisonMode,
    pub x_axis_measurement: Option<String>,
    pub y_axis_measurement: Option<String>,

    /// 标准模式下的 x 字段路径；同测量比较时作为分桶字段
    pub x_axis_field: String,
    pub y_axis_field: Option<String>,
    /// 散点图使用整数 x 坐标
    pub x_axis_use_indices: bool,
    pub axis_margin_percent: f64,

    pub show_comparison_line: bool,
    pub pairing_device: PairingDevice,
    pub pairing_strategy: PairingStrategy,

    pub auto_overlay_plots: bool,
    pub remove_outliers: bool,

    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,

    pub enable_point_deletion: bool,
    pub enable_size_scaling: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            graph_type: GraphType::Scatter,
            color_scheme: ColorScheme::LightNormal,
            show_spec_lines: true,
            show_legend: true,
            legend_position: LegendPosition::TopRight,
            legend_bg_opacity: 235,
            legend_border_width: 2.0,
            enable_grouping_boxes: false,
            group_by_field: None,
            comparison_mode: ComparisonMode::None,
            x_axis_measurement: None,
            y_axis_measurement: None,
            x_axis_field: "created_at".to_string(),
            y_axis_field: None,
            x_axis_use_indices: true,
            axis_margin_percent: 10.0,
            show_comparison_line: true,
            pairing_device: PairingDevice::Pia,
            pairing_strategy: PairingStrategy::Last,
            auto_overlay_plots: true,
            remove_outliers: false,
            title: None,
            x_label: None,
            y_label: None,
            enable_point_deletion: true,
            enable_size_scaling: true,
        }
    }
}

impl GraphConfig {
    /// 校验配置；同测量比较模式下会把 y 测量项补成 x
    pub fn validate(&mut self) -> AppResult<()> {
        match self.comparison_mode {
            ComparisonMode::None => {}
            ComparisonMode::SameMeasurement => {
                let x = self.x_axis_measurement.clone().ok_or_else(|| {
                    AppError::validation_error("比较模式需要指定 x_axis_measurement")
                })?;
                if let Some(y) = &self.y_axis_measurement {
                    if *y != x {
                        return Err(AppError::validation_error(
                            "同测量比较模式要求 y_axis_measurement 与 x_axis_measurement 相同",
                        ));
                    }
                }
                self.y_axis_measurement = Some(x);
            }
            ComparisonMode::DifferentMeasurements => {
                if self.x_axis_measurement.is_none() {
                    return Err(AppError::validation_error("比较模式需要指定 x_axis_measurement"));
                }
                if self.y_axis_measurement.is_none() {
                    return Err(AppError::validation_error(
                        "不同测量比较模式需要同时指定 x_axis_measurement 和 y_axis_measurement",
                    ));
                }
            }
        }

        if self.enable_grouping_boxes && self.group_by_field.is_none() {
            return Err(AppError::validation_error("启用了分组框但没有指定分组字段"));
        }

        if !(0..=255).contains(&self.legend_bg_opacity) {
            return Err(AppError::validation_error(format!(
                "图例背景透明度必须在 0-255 之间, 实际为 {}",
                self.legend_bg_opacity
            )));
        }

        if self.axis_margin_percent < 0.0 {
            return Err(AppError::validation_error("坐标轴留白百分比不能为负"));
        }

        Ok(())
    }
}

/// 一个分组准备好的绘图数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    pub name: String,
    pub x_data: Vec<f64>,
    pub y_data: Vec<f64>,
    /// 散点整数坐标模式下的真实 x 值
    pub x_labels: Vec<f64>,
    pub is_outlier: Vec<bool>,
    /// 每个点对应的测量项 id；配对模式下为 (x, y) 中 y 的 id
    pub spec_ids: Vec<i32>,
    /// 配对模式下每个点的 (x 测量项 id, y 测量项 id)
    pub pairs: Vec<(i32, i32)>,
    /// 需要叠加显示的曲线测量项 id
    pub plot_spec_ids: Vec<i32>,
}

impl GroupData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x_data: Vec::new(),
            y_data: Vec::new(),
            x_labels: Vec::new(),
            is_outlier: Vec::new(),
            spec_ids: Vec::new(),
            pairs: Vec::new(),
            plot_spec_ids: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.x_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_data.is_empty()
    }

    pub fn has_plots(&self) -> bool {
        !self.plot_spec_ids.is_empty()
    }
}

/// 直方图数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramData {
    pub centers: Vec<f64>,
    pub counts: Vec<u64>,
    pub bin_edges: Vec<f64>,
    pub width: f64,
    /// 显示宽度为分箱宽度的 90%
    pub display_width: f64,
    pub total_count: usize,
}

/// 坐标范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// 准备好的全部绘图数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedData {
    /// 按插入顺序排列的分组
    pub groups: Vec<GroupData>,
    pub x_label: String,
    pub y_label: String,
    pub has_plots: bool,
    pub total_points: usize,
    /// 所有测量项的上限/下限（去重）
    pub upper_limits: Vec<f64>,
    pub lower_limits: Vec<f64>,
}

impl PreparedData {
    pub fn group(&self, name: &str) -> Option<&GroupData> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// 绘图页比较结果中的一对数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub device_id: String,
    pub our_value: f64,
    pub other_value: f64,
    pub difference: f64,
    /// 本地测量项 id
    pub spec_id: Option<i32>,
    /// 来源说明（厂商名、夹具名、批次号等）
    pub source: Option<String>,
}

impl ComparisonPair {
    pub fn new(device_id: impl Into<String>, our_value: f64, other_value: f64) -> Self {
        Self {
            device_id: device_id.into(),
            our_value,
            other_value,
            difference: our_value - other_value,
            spec_id: None,
            source: None,
        }
    }
}

/// 关系图中按（板卡序列号, 测试日志）配对的两个测量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationalPair {
    pub pia_serial: String,
    pub test_log_id: i32,
    pub x_value: f64,
    pub y_value: f64,
    pub x_spec_id: i32,
    pub y_spec_id: i32,
    pub group: Option<String>,
}

/// 分组名到颜色的映射
pub fn group_colors(groups: &[GroupData], scheme: ColorScheme) -> HashMap<String, &'static str> {
    groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.name.clone(), scheme.color(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_measurement_mode_copies_x_into_y() {
        let mut cfg = GraphConfig {
            comparison_mode: ComparisonMode::SameMeasurement,
            x_axis_measurement: Some("Gain".into()),
            ..Default::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.y_axis_measurement.as_deref(), Some("Gain"));

        cfg.y_axis_measurement = Some("Offset".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn comparison_requires_x_and_different_requires_y() {
        let mut cfg = GraphConfig {
            comparison_mode: ComparisonMode::DifferentMeasurements,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        cfg.x_axis_measurement = Some("A".into());
        assert!(cfg.validate().is_err());
        cfg.y_axis_measurement = Some("B".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn grouping_boxes_and_opacity_are_checked() {
        let mut cfg = GraphConfig { enable_grouping_boxes: true, ..Default::default() };
        assert!(cfg.validate().is_err());
        cfg.group_by_field = Some(GroupField::PmtBatch);
        assert!(cfg.validate().is_ok());
        cfg.legend_bg_opacity = 300;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn schemes_map_to_palettes() {
        assert_eq!(ColorScheme::LightNormal.color(0), "#4E79A7");
        assert_eq!(ColorScheme::LightHigh.color(11), "#DE8F05");
        assert_eq!(ColorScheme::DarkHigh.background(), "#1e1e1e");
        assert_eq!(ColorScheme::parse("dark_normal"), Some(ColorScheme::DarkNormal));
        let legend: LegendPosition = serde_json::from_str("\"bottom-left\"").unwrap();
        assert_eq!(legend, LegendPosition::BottomLeft);
    }
}
