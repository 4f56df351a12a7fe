//! 测量绘图数据生成器
//!
//! 把 `MeasurementRecord` 整理成按分组排列的绘图数据（散点、折线、直方图），
//! 负责比较模式下的数据配对、离群点标记、坐标轴标签、点删除与撤销，
//! 以及按配色方案导出 PNG。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::{debug, info, warn};
use statrs::statistics::Statistics;

use crate::models::graph::{
    AxisRange, ColorScheme, ComparisonMode, GraphConfig, GraphType, GroupData, GroupField, HistogramData,
    PairingDevice, PairingStrategy, PreparedData,
};
use crate::models::structs::{FieldValue, MeasurementRecord};
use crate::services::infrastructure::plot_renderer::{
    data_range, pad_range, parse_hex_color, ChartLayer, ChartMark, ChartScene, HorizontalLine, PlotRenderer,
};
use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_GROUP: &str = "All Data";
pub const UNKNOWN_GROUP: &str = "Unknown";
pub const DEFAULT_EXPORT_WIDTH: u32 = 1920;
pub const DEFAULT_EXPORT_HEIGHT: u32 = 1080;
/// 关闭尺寸缩放时的线宽
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;
const OUTLIER_Z_THRESHOLD: f64 = 3.0;

/// 按点数选择散点大小
pub fn point_size(count: usize) -> f64 {
    match count {
        0 => 8.0,
        1..=20 => 15.0,
        21..=50 => 12.0,
        51..=100 => 10.0,
        101..=200 => 8.0,
        201..=500 => 7.0,
        501..=1000 => 6.0,
        _ => 5.0,
    }
}

/// 按点数选择线宽
pub fn line_width(count: usize) -> f64 {
    match count {
        0 => 2.0,
        1..=20 => 3.5,
        21..=50 => 3.0,
        51..=100 => 2.5,
        101..=200 => 2.0,
        201..=500 => 1.8,
        _ => 1.5,
    }
}

/// 按柱数选择柱宽比例
pub fn bar_width(count: usize) -> f64 {
    match count {
        0 => 0.8,
        1..=10 => 0.95,
        11..=20 => 0.9,
        21..=50 => 0.85,
        51..=100 => 0.8,
        101..=200 => 0.75,
        _ => 0.7,
    }
}

/// Z 分数离群点检测
///
/// 少于 3 个有效值或标准差为 0 时不标记任何点；NaN 永远不是离群点
pub fn detect_outliers(values: &[f64]) -> Vec<bool> {
    let mut flags = vec![false; values.len()];
    let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.len() < 3 || valid.len() < 3 {
        return flags;
    }

    let mean = valid.iter().mean();
    let std = valid.iter().population_std_dev();
    if std == 0.0 {
        return flags;
    }

    for (flag, v) in flags.iter_mut().zip(values) {
        if v.is_finite() {
            *flag = ((v - mean) / std).abs() > OUTLIER_Z_THRESHOLD;
        }
    }
    flags
}

/// 下划线转空格并把每个单词首字母大写
fn title_case(field: &str) -> String {
    field
        .replace('_', " ")
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// 测量记录在某个分组字段上的取值，时间只取日期部分
pub fn group_value(record: &MeasurementRecord, field: GroupField) -> Option<String> {
    match record.field_value(field.field_path())? {
        FieldValue::Time(t) => Some(t.format("%Y-%m-%d").to_string()),
        v => Some(v.to_string()),
    }
}

pub struct GraphGenerator {
    config: GraphConfig,
    measurements: Vec<MeasurementRecord>,
    by_spec_id: HashMap<i32, usize>,
    prepared: Option<PreparedData>,
    /// prepare 时的快照，用于撤销删除
    original: Option<PreparedData>,
    deleted_spec_ids: Vec<i32>,
}

impl GraphGenerator {
    pub fn new(config: GraphConfig) -> AppResult<Self> {
        let mut config = config;
        config.validate()?;
        Ok(Self {
            config,
            measurements: Vec::new(),
            by_spec_id: HashMap::new(),
            prepared: None,
            original: None,
            deleted_spec_ids: Vec::new(),
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn prepared(&self) -> Option<&PreparedData> {
        self.prepared.as_ref()
    }

    pub fn deleted_spec_ids(&self) -> &[i32] {
        &self.deleted_spec_ids
    }

    pub fn measurement(&self, spec_id: i32) -> Option<&MeasurementRecord> {
        self.by_spec_id.get(&spec_id).map(|&i| &self.measurements[i])
    }

    /// 整理绘图数据并保存快照
    pub fn prepare_data(&mut self, measurements: Vec<MeasurementRecord>) -> AppResult<&PreparedData> {
        if measurements.is_empty() {
            return Err(AppError::validation_error("No measurements provided"));
        }

        self.by_spec_id = measurements.iter().enumerate().map(|(i, m)| (m.spec_id(), i)).collect();
        self.measurements = measurements;
        self.deleted_spec_ids.clear();

        let groups = match self.config.comparison_mode {
            ComparisonMode::SameMeasurement => vec![self.pair_same_measurement()],
            ComparisonMode::DifferentMeasurements => vec![self.pair_different_measurements()],
            ComparisonMode::None => self.standard_groups(),
        };

        let (upper_limits, lower_limits) = self.spec_limits();
        let prepared = PreparedData {
            has_plots: groups.iter().any(GroupData::has_plots),
            total_points: groups.iter().map(GroupData::len).sum(),
            x_label: self.x_label(),
            y_label: self.y_label(),
            groups,
            upper_limits,
            lower_limits,
        };
        info!(
            "[GRAPH] 绘图数据就绪: {} 个分组, {} 个点",
            prepared.groups.len(),
            prepared.total_points
        );

        self.original = Some(prepared.clone());
        self.prepared = Some(prepared);
        self.prepared
            .as_ref()
            .ok_or_else(|| AppError::analysis_error("绘图数据未生成"))
    }

    /// 标准模式分组，按首次出现的顺序排列
    fn standard_groups(&self) -> Vec<GroupData> {
        let mut order: Vec<String> = Vec::new();
        let mut members: HashMap<String, Vec<&MeasurementRecord>> = HashMap::new();

        for m in &self.measurements {
            let key = match self.config.group_by_field {
                Some(field) => group_value(m, field).unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
                None => DEFAULT_GROUP.to_string(),
            };
            if !members.contains_key(&key) {
                order.push(key.clone());
            }
            members.entry(key).or_default().push(m);
        }

        let mut next_index = 0usize;
        let mut groups = Vec::with_capacity(order.len());
        for name in order {
            let records = members.remove(&name).unwrap_or_default();
            let group = self.extract_group(name, &records, next_index);
            if !group.is_empty() {
                // 分组之间留一个空位
                next_index += group.len() + 1;
            }
            groups.push(group);
        }
        groups
    }

    fn extract_group(&self, name: String, records: &[&MeasurementRecord], start_index: usize) -> GroupData {
        let use_indices = self.config.graph_type == GraphType::Scatter && self.config.x_axis_use_indices;
        let mut group = GroupData::new(name);

        for m in records {
            if m.is_plot() {
                if self.config.auto_overlay_plots {
                    group.plot_spec_ids.push(m.spec_id());
                }
                continue;
            }

            let actual_x = m
                .field_value(&self.config.x_axis_field)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let x = if use_indices {
                (start_index + group.x_data.len()) as f64
            } else {
                actual_x
            };

            group.x_data.push(x);
            group.x_labels.push(actual_x);
            group.y_data.push(m.measurement().unwrap_or(f64::NAN));
            group.spec_ids.push(m.spec_id());
        }

        group.is_outlier = if self.config.remove_outliers {
            detect_outliers(&group.y_data)
        } else {
            vec![false; group.y_data.len()]
        };
        group
    }

    fn device_key<'a>(&self, m: &'a MeasurementRecord) -> Option<&'a str> {
        match self.config.pairing_device {
            PairingDevice::Pia => Some(m.board_serial()),
            PairingDevice::Pmt => m.pmt_serial(),
        }
    }

    fn choose<'a>(&self, candidates: &[&'a MeasurementRecord]) -> Option<&'a MeasurementRecord> {
        match self.config.pairing_strategy {
            PairingStrategy::First => candidates.first().copied(),
            PairingStrategy::Last => candidates.last().copied(),
            PairingStrategy::Best => {
                let scored = candidates
                    .iter()
                    .filter_map(|m| Some((*m, (m.measurement()? - m.spec.nominal?).abs())))
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                scored.map(|(m, _)| m).or_else(|| candidates.last().copied())
            }
        }
    }

    /// 同一测量在同一设备上、两个不同桶（一般为夹具）之间的配对
    fn pair_same_measurement(&self) -> GroupData {
        let target = self.config.x_axis_measurement.as_deref();
        let mut device_order: Vec<&str> = Vec::new();
        let mut buckets: HashMap<&str, BTreeMap<String, Vec<&MeasurementRecord>>> = HashMap::new();

        for m in &self.measurements {
            if m.name() != target || m.measurement().is_none() {
                continue;
            }
            let Some(device) = self.device_key(m) else {
                continue;
            };
            let bucket = m
                .field_value(&self.config.x_axis_field)
                .map(|v| v.to_string())
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
            if !buckets.contains_key(device) {
                device_order.push(device);
            }
            buckets.entry(device).or_default().entry(bucket).or_default().push(m);
        }

        let mut group = GroupData::new(DEFAULT_GROUP);
        for device in device_order {
            let Some(by_bucket) = buckets.get(device) else {
                continue;
            };
            if by_bucket.len() < 2 {
                continue;
            }
            let mut sides = by_bucket.values();
            let (Some(x_side), Some(y_side)) = (sides.next(), sides.next()) else {
                continue;
            };
            let (Some(xm), Some(ym)) = (self.choose(x_side), self.choose(y_side)) else {
                continue;
            };
            let (Some(x), Some(y)) = (xm.measurement(), ym.measurement()) else {
                continue;
            };
            Self::push_pair(&mut group, x, y, xm.spec_id(), ym.spec_id());
        }

        self.flag_pair_outliers(&mut group);
        debug!("[GRAPH] 同测量配对: {} 对", group.len());
        group
    }

    /// 两个不同测量按测试日志配对
    fn pair_different_measurements(&self) -> GroupData {
        let x_name = self.config.x_axis_measurement.as_deref();
        let y_name = self.config.y_axis_measurement.as_deref();

        let mut x_order: Vec<i32> = Vec::new();
        let mut xs: HashMap<i32, &MeasurementRecord> = HashMap::new();
        let mut ys: HashMap<i32, &MeasurementRecord> = HashMap::new();
        for m in &self.measurements {
            if m.measurement().is_none() {
                continue;
            }
            let log_id = m.test_log_id();
            if m.name() == x_name {
                if xs.insert(log_id, m).is_none() {
                    x_order.push(log_id);
                }
            } else if m.name() == y_name {
                ys.insert(log_id, m);
            }
        }

        let mut group = GroupData::new(DEFAULT_GROUP);
        for log_id in x_order {
            let (Some(xm), Some(ym)) = (xs.get(&log_id), ys.get(&log_id)) else {
                continue;
            };
            if let (Some(x), Some(y)) = (xm.measurement(), ym.measurement()) {
                Self::push_pair(&mut group, x, y, xm.spec_id(), ym.spec_id());
            }
        }

        self.flag_pair_outliers(&mut group);
        debug!("[GRAPH] 不同测量配对: {} 对", group.len());
        group
    }

    fn push_pair(group: &mut GroupData, x: f64, y: f64, x_id: i32, y_id: i32) {
        group.x_data.push(x);
        group.x_labels.push(x);
        group.y_data.push(y);
        group.spec_ids.push(y_id);
        group.pairs.push((x_id, y_id));
    }

    fn flag_pair_outliers(&self, group: &mut GroupData) {
        group.is_outlier = if self.config.remove_outliers {
            detect_outliers(&group.x_data)
                .into_iter()
                .zip(detect_outliers(&group.y_data))
                .map(|(a, b)| a || b)
                .collect()
        } else {
            vec![false; group.len()]
        };
    }

    /// 所有测量项出现过的上下限（去重，保持出现顺序）
    fn spec_limits(&self) -> (Vec<f64>, Vec<f64>) {
        fn push_unique(values: &mut Vec<f64>, v: Option<f64>) {
            if let Some(v) = v.filter(|v| v.is_finite()) {
                if !values.iter().any(|existing| existing.to_bits() == v.to_bits()) {
                    values.push(v);
                }
            }
        }

        let mut upper = Vec::new();
        let mut lower = Vec::new();
        for m in &self.measurements {
            push_unique(&mut upper, m.spec.upper_limit);
            push_unique(&mut lower, m.spec.lower_limit);
        }
        (upper, lower)
    }

    pub fn x_label(&self) -> String {
        if let Some(label) = &self.config.x_label {
            return label.clone();
        }
        match self.config.comparison_mode {
            ComparisonMode::SameMeasurement => format!(
                "{} ({})",
                self.config.x_axis_measurement.as_deref().unwrap_or_default(),
                self.config.x_axis_field
            ),
            ComparisonMode::DifferentMeasurements => {
                self.config.x_axis_measurement.clone().unwrap_or_else(|| "X".to_string())
            }
            ComparisonMode::None => {
                let field = self.config.x_axis_field.rsplit('.').next().unwrap_or_default();
                if field == "created_at" {
                    "Time".to_string()
                } else {
                    title_case(field)
                }
            }
        }
    }

    pub fn y_label(&self) -> String {
        if let Some(label) = &self.config.y_label {
            return label.clone();
        }
        if self.config.comparison_mode != ComparisonMode::None {
            let name = self
                .config
                .y_axis_measurement
                .as_deref()
                .or(self.config.x_axis_measurement.as_deref())
                .unwrap_or_default();
            let field = self.config.y_axis_field.as_deref().unwrap_or(self.config.x_axis_field.as_str());
            return format!("{} ({})", name, field);
        }

        self.measurements
            .iter()
            .find_map(|m| {
                let unit = m.spec.unit.as_deref().filter(|u| !u.is_empty())?;
                Some(format!("{} ({})", m.name().unwrap_or_default(), unit))
            })
            .unwrap_or_else(|| "Measurement Value".to_string())
    }

    /// 所有分组的 y 值直方图；开启离群点剔除时跳过离群点
    pub fn histogram(&self) -> Option<HistogramData> {
        let prepared = self.prepared.as_ref()?;
        let values: Vec<f64> = prepared
            .groups
            .iter()
            .flat_map(|g| g.y_data.iter().zip(&g.is_outlier))
            .filter(|(v, outlier)| v.is_finite() && !(self.config.remove_outliers && **outlier))
            .map(|(v, _)| *v)
            .collect();
        compute_histogram(&values)
    }

    /// 比较模式的 y = x 参考线两端
    pub fn comparison_line(&self) -> Option<(f64, f64)> {
        if self.config.comparison_mode == ComparisonMode::None {
            return None;
        }
        let prepared = self.prepared.as_ref()?;
        let all = prepared.groups.iter().flat_map(|g| g.x_data.iter().chain(g.y_data.iter()));
        data_range(all).map(|r| (r.min, r.max))
    }

    /// 带留白的坐标范围，直方图没有
    pub fn axis_ranges(&self) -> Option<(AxisRange, AxisRange)> {
        if self.config.graph_type == GraphType::Histogram {
            return None;
        }
        let prepared = self.prepared.as_ref()?;
        let x = data_range(prepared.groups.iter().flat_map(|g| g.x_data.iter()))?;
        let y = data_range(prepared.groups.iter().flat_map(|g| g.y_data.iter()))?;
        let margin = self.config.axis_margin_percent;
        Some((pad_range(x, margin), pad_range(y, margin)))
    }

    /// 折线数据：按 x 排序并去掉离群点
    pub fn line_series(group: &GroupData) -> (Vec<f64>, Vec<f64>) {
        let mut points: Vec<(f64, f64)> = group
            .x_data
            .iter()
            .zip(&group.y_data)
            .zip(&group.is_outlier)
            .filter(|(_, outlier)| !**outlier)
            .map(|((x, y), _)| (*x, *y))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points.into_iter().unzip()
    }

    /// 删除分组中的一个点，之后的点下标依次前移
    pub fn delete_point(&mut self, group_name: &str, index: usize) -> AppResult<i32> {
        if !self.config.enable_point_deletion {
            return Err(AppError::validation_error("当前图表未启用点删除"));
        }
        let prepared = self
            .prepared
            .as_mut()
            .ok_or_else(|| AppError::validation_error("尚未生成绘图数据"))?;
        let group = prepared
            .groups
            .iter_mut()
            .find(|g| g.name == group_name)
            .ok_or_else(|| AppError::not_found_error("Group", format!("分组 '{}' 不存在", group_name)))?;
        if index >= group.len() {
            return Err(AppError::validation_error(format!(
                "点下标 {} 超出范围（分组 '{}' 共 {} 个点）",
                index,
                group_name,
                group.len()
            )));
        }

        group.x_data.remove(index);
        group.y_data.remove(index);
        group.x_labels.remove(index);
        group.is_outlier.remove(index);
        let spec_id = group.spec_ids.remove(index);
        if index < group.pairs.len() {
            group.pairs.remove(index);
        }
        prepared.total_points = prepared.groups.iter().map(GroupData::len).sum();

        self.deleted_spec_ids.push(spec_id);
        info!("[GRAPH] 删除点: 分组 '{}' 下标 {} (测量项 {})", group_name, index, spec_id);
        Ok(spec_id)
    }

    /// 恢复 prepare 时的数据
    pub fn reset_deletions(&mut self) {
        if let Some(original) = &self.original {
            self.prepared = Some(original.clone());
        }
        self.deleted_spec_ids.clear();
    }

    /// 组装可渲染的场景
    pub fn build_scene(&self) -> AppResult<ChartScene> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| AppError::validation_error("尚未生成绘图数据"))?;
        let scheme: ColorScheme = self.config.color_scheme;
        let background = parse_hex_color(scheme.background())?;
        let foreground = parse_hex_color(scheme.foreground())?;
        let scaled = self.config.enable_size_scaling;
        let total = prepared.total_points;

        let mut layers = Vec::new();
        match self.config.graph_type {
            GraphType::Histogram => {
                if let Some(hist) = self.histogram() {
                    let counts = hist.counts.iter().map(|c| *c as f64).collect();
                    layers.push(ChartLayer::new(
                        parse_hex_color(scheme.color(0))?,
                        hist.centers,
                        counts,
                        ChartMark::Bars { width: hist.display_width },
                    ));
                }
            }
            GraphType::Scatter | GraphType::Line => {
                for (i, group) in prepared.groups.iter().enumerate() {
                    let color = parse_hex_color(scheme.color(i))?;
                    if self.config.graph_type == GraphType::Scatter {
                        let radius = if scaled { point_size(total) / 2.0 } else { point_size(0) / 2.0 };
                        let mut layer = ChartLayer::new(
                            color,
                            group.x_data.clone(),
                            group.y_data.clone(),
                            ChartMark::Points { radius },
                        );
                        layer.highlight = group.is_outlier.clone();
                        layers.push(layer);
                    } else {
                        let width = if scaled { line_width(total) } else { DEFAULT_LINE_WIDTH };
                        let (xs, ys) = Self::line_series(group);
                        layers.push(ChartLayer::new(color, xs, ys, ChartMark::Line { width }));
                    }

                    for spec_id in &group.plot_spec_ids {
                        let Some(series) = self.measurement(*spec_id).and_then(|m| m.spec.plot_series()) else {
                            warn!("[GRAPH] 测量项 {} 的曲线数据无法解析，跳过", spec_id);
                            continue;
                        };
                        for s in series {
                            let n = s.x.len().min(s.y.len());
                            layers.push(ChartLayer::new(
                                color,
                                s.x[..n].to_vec(),
                                s.y[..n].to_vec(),
                                ChartMark::Line { width: DEFAULT_LINE_WIDTH },
                            ));
                        }
                    }
                }

                if self.config.show_comparison_line {
                    if let Some((lo, hi)) = self.comparison_line() {
                        layers.push(ChartLayer::new(
                            foreground,
                            vec![lo, hi],
                            vec![lo, hi],
                            ChartMark::Line { width: 1.0 },
                        ));
                    }
                }
            }
        }

        // 上下限是 y 值，直方图的横轴是测量值，不画水平限值线
        let mut hlines = Vec::new();
        if self.config.show_spec_lines && self.config.graph_type != GraphType::Histogram {
            let upper = parse_hex_color(scheme.upper_limit_color())?;
            let lower = parse_hex_color(scheme.lower_limit_color())?;
            hlines.extend(prepared.upper_limits.iter().map(|y| HorizontalLine { y: *y, color: upper }));
            hlines.extend(prepared.lower_limits.iter().map(|y| HorizontalLine { y: *y, color: lower }));
        }

        let mut scene = ChartScene::fit(background, foreground, layers, hlines, self.config.axis_margin_percent);
        if self.config.graph_type == GraphType::Histogram {
            scene.y_range.min = scene.y_range.min.min(0.0);
        }
        Ok(scene)
    }

    pub fn render_png(&self, width: u32, height: u32) -> AppResult<Vec<u8>> {
        let scene = self.build_scene()?;
        PlotRenderer::render_png(&scene, width, height)
    }

    /// 导出 PNG 文件，尺寸缺省为 1920×1080
    pub fn export_png(&self, path: &Path, width: Option<u32>, height: Option<u32>) -> AppResult<()> {
        let width = width.unwrap_or(DEFAULT_EXPORT_WIDTH);
        let height = height.unwrap_or(DEFAULT_EXPORT_HEIGHT);
        let bytes = self.render_png(width, height).map_err(|e| {
            crate::log_export_failure!("图表渲染 {}: {}", path.display(), e);
            e
        })?;
        std::fs::write(path, bytes)?;
        info!("[GRAPH] 图表已导出: {} ({}x{})", path.display(), width, height);
        Ok(())
    }
}

/// 等宽分箱直方图，最后一个箱包含右端点
pub fn compute_histogram(values: &[f64]) -> Option<HistogramData> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let bins = (n / 5).clamp(10, 50);

    let range = data_range(values.iter())?;
    let (lo, hi) = if range.min == range.max {
        (range.min - 0.5, range.max + 0.5)
    } else {
        (range.min, range.max)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0u64; bins];
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bin_edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let centers = bin_edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    Some(HistogramData {
        centers,
        counts,
        bin_edges,
        width,
        display_width: width * 0.9,
        total_count: n,
    })
}
