//! 绘图页服务
//!
//! 持有绘图页的过滤条件与当前图表，负责：
//! - 下拉框选项（y 轴测量项、与之配对的 x 轴测量项、序列号/料号/批次过滤项）
//! - 通过后台查询加载测量数据，并按首次/末次测试筛选
//! - 关系图配对与几种比较配对（厂商、夹具、首末次、批次）
//! - 生成、删点、撤销、导出图表

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::graph_generator::{group_value, GraphGenerator};
use crate::models::enums::TestSelection;
use crate::models::graph::{
    ColorScheme, CompareBy, ComparisonMode, ComparisonPair, GraphConfig, GroupField, PreparedData, RelationalPair,
};
use crate::models::structs::{ManufacturerDataPoint, MeasurementRecord, SpecQueryFilter};
use crate::services::infrastructure::persistence::Queries;
use crate::services::infrastructure::QueryRunner;
use crate::utils::config::GraphPageConfig;
use crate::utils::error::{AppError, AppResult};

/// 下拉框中表示“不过滤”的选项
pub const ALL_CHOICE: &str = "All";

/// 绘图页的模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphPageMode {
    #[default]
    Standard,
    Comparison,
    Relational,
    PlotOverlay,
}

/// 下拉框选择值转过滤条件，空或 "All" 表示不过滤
pub fn choice(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL_CHOICE)
        .map(str::to_string)
}

/// 绘图页过滤条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphFilters {
    pub full_test_only: bool,
    pub test_selection: TestSelection,
    pub from_date: Option<NaiveDate>,
    pub pia_serial: Option<String>,
    pub pia_part: Option<String>,
    pub pmt_serial: Option<String>,
    pub pmt_batch: Option<String>,
}

impl GraphFilters {
    /// 把界面传来的 "All" 归一为 None
    pub fn normalized(mut self) -> Self {
        self.pia_serial = choice(self.pia_serial.as_deref());
        self.pia_part = choice(self.pia_part.as_deref());
        self.pmt_serial = choice(self.pmt_serial.as_deref());
        self.pmt_batch = choice(self.pmt_batch.as_deref());
        self
    }

    pub fn to_query(&self, spec_name: &str) -> SpecQueryFilter {
        SpecQueryFilter {
            spec_names: vec![spec_name.to_string()],
            pia_serial: self.pia_serial.clone(),
            pia_part: self.pia_part.clone(),
            pmt_serial: self.pmt_serial.clone(),
            pmt_batch: self.pmt_batch.clone(),
            date_from: self.from_date,
            full_tests_only: self.full_test_only,
            ..Default::default()
        }
    }
}

/// 过滤下拉框的候选值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChoices {
    pub pia_serials: Vec<String>,
    pub pia_parts: Vec<String>,
    pub pmt_serials: Vec<String>,
    pub pmt_batches: Vec<String>,
}

/// 生成图表的请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphRequest {
    pub y_measurement: String,
    /// 不同测量比较模式下的 x 测量项
    pub x_measurement: Option<String>,
    pub filters: GraphFilters,
    pub config: GraphConfig,
}

/// 每个设备只保留首次或末次测试
///
/// 设备按板卡序列号区分，时间相同的记录保持原有顺序
pub fn apply_test_selection(records: Vec<MeasurementRecord>, selection: TestSelection) -> Vec<MeasurementRecord> {
    if selection == TestSelection::All {
        return records;
    }

    let before = records.len();
    let mut order: Vec<String> = Vec::new();
    let mut by_device: HashMap<String, Vec<MeasurementRecord>> = HashMap::new();
    for record in records {
        let device = record.board_serial().to_string();
        if !by_device.contains_key(&device) {
            order.push(device.clone());
        }
        by_device.entry(device).or_default().push(record);
    }

    let mut selected = Vec::with_capacity(order.len());
    for device in order {
        let Some(mut tests) = by_device.remove(&device) else {
            continue;
        };
        tests.sort_by_key(|r| r.spec.created_at);
        let pick = match selection {
            TestSelection::First => tests.into_iter().next(),
            _ => tests.pop(),
        };
        selected.extend(pick);
    }
    debug!("[GRAPH] 测试筛选 {:?}: {} -> {}", selection, before, selected.len());
    selected
}

/// 两个测量项按（板卡序列号, 测试日志）配对
///
/// 同一键有多条 x 时取最后一条，结果按 y 的顺序排列
pub fn pair_relational(
    y_records: &[MeasurementRecord],
    x_records: &[MeasurementRecord],
    group_by: Option<GroupField>,
) -> Vec<RelationalPair> {
    let x_by_key: HashMap<(&str, i32), &MeasurementRecord> = x_records
        .iter()
        .map(|m| ((m.board_serial(), m.test_log_id()), m))
        .collect();

    let mut pairs = Vec::new();
    for y in y_records {
        let Some(x) = x_by_key.get(&(y.board_serial(), y.test_log_id())) else {
            continue;
        };
        let (Some(x_value), Some(y_value)) = (x.measurement(), y.measurement()) else {
            continue;
        };
        pairs.push(RelationalPair {
            pia_serial: y.board_serial().to_string(),
            test_log_id: y.test_log_id(),
            x_value,
            y_value,
            x_spec_id: x.spec_id(),
            y_spec_id: y.spec_id(),
            group: group_by.map(|field| group_value(y, field).unwrap_or_else(|| "Unknown".to_string())),
        });
    }
    info!(
        "[GRAPH] 关系配对: {} 对 (y {} 条, x {} 条)",
        pairs.len(),
        y_records.len(),
        x_records.len()
    );
    pairs
}

/// 本地测量与厂商数据按设备序列号配对
pub fn pair_with_manufacturer(records: &[MeasurementRecord], reference: &[ManufacturerDataPoint]) -> Vec<ComparisonPair> {
    let by_serial: HashMap<&str, &ManufacturerDataPoint> =
        reference.iter().map(|p| (p.device_serial.as_str(), p)).collect();

    records
        .iter()
        .filter_map(|m| {
            let reference = by_serial.get(m.board_serial())?;
            let mut pair = ComparisonPair::new(m.board_serial(), m.measurement()?, reference.measurement);
            pair.spec_id = Some(m.spec_id());
            pair.source = Some(reference.manufacturer.clone());
            Some(pair)
        })
        .collect()
}

/// 同一设备在前两个夹具上的测量对比
pub fn pair_by_test_fixture(records: &[MeasurementRecord]) -> Vec<ComparisonPair> {
    let mut device_order: Vec<&str> = Vec::new();
    let mut fixtures: HashMap<&str, Vec<(&str, &MeasurementRecord)>> = HashMap::new();

    for m in records {
        let (Some(fixture), Some(_)) = (m.fixture(), m.measurement()) else {
            continue;
        };
        let device = m.board_serial();
        let seen = fixtures.entry(device).or_insert_with(|| {
            device_order.push(device);
            Vec::new()
        });
        // 每个夹具只取第一条
        if !seen.iter().any(|(f, _)| *f == fixture) {
            seen.push((fixture, m));
        }
    }

    let mut pairs = Vec::new();
    for device in device_order {
        let Some([(fixture_a, a), (fixture_b, b), ..]) = fixtures.get(device).map(Vec::as_slice) else {
            continue;
        };
        let (Some(our), Some(other)) = (a.measurement(), b.measurement()) else {
            continue;
        };
        let mut pair = ComparisonPair::new(device, our, other);
        pair.spec_id = Some(a.spec_id());
        pair.source = Some(format!("{} vs {}", fixture_a, fixture_b));
        pairs.push(pair);
    }
    pairs
}

/// 每个设备末次测试对比首次测试
pub fn pair_first_last(records: &[MeasurementRecord]) -> Vec<ComparisonPair> {
    let mut device_order: Vec<&str> = Vec::new();
    let mut by_device: HashMap<&str, Vec<&MeasurementRecord>> = HashMap::new();
    for m in records.iter().filter(|m| m.measurement().is_some()) {
        let device = m.board_serial();
        by_device
            .entry(device)
            .or_insert_with(|| {
                device_order.push(device);
                Vec::new()
            })
            .push(m);
    }

    let mut pairs = Vec::new();
    for device in device_order {
        let Some(tests) = by_device.get_mut(device) else {
            continue;
        };
        if tests.len() < 2 {
            continue;
        }
        tests.sort_by_key(|m| m.spec.created_at);
        let (Some(first), Some(last)) = (tests.first(), tests.last()) else {
            continue;
        };
        let (Some(first_value), Some(last_value)) = (first.measurement(), last.measurement()) else {
            continue;
        };
        let mut pair = ComparisonPair::new(device, last_value, first_value);
        pair.spec_id = Some(last.spec_id());
        pair.source = Some("First Test".to_string());
        pairs.push(pair);
    }
    pairs
}

/// 批次对比：取数据最多的两个批次，A 批每个设备对比 B 批均值
///
/// PIA 以料号作为批次，PMT 以批次号
pub fn pair_by_batch(records: &[MeasurementRecord], compare_by: CompareBy) -> Vec<ComparisonPair> {
    let batch_of = |m: &MeasurementRecord| -> Option<String> {
        match compare_by {
            CompareBy::PiaBatch => m.board.part_number.clone(),
            _ => m.pmt_batch().map(str::to_string),
        }
    };

    let mut batch_order: Vec<String> = Vec::new();
    let mut batches: HashMap<String, Vec<(&MeasurementRecord, f64)>> = HashMap::new();
    for m in records {
        let (Some(batch), Some(value)) = (batch_of(m), m.measurement()) else {
            continue;
        };
        if !batches.contains_key(&batch) {
            batch_order.push(batch.clone());
        }
        batches.entry(batch).or_default().push((m, value));
    }

    if batch_order.len() < 2 {
        warn!("[GRAPH] 批次对比至少需要两个批次，当前 {} 个", batch_order.len());
        return Vec::new();
    }

    // 稳定排序，数量相同时保持出现顺序
    let count = |b: &String| batches.get(b).map_or(0, Vec::len);
    batch_order.sort_by(|a, b| count(b).cmp(&count(a)));
    let (batch_a, batch_b) = (&batch_order[0], &batch_order[1]);

    let mean = |b: &String| {
        let values = batches.get(b).map(Vec::as_slice).unwrap_or_default();
        values.iter().map(|(_, v)| v).sum::<f64>() / values.len().max(1) as f64
    };
    let mean_b = mean(batch_b);

    let members = batches.get(batch_a).map(Vec::as_slice).unwrap_or_default();
    let pairs: Vec<ComparisonPair> = members
        .iter()
        .map(|(m, value)| {
            let mut pair = ComparisonPair::new(m.board_serial(), *value, mean_b);
            pair.spec_id = Some(m.spec_id());
            pair.source = Some(format!("{} vs {}", batch_a, batch_b));
            pair
        })
        .collect();
    info!("[GRAPH] 批次对比 {} vs {}: {} 对", batch_a, batch_b, pairs.len());
    pairs
}

/// 绘图页服务
pub struct GraphPageService {
    queries: Queries,
    runner: Arc<QueryRunner>,
    settings: GraphPageConfig,
    mode: GraphPageMode,
    generator: Option<GraphGenerator>,
}

impl GraphPageService {
    pub fn new(queries: Queries, settings: GraphPageConfig, batch_size: u64) -> Self {
        let runner = Arc::new(QueryRunner::new(Arc::new(queries.clone()), batch_size));
        Self {
            queries,
            runner,
            settings,
            mode: GraphPageMode::Standard,
            generator: None,
        }
    }

    pub fn mode(&self) -> GraphPageMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GraphPageMode) {
        if self.mode != mode {
            info!("[GRAPH] 切换模式: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.generator = None;
        }
    }

    /// 按设置填充配置的默认值
    pub fn default_config(&self) -> GraphConfig {
        GraphConfig {
            color_scheme: ColorScheme::parse(&self.settings.default_color_scheme).unwrap_or_default(),
            axis_margin_percent: self.settings.axis_margin_percent,
            ..Default::default()
        }
    }

    /// y 轴候选：曲线叠加模式只列曲线型测量项
    pub async fn y_axis_choices(&self) -> AppResult<Vec<String>> {
        let mut names = match self.mode {
            GraphPageMode::PlotOverlay => self.queries.plot_spec_names().await?,
            _ => self.queries.spec_names().await?,
        };
        names.sort();
        Ok(names)
    }

    /// x 轴候选：与 y 测量项出现在同一测试日志中的其它测量项
    pub async fn x_axis_choices(&self, y_measurement: Option<&str>) -> AppResult<Vec<String>> {
        let mut names = match y_measurement.filter(|y| !y.is_empty()) {
            Some(y) => self
                .queries
                .paired_spec_names(y)
                .await?
                .into_iter()
                .filter(|name| name != y)
                .collect(),
            None => self.queries.spec_names().await?,
        };
        names.sort();
        Ok(names)
    }

    pub async fn filter_choices(&self) -> AppResult<FilterChoices> {
        Ok(FilterChoices {
            pia_serials: self.queries.board_serial_numbers().await?,
            pia_parts: self.queries.board_part_numbers().await?,
            pmt_serials: self.queries.pmt_serial_numbers().await?,
            pmt_batches: self.queries.pmt_batch_numbers().await?,
        })
    }

    /// 后台查询一个测量项并按首次/末次测试筛选
    pub async fn load_measurements(&self, spec_name: &str, filters: &GraphFilters) -> AppResult<Vec<MeasurementRecord>> {
        let query = filters.to_query(spec_name);
        let records = self
            .runner
            .run(query, |done, total| {
                if done == total {
                    debug!("[GRAPH] '{}' 读取完成 {}/{}", spec_name, done, total);
                }
            })
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    info!("[GRAPH] '{}' 查询已取消", spec_name);
                } else {
                    crate::log_query_failure!("绘图数据 '{}': {}", spec_name, e);
                }
                e
            })?;
        Ok(apply_test_selection(records, filters.test_selection))
    }

    pub fn cancel_query(&self) {
        self.runner.cancel();
    }

    /// 查询调度者的共享句柄，服务被锁住时也能取消查询
    pub fn query_runner(&self) -> Arc<QueryRunner> {
        self.runner.clone()
    }

    /// 生成图表数据，结果保留在服务中供删点与导出
    pub async fn generate_graph(&mut self, request: GraphRequest) -> AppResult<PreparedData> {
        let y_name = request.y_measurement.trim().to_string();
        if y_name.is_empty() {
            return Err(AppError::validation_error("Please select a Y-axis measurement"));
        }
        let filters = request.filters.normalized();
        let mut config = request.config;

        let records = match config.comparison_mode {
            ComparisonMode::DifferentMeasurements => {
                let x_name = request
                    .x_measurement
                    .filter(|x| !x.trim().is_empty())
                    .ok_or_else(|| AppError::validation_error("Please select an X-axis measurement"))?;
                let mut records = self.load_measurements(&y_name, &filters).await?;
                records.extend(self.load_measurements(&x_name, &filters).await?);
                config.x_axis_measurement = Some(x_name);
                config.y_axis_measurement = Some(y_name.clone());
                records
            }
            ComparisonMode::SameMeasurement => {
                config.x_axis_measurement = Some(y_name.clone());
                config.y_axis_measurement = None;
                self.load_measurements(&y_name, &filters).await?
            }
            ComparisonMode::None => self.load_measurements(&y_name, &filters).await?,
        };

        if records.is_empty() {
            return Err(AppError::not_found_error("Measurement", "No measurements found."));
        }

        let mut generator = GraphGenerator::new(config)?;
        let prepared = generator.prepare_data(records)?.clone();
        self.generator = Some(generator);
        crate::log_user_operation!("生成图表: {} ({} 个点)", y_name, prepared.total_points);
        Ok(prepared)
    }

    /// 关系图：两个测量项按测试日志配对
    pub async fn relational_pairs(
        &self,
        y_measurement: &str,
        x_measurement: &str,
        filters: GraphFilters,
        group_by: Option<GroupField>,
    ) -> AppResult<Vec<RelationalPair>> {
        if x_measurement.trim().is_empty() {
            return Err(AppError::validation_error("Please select an X-axis measurement"));
        }
        let filters = filters.normalized();
        let y_records = self.load_measurements(y_measurement, &filters).await?;
        if y_records.is_empty() {
            return Err(AppError::not_found_error("Measurement", "No Y-axis measurements found."));
        }
        let x_records = self.load_measurements(x_measurement, &filters).await?;
        if x_records.is_empty() {
            return Err(AppError::not_found_error("Measurement", "No X-axis measurements found."));
        }
        Ok(pair_relational(&y_records, &x_records, group_by))
    }

    /// 比较图的配对数据
    pub async fn comparison_pairs(
        &self,
        spec_name: &str,
        filters: GraphFilters,
        compare_by: CompareBy,
    ) -> AppResult<Vec<ComparisonPair>> {
        let filters = filters.normalized();
        let records = self.load_measurements(spec_name, &filters).await?;

        let pairs = match compare_by {
            CompareBy::Manufacturer => {
                let reference = self.queries.manufacturer_data_for_spec(spec_name).await?;
                info!("[GRAPH] '{}' 的厂商数据 {} 条", spec_name, reference.len());
                pair_with_manufacturer(&records, &reference)
            }
            CompareBy::TestFixture => pair_by_test_fixture(&records),
            CompareBy::FirstVsLast => pair_first_last(&records),
            CompareBy::PiaBatch | CompareBy::PmtBatch => pair_by_batch(&records, compare_by),
        };

        if pairs.is_empty() {
            warn!("[GRAPH] {:?} 比较没有可配对的数据", compare_by);
            return Err(AppError::not_found_error(
                "ComparisonPair",
                format!("Could not find paired data for {:?} comparison.", compare_by),
            ));
        }
        Ok(pairs)
    }

    pub fn prepared(&self) -> Option<&PreparedData> {
        self.generator.as_ref().and_then(GraphGenerator::prepared)
    }

    fn generator_mut(&mut self) -> AppResult<&mut GraphGenerator> {
        self.generator
            .as_mut()
            .ok_or_else(|| AppError::validation_error("尚未生成图表"))
    }

    pub fn delete_point(&mut self, group: &str, index: usize) -> AppResult<PreparedData> {
        let generator = self.generator_mut()?;
        generator.delete_point(group, index)?;
        generator
            .prepared()
            .cloned()
            .ok_or_else(|| AppError::analysis_error("绘图数据丢失"))
    }

    pub fn reset_deletions(&mut self) -> AppResult<PreparedData> {
        let generator = self.generator_mut()?;
        generator.reset_deletions();
        generator
            .prepared()
            .cloned()
            .ok_or_else(|| AppError::analysis_error("绘图数据丢失"))
    }

    /// 导出当前图表，尺寸缺省取设置
    pub fn export_graph(&self, path: &Path, width: Option<u32>, height: Option<u32>) -> AppResult<()> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| AppError::validation_error("尚未生成图表"))?;
        generator.export_png(
            path,
            Some(width.unwrap_or(self.settings.export_width)),
            Some(height.unwrap_or(self.settings.export_height)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entities::{manufacturer, manufacturer_spec};
    use crate::services::infrastructure::persistence::{DatabaseManager, NewSpec, NewTestLog, TestDataGenerator};
    use chrono::{Duration, NaiveDateTime};
    use sea_orm::{ActiveModelTrait, Set};

    fn at(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(10, 0, 0).unwrap() + Duration::days(day)
    }

    async fn seeded() -> DatabaseManager {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();
        let logs = vec![
            NewTestLog::new("PIA-1", at(0))
                .part("PART-A")
                .pmt("PMT-1", "B1")
                .fixture("FX-1")
                .spec(NewSpec::range("Power", "Vout", 5.0, 4.0, 5.0, 6.0).with_unit("V"))
                .spec(NewSpec::range("Power", "Vin", 12.0, 11.0, 12.0, 13.0)),
            NewTestLog::new("PIA-1", at(3))
                .part("PART-A")
                .pmt("PMT-1", "B1")
                .fixture("FX-2")
                .spec(NewSpec::range("Power", "Vout", 5.4, 4.0, 5.0, 6.0).with_unit("V"))
                .spec(NewSpec::range("Power", "Vin", 12.2, 11.0, 12.0, 13.0)),
            NewTestLog::new("PIA-2", at(1))
                .part("PART-A")
                .pmt("PMT-2", "B2")
                .fixture("FX-1")
                .spec(NewSpec::range("Power", "Vout", 4.8, 4.0, 5.0, 6.0).with_unit("V")),
            NewTestLog::new("PIA-3", at(2))
                .part("PART-B")
                .pmt("PMT-3", "B2")
                .fixture("FX-1")
                .spec(NewSpec::range("Power", "Vout", 4.0, 4.0, 5.0, 6.0).with_unit("V")),
        ];
        for log in &logs {
            TestDataGenerator::insert_test_log(db.as_ref(), log).await.unwrap();
        }
        manager
    }

    fn service(manager: &DatabaseManager) -> GraphPageService {
        GraphPageService::new(manager.queries(), GraphPageConfig::default(), 2)
    }

    #[test]
    fn all_choice_means_no_filter() {
        assert_eq!(choice(Some("All")), None);
        assert_eq!(choice(Some("  ")), None);
        assert_eq!(choice(Some("PIA-1")), Some("PIA-1".to_string()));
        let filters = GraphFilters {
            pia_serial: Some("All".into()),
            pmt_batch: Some("B1".into()),
            ..Default::default()
        }
        .normalized();
        let query = filters.to_query("Vout");
        assert_eq!(query.pia_serial, None);
        assert_eq!(query.pmt_batch.as_deref(), Some("B1"));
        assert_eq!(query.spec_names, vec!["Vout".to_string()]);
    }

    #[tokio::test]
    async fn test_selection_keeps_first_or_last_per_board() {
        let manager = seeded().await;
        let svc = service(&manager);

        let all = svc.load_measurements("Vout", &GraphFilters::default()).await.unwrap();
        assert_eq!(all.len(), 4);

        let last = GraphFilters { test_selection: TestSelection::Last, ..Default::default() };
        let last = svc.load_measurements("Vout", &last).await.unwrap();
        assert_eq!(last.len(), 3);
        let pia1 = last.iter().find(|m| m.board_serial() == "PIA-1").unwrap();
        assert_eq!(pia1.measurement(), Some(5.4));

        let first = GraphFilters { test_selection: TestSelection::First, ..Default::default() };
        let first = svc.load_measurements("Vout", &first).await.unwrap();
        let pia1 = first.iter().find(|m| m.board_serial() == "PIA-1").unwrap();
        assert_eq!(pia1.measurement(), Some(5.0));
    }

    #[tokio::test]
    async fn choice_lists() {
        let manager = seeded().await;
        let mut svc = service(&manager);
        assert_eq!(svc.y_axis_choices().await.unwrap(), vec!["Vin", "Vout"]);
        assert_eq!(svc.x_axis_choices(Some("Vout")).await.unwrap(), vec!["Vin"]);

        svc.set_mode(GraphPageMode::PlotOverlay);
        assert!(svc.y_axis_choices().await.unwrap().is_empty());

        let choices = svc.filter_choices().await.unwrap();
        assert_eq!(choices.pia_serials.len(), 3);
        assert!(choices.pmt_batches.contains(&"B2".to_string()));
    }

    #[tokio::test]
    async fn relational_pairs_match_on_test_log() {
        let manager = seeded().await;
        let svc = service(&manager);
        let pairs = svc
            .relational_pairs("Vout", "Vin", GraphFilters::default(), Some(GroupField::TestFixture))
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.pia_serial == "PIA-1"));
        assert_eq!(pairs[0].x_value, 12.0);
        assert_eq!(pairs[0].y_value, 5.0);
        assert_eq!(pairs[0].group.as_deref(), Some("FX-1"));

        assert!(svc.relational_pairs("Vout", "", GraphFilters::default(), None).await.is_err());
    }

    #[tokio::test]
    async fn comparison_by_fixture_first_last_and_batch() {
        let manager = seeded().await;
        let svc = service(&manager);

        let fixture = svc
            .comparison_pairs("Vout", GraphFilters::default(), CompareBy::TestFixture)
            .await
            .unwrap();
        assert_eq!(fixture.len(), 1);
        assert_eq!(fixture[0].device_id, "PIA-1");
        assert_eq!((fixture[0].our_value, fixture[0].other_value), (5.0, 5.4));

        let first_last = svc
            .comparison_pairs("Vout", GraphFilters::default(), CompareBy::FirstVsLast)
            .await
            .unwrap();
        assert_eq!(first_last.len(), 1);
        assert_eq!(first_last[0].our_value, 5.4);
        assert!((first_last[0].difference - 0.4).abs() < 1e-9);

        // B1: PIA-1 两次, B2: PIA-2、PIA-3 各一次；数量相同时先出现的 B1 为 A 批
        let batch = svc
            .comparison_pairs("Vout", GraphFilters::default(), CompareBy::PmtBatch)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|p| (p.other_value - 4.4).abs() < 1e-9));
        assert_eq!(batch[0].source.as_deref(), Some("B1 vs B2"));

        let pia_batch = svc
            .comparison_pairs("Vout", GraphFilters::default(), CompareBy::PiaBatch)
            .await
            .unwrap();
        // PART-A 三条，对比 PART-B 的均值 4.0
        assert_eq!(pia_batch.len(), 3);
        assert!(pia_batch.iter().all(|p| p.other_value == 4.0));
    }

    #[tokio::test]
    async fn comparison_against_manufacturer_data() {
        let manager = seeded().await;
        let db = manager.connection();
        let mut mfr = <manufacturer::ActiveModel as ActiveModelTrait>::default();
        mfr.name = Set("Acme".into());
        mfr.created_at = Set(at(0));
        mfr.updated_at = Set(at(0));
        let mfr = mfr.insert(db.as_ref()).await.unwrap();
        let mut ms = <manufacturer_spec::ActiveModel as ActiveModelTrait>::default();
        ms.manufacturer_id = Set(mfr.id);
        ms.spec_name = Set("Vout".into());
        ms.device_serial = Set(Some("PIA-2".into()));
        ms.measurement = Set(Some(5.0));
        ms.created_at = Set(at(0));
        ms.insert(db.as_ref()).await.unwrap();

        let svc = service(&manager);
        let pairs = svc
            .comparison_pairs("Vout", GraphFilters::default(), CompareBy::Manufacturer)
            .await
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].device_id, "PIA-2");
        assert_eq!(pairs[0].source.as_deref(), Some("Acme"));
        assert!((pairs[0].difference + 0.2).abs() < 1e-9);

        let none = svc
            .comparison_pairs("Vin", GraphFilters::default(), CompareBy::Manufacturer)
            .await;
        assert!(none.is_err());
    }

    #[tokio::test]
    async fn generate_delete_reset_and_export() {
        let manager = seeded().await;
        let mut svc = service(&manager);

        assert!(svc.delete_point("All Data", 0).is_err());
        let request = GraphRequest {
            y_measurement: "Vout".into(),
            filters: GraphFilters { pia_serial: Some("All".into()), ..Default::default() },
            config: svc.default_config(),
            ..Default::default()
        };
        let prepared = svc.generate_graph(request).await.unwrap();
        assert_eq!(prepared.total_points, 4);
        assert_eq!(prepared.y_label, "Vout (V)");

        let after = svc.delete_point("All Data", 1).unwrap();
        assert_eq!(after.total_points, 3);
        let restored = svc.reset_deletions().unwrap();
        assert_eq!(restored.total_points, 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vout.png");
        svc.export_graph(&path, Some(400), Some(300)).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn different_measurement_graph_needs_x() {
        let manager = seeded().await;
        let mut svc = service(&manager);
        let mut request = GraphRequest {
            y_measurement: "Vout".into(),
            config: GraphConfig {
                comparison_mode: ComparisonMode::DifferentMeasurements,
                x_axis_measurement: Some("placeholder".into()),
                y_axis_measurement: Some("placeholder".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(svc.generate_graph(request.clone()).await.is_err());

        request.x_measurement = Some("Vin".into());
        let prepared = svc.generate_graph(request).await.unwrap();
        assert_eq!(prepared.total_points, 2);
        assert_eq!(prepared.x_label, "Vin");

        let empty = GraphRequest { y_measurement: " ".into(), ..Default::default() };
        assert!(svc.generate_graph(empty).await.is_err());
    }
}
