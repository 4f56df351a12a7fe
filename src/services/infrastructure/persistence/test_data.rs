//! 测试数据生成器
//!
//! 开发和测试时向数据库写入板卡、PMT、测试日志、子测试与测量项。
//! `populate_test_data` 工具和各层测试共用这里的写入逻辑。

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::models::entities::{pia_board, pmt_device, spec, sub_test, test_log};
use crate::models::enums::MeasurementType;
use crate::models::report::evaluate_limits;
use crate::models::structs::PlotSeries;
use crate::utils::error::AppResult;
use crate::utils::time_utils;

/// 待写入的测量项
#[derive(Debug, Clone)]
pub struct NewSpec {
    pub sub_test: String,
    pub name: String,
    pub unit: Option<String>,
    pub measurement: Option<f64>,
    pub lower_limit: Option<f64>,
    pub nominal: Option<f64>,
    pub upper_limit: Option<f64>,
    /// 为 None 时由上下限计算
    pub result: Option<bool>,
    pub plot: Option<Vec<PlotSeries>>,
}

impl NewSpec {
    pub fn range(sub_test: &str, name: &str, measurement: f64, lower: f64, nominal: f64, upper: f64) -> Self {
        Self {
            sub_test: sub_test.to_string(),
            name: name.to_string(),
            unit: None,
            measurement: Some(measurement),
            lower_limit: Some(lower),
            nominal: Some(nominal),
            upper_limit: Some(upper),
            result: None,
            plot: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_plot(mut self, series: Vec<PlotSeries>) -> Self {
        self.plot = Some(series);
        self
    }
}

/// 待写入的测试日志
#[derive(Debug, Clone)]
pub struct NewTestLog {
    pub board_serial: String,
    pub board_part: Option<String>,
    pub pmt_serial: Option<String>,
    pub pmt_batch: Option<String>,
    pub pmt_generation: Option<String>,
    pub name: Option<String>,
    pub test_fixture: Option<String>,
    pub created_at: NaiveDateTime,
    pub full_test_completed: bool,
    pub html_content: Option<String>,
    pub html_path: Option<String>,
    pub specs: Vec<NewSpec>,
}

impl NewTestLog {
    pub fn new(board_serial: &str, created_at: NaiveDateTime) -> Self {
        Self {
            board_serial: board_serial.to_string(),
            board_part: None,
            pmt_serial: None,
            pmt_batch: None,
            pmt_generation: None,
            name: Some("Full Test".to_string()),
            test_fixture: None,
            created_at,
            full_test_completed: true,
            html_content: None,
            html_path: None,
            specs: Vec::new(),
        }
    }

    pub fn part(mut self, part: &str) -> Self {
        self.board_part = Some(part.to_string());
        self
    }

    pub fn pmt(mut self, serial: &str, batch: &str) -> Self {
        self.pmt_serial = Some(serial.to_string());
        self.pmt_batch = Some(batch.to_string());
        self
    }

    pub fn fixture(mut self, fixture: &str) -> Self {
        self.test_fixture = Some(fixture.to_string());
        self
    }

    pub fn html(mut self, content: &str) -> Self {
        self.html_content = Some(content.to_string());
        self
    }

    pub fn spec(mut self, spec: NewSpec) -> Self {
        self.specs.push(spec);
        self
    }
}

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 按序列号查找板卡，不存在时创建
    pub async fn get_or_create_board<C: ConnectionTrait>(
        db: &C,
        serial: &str,
        part: Option<&str>,
    ) -> AppResult<pia_board::Model> {
        if let Some(board) = pia_board::Entity::find()
            .filter(pia_board::Column::SerialNumber.eq(serial))
            .one(db)
            .await?
        {
            return Ok(board);
        }
        let mut board = pia_board::ActiveModel::new();
        board.serial_number = Set(serial.to_string());
        board.part_number = Set(part.map(str::to_string));
        board.generation_project = Set(Some("GEN3".to_string()));
        board.version = Set(Some("A".to_string()));
        Ok(board.insert(db).await?)
    }

    pub async fn get_or_create_pmt<C: ConnectionTrait>(
        db: &C,
        serial: &str,
        batch: Option<&str>,
        generation: Option<&str>,
    ) -> AppResult<pmt_device::Model> {
        if let Some(pmt) = pmt_device::Entity::find()
            .filter(pmt_device::Column::PmtSerialNumber.eq(serial))
            .one(db)
            .await?
        {
            return Ok(pmt);
        }
        let mut pmt = pmt_device::ActiveModel::new();
        pmt.pmt_serial_number = Set(Some(serial.to_string()));
        pmt.batch_number = Set(batch.map(str::to_string));
        pmt.generation = Set(generation.map(str::to_string));
        Ok(pmt.insert(db).await?)
    }

    /// 写入一条测试日志及其子测试、测量项，整体通过状态由测量项结果汇总
    pub async fn insert_test_log<C: ConnectionTrait>(db: &C, log: &NewTestLog) -> AppResult<test_log::Model> {
        let board = Self::get_or_create_board(db, &log.board_serial, log.board_part.as_deref()).await?;
        let pmt = match &log.pmt_serial {
            Some(serial) => Some(
                Self::get_or_create_pmt(db, serial, log.pmt_batch.as_deref(), log.pmt_generation.as_deref()).await?,
            ),
            None => None,
        };

        let results: Vec<Option<bool>> = log
            .specs
            .iter()
            .map(|s| s.result.or_else(|| evaluate_limits(s.measurement, s.lower_limit, s.upper_limit)))
            .collect();
        let passed = log.full_test_completed && test_log::rollup_passed(results.iter().copied());

        let mut model = test_log::ActiveModel::new();
        model.pia_board_id = Set(board.id);
        model.pmt_id = Set(pmt.as_ref().map(|p| p.id));
        model.name = Set(log.name.clone());
        model.test_fixture = Set(log.test_fixture.clone());
        model.created_at = Set(log.created_at);
        model.full_test_completed = Set(log.full_test_completed);
        model.full_test_passed = Set(passed);
        model.html_path = Set(log.html_path.clone());
        model.html_content = Set(log.html_content.clone());
        model.html_hash = Set(log
            .html_content
            .as_deref()
            .map(|c| super::queries::sha256_digest(c.as_bytes())));
        let test_log = model.insert(db).await?;

        // 子测试按首次出现的顺序创建
        let mut sub_tests: Vec<(String, i32)> = Vec::new();
        for (new_spec, result) in log.specs.iter().zip(results) {
            let sub_test_id = match sub_tests.iter().find(|(name, _)| *name == new_spec.sub_test) {
                Some((_, id)) => *id,
                None => {
                    let mut st = sub_test::ActiveModel::new();
                    st.test_log_id = Set(test_log.id);
                    st.name = Set(Some(new_spec.sub_test.clone()));
                    st.created_at = Set(log.created_at);
                    let st = st.insert(db).await?;
                    sub_tests.push((new_spec.sub_test.clone(), st.id));
                    st.id
                }
            };

            let mut sp = spec::ActiveModel::new();
            sp.sub_test_id = Set(sub_test_id);
            sp.name = Set(Some(new_spec.name.clone()));
            sp.unit = Set(new_spec.unit.clone());
            sp.created_at = Set(log.created_at);
            sp.measurement = Set(new_spec.measurement);
            sp.lower_limit = Set(new_spec.lower_limit);
            sp.nominal = Set(new_spec.nominal);
            sp.upper_limit = Set(new_spec.upper_limit);
            sp.result = Set(result);
            match &new_spec.plot {
                Some(series) => {
                    sp.measurement_type = Set(MeasurementType::Plot);
                    sp.has_plot = Set(Some(true));
                    sp.plot_data = Set(spec::serialize_plot_data(series));
                }
                None => {
                    sp.measurement_type = Set(MeasurementType::Range);
                    sp.has_plot = Set(Some(false));
                }
            }
            sp.insert(db).await?;
        }

        Ok(test_log)
    }

    /// 生成随机开发数据，返回写入的测试日志数量
    pub async fn populate_random<C, R>(
        db: &C,
        rng: &mut R,
        board_count: usize,
        logs_per_board: usize,
    ) -> AppResult<usize>
    where
        C: ConnectionTrait,
        R: Rng + Send,
    {
        const FIXTURES: [&str; 3] = ["Plexus", "Fixture-A", "Fixture-B"];
        const PARTS: [&str; 3] = ["PIA-100", "PIA-200", "PIA-300"];
        const BATCHES: [&str; 4] = ["B2401", "B2402", "B2403", "B2404"];

        let now = time_utils::now_naive_utc();
        let mut written = 0;

        for b in 0..board_count {
            let serial = format!("PIA{:05}", b + 1);
            let part = PARTS[b % PARTS.len()];
            let pmt_serial = format!("PMT{:05}", b + 1);
            let batch = BATCHES[b % BATCHES.len()];

            for t in 0..logs_per_board {
                let created_at = now - Duration::days(rng.gen_range(0..180)) - Duration::minutes(t as i64 * 37);
                let fixture = FIXTURES[rng.gen_range(0..FIXTURES.len())];

                let gain = 10.0 + rng.gen_range(-0.8..0.8);
                let offset = rng.gen_range(-0.12..0.12);
                let dark_current = 2.0 + rng.gen_range(-0.9..1.2);
                let voltage = 1000.0 + rng.gen_range(-40.0..40.0);

                let curve: Vec<f64> = (0..50).map(|i| i as f64).collect();
                let response: Vec<f64> = curve
                    .iter()
                    .map(|x| (x / 8.0).sin() * gain + rng.gen_range(-0.2..0.2))
                    .collect();

                let log = NewTestLog::new(&serial, created_at)
                    .part(part)
                    .pmt(&pmt_serial, batch)
                    .fixture(fixture)
                    .spec(NewSpec::range("Amplifier", "Gain", gain, 9.5, 10.0, 10.5).with_unit("dB"))
                    .spec(NewSpec::range("Amplifier", "Offset", offset, -0.1, 0.0, 0.1).with_unit("V"))
                    .spec(NewSpec::range("PMT", "Dark Current", dark_current, 1.0, 2.0, 3.0).with_unit("nA"))
                    .spec(NewSpec::range("PMT", "HV Setpoint", voltage, 950.0, 1000.0, 1050.0).with_unit("V"))
                    .spec(
                        NewSpec {
                            measurement: None,
                            lower_limit: None,
                            nominal: None,
                            upper_limit: None,
                            ..NewSpec::range("PMT", "Response Curve", 0.0, 0.0, 0.0, 0.0)
                        }
                        .with_plot(vec![PlotSeries {
                            x: curve,
                            y: response,
                            label: Some("Response".to_string()),
                        }]),
                    );

                let mut log = log;
                log.pmt_generation = Some("G2".to_string());
                log.html_content = Some(format!(
                    "<html><body><h1>{}</h1><p>Fixture {}</p><p>Gain {:.3}</p><!-- {} --></body></html>",
                    serial, fixture, gain, t
                ));
                Self::insert_test_log(db, &log).await?;
                written += 1;
            }
        }

        log::info!("[DATA] 写入 {} 条测试日志", written);
        Ok(written)
    }
}
