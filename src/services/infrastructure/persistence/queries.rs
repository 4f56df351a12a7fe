//! 查询层：各页面使用的过滤、关联查询
//!
//! 所有查询结果都在返回前完整加载（测量项连同子测试、测试日志、板卡、PMT），
//! 调用方拿到的是普通值对象，不会再触发数据库访问。
//! 列表查询不加载 HTML 报告内容，报告正文通过 `get_html_content` 单独读取。

use chrono::NaiveDateTime;
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, Iterable, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::models::entities::{
    manufacturer, manufacturer_device_batch, manufacturer_spec, pia_board, pmt_device, spec, sub_test, test_log,
};
use crate::models::enums::{OrderKey, ResultFilter};
use crate::models::structs::*;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// SQLite 单条语句的参数数量有上限，批量按 id 加载时分块
const ID_CHUNK: usize = 500;

/// 测试日志列表行（不含 HTML 正文）
#[derive(Debug, FromQueryResult)]
struct TestLogListRow {
    id: i32,
    name: Option<String>,
    test_fixture: Option<String>,
    created_at: NaiveDateTime,
    full_test_completed: bool,
    full_test_passed: bool,
    pia_board_id: i32,
    pia_serial: Option<String>,
    pia_part: Option<String>,
    pmt_id: Option<i32>,
    pmt_serial: Option<String>,
    pmt_batch: Option<String>,
    has_html: bool,
}

impl From<TestLogListRow> for TestLogSummary {
    fn from(row: TestLogListRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            test_fixture: row.test_fixture,
            created_at: row.created_at,
            full_test_completed: row.full_test_completed,
            full_test_passed: row.full_test_passed,
            pia_board_id: row.pia_board_id,
            pia_serial: row.pia_serial.unwrap_or_default(),
            pia_part: row.pia_part,
            pmt_id: row.pmt_id,
            pmt_serial: row.pmt_serial,
            pmt_batch: row.pmt_batch,
            has_html: row.has_html,
        }
    }
}

/// 计算文件的 SHA-256 摘要（32 字节）
pub async fn compute_file_sha256(path: &Path) -> AppResult<Vec<u8>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        AppError::io_error(format!("读取文件失败: {}: {}", path.display(), e), e.kind().to_string())
    })?;
    Ok(sha256_digest(&bytes))
}

pub fn sha256_digest(bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().to_vec()
}

fn lower_like(col: impl sea_orm::sea_query::IntoColumnRef, pattern: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(pattern)
}

fn dedup_ids(ids: impl IntoIterator<Item = i32>) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// 查询门面，持有共享连接
#[derive(Clone)]
pub struct Queries {
    db: Arc<DatabaseConnection>,
}

impl Queries {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ------------------------------------------------------------------
    // 测试日志列表
    // ------------------------------------------------------------------

    /// 测试日志列表的基础查询：关联板卡与 PMT，只取列表需要的列
    fn test_log_list_select() -> Select<test_log::Entity> {
        test_log::Entity::find()
            .select_only()
            .columns([
                test_log::Column::Id,
                test_log::Column::Name,
                test_log::Column::TestFixture,
                test_log::Column::CreatedAt,
                test_log::Column::FullTestCompleted,
                test_log::Column::FullTestPassed,
                test_log::Column::PiaBoardId,
                test_log::Column::PmtId,
            ])
            .join(JoinType::LeftJoin, test_log::Relation::PiaBoard.def())
            .join(JoinType::LeftJoin, test_log::Relation::PmtDevice.def())
            .column_as(pia_board::Column::SerialNumber, "pia_serial")
            .column_as(pia_board::Column::PartNumber, "pia_part")
            .column_as(pmt_device::Column::PmtSerialNumber, "pmt_serial")
            .column_as(pmt_device::Column::BatchNumber, "pmt_batch")
            .expr_as(
                Expr::col((test_log::Entity, test_log::Column::HtmlContent))
                    .is_not_null()
                    .or(Expr::col((test_log::Entity, test_log::Column::HtmlPath)).is_not_null()),
                "has_html",
            )
    }

    async fn load_test_log_list(&self, select: Select<test_log::Entity>) -> AppResult<Vec<TestLogSummary>> {
        let rows = select.into_model::<TestLogListRow>().all(self.conn()).await?;
        Ok(rows.into_iter().map(TestLogSummary::from).collect())
    }

    /// 板卡序列号、料号或 PMT 序列号包含关键字（不区分大小写），最新的在前
    pub async fn find_matching_string(&self, search_term: &str) -> AppResult<Vec<TestLogSummary>> {
        let term = format!("%{}%", search_term.to_lowercase());
        let select = Self::test_log_list_select()
            .filter(
                Condition::any()
                    .add(lower_like((pia_board::Entity, pia_board::Column::SerialNumber), &term))
                    .add(lower_like((pia_board::Entity, pia_board::Column::PartNumber), &term))
                    .add(lower_like((pmt_device::Entity, pmt_device::Column::PmtSerialNumber), &term)),
            )
            .order_by_desc(test_log::Column::CreatedAt);
        self.load_test_log_list(select).await
    }

    /// 搜索页使用：在上面的字段之外再匹配 PMT 批次和测试名称
    pub async fn search_test_logs(&self, search_term: &str) -> AppResult<Vec<TestLogSummary>> {
        let term = format!("%{}%", search_term.to_lowercase());
        let select = Self::test_log_list_select()
            .filter(
                Condition::any()
                    .add(lower_like((pia_board::Entity, pia_board::Column::SerialNumber), &term))
                    .add(lower_like((pia_board::Entity, pia_board::Column::PartNumber), &term))
                    .add(lower_like((pmt_device::Entity, pmt_device::Column::PmtSerialNumber), &term))
                    .add(lower_like((pmt_device::Entity, pmt_device::Column::BatchNumber), &term))
                    .add(lower_like((test_log::Entity, test_log::Column::Name), &term)),
            )
            .order_by_desc(test_log::Column::CreatedAt);
        self.load_test_log_list(select).await
    }

    /// 最近的测试日志
    pub async fn get_recent(&self, limit: u64) -> AppResult<Vec<TestLogSummary>> {
        let select = Self::test_log_list_select()
            .order_by_desc(test_log::Column::CreatedAt)
            .limit(limit);
        self.load_test_log_list(select).await
    }

    /// 数据库浏览页的测试日志列表
    pub async fn list_test_logs(&self, filter: &TestLogFilter) -> AppResult<Vec<TestLogSummary>> {
        let mut select = Self::test_log_list_select();

        if let Some(term) = filter.search_term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(lower_like((pia_board::Entity, pia_board::Column::SerialNumber), &term))
                    .add(lower_like((pia_board::Entity, pia_board::Column::PartNumber), &term))
                    .add(lower_like((pmt_device::Entity, pmt_device::Column::PmtSerialNumber), &term))
                    .add(lower_like((test_log::Entity, test_log::Column::Name), &term)),
            );
        }
        if let Some(fixture) = &filter.test_fixture {
            select = select.filter(test_log::Column::TestFixture.eq(fixture.as_str()));
        }
        match filter.result {
            ResultFilter::All => {}
            ResultFilter::PassedOnly => select = select.filter(test_log::Column::FullTestPassed.eq(true)),
            ResultFilter::FailedOnly => select = select.filter(test_log::Column::FullTestPassed.eq(false)),
        }
        if filter.full_tests_only {
            select = select.filter(test_log::Column::FullTestCompleted.eq(true));
        }
        if let Some(from) = filter.date_from {
            select = select.filter(test_log::Column::CreatedAt.gte(time_utils::start_of_day(from)));
        }
        if let Some(to) = filter.date_to {
            select = select.filter(test_log::Column::CreatedAt.lte(time_utils::end_of_day(to)));
        }

        select = select.order_by_desc(test_log::Column::CreatedAt);
        if let Some(limit) = filter.limit {
            select = select.limit(limit);
        }
        self.load_test_log_list(select).await
    }

    pub async fn test_logs_for_board(&self, board_id: i32) -> AppResult<Vec<TestLogSummary>> {
        let select = Self::test_log_list_select()
            .filter(test_log::Column::PiaBoardId.eq(board_id))
            .order_by_desc(test_log::Column::CreatedAt);
        self.load_test_log_list(select).await
    }

    /// 指定夹具的测试日志数量
    pub async fn count_by_location(&self, location: &str) -> AppResult<(String, u64)> {
        let count = test_log::Entity::find()
            .filter(test_log::Column::TestFixture.eq(location))
            .count(self.conn())
            .await?;
        Ok((location.to_string(), count))
    }

    pub async fn get_test_log(&self, test_log_id: i32) -> AppResult<Option<test_log::Model>> {
        Ok(test_log::Entity::find_by_id(test_log_id).one(self.conn()).await?)
    }

    pub async fn get_html_content(&self, test_log_id: i32) -> AppResult<Option<String>> {
        let content = test_log::Entity::find_by_id(test_log_id)
            .select_only()
            .column(test_log::Column::HtmlContent)
            .into_tuple::<Option<String>>()
            .one(self.conn())
            .await?;
        Ok(content.flatten())
    }

    pub async fn get_html_path(&self, test_log_id: i32) -> AppResult<Option<String>> {
        let path = test_log::Entity::find_by_id(test_log_id)
            .select_only()
            .column(test_log::Column::HtmlPath)
            .into_tuple::<Option<String>>()
            .one(self.conn())
            .await?;
        Ok(path.flatten())
    }

    /// 按文件内容摘要判断测试日志是否已入库
    pub async fn test_log_exists(&self, test_log_path: &Path) -> AppResult<(Vec<u8>, bool)> {
        let html_hash = compute_file_sha256(test_log_path).await?;
        let existing = test_log::Entity::find()
            .select_only()
            .column(test_log::Column::Id)
            .filter(test_log::Column::HtmlHash.eq(html_hash.clone()))
            .into_tuple::<i32>()
            .one(self.conn())
            .await?;
        Ok((html_hash, existing.is_some()))
    }

    // ------------------------------------------------------------------
    // 统计
    // ------------------------------------------------------------------

    pub async fn database_stats(&self) -> AppResult<DatabaseStats> {
        let db = self.conn();
        Ok(DatabaseStats {
            total_boards: pia_board::Entity::find().count(db).await?,
            total_pmts: pmt_device::Entity::find().count(db).await?,
            total_test_logs: test_log::Entity::find().count(db).await?,
            completed_tests: test_log::Entity::find()
                .filter(test_log::Column::FullTestCompleted.eq(true))
                .count(db)
                .await?,
            passed_tests: test_log::Entity::find()
                .filter(test_log::Column::FullTestPassed.eq(true))
                .count(db)
                .await?,
        })
    }

    /// 至少有一次完整测试的板卡数量
    pub async fn count_boards_with_full_test(&self) -> AppResult<u64> {
        let ids = test_log::Entity::find()
            .select_only()
            .column(test_log::Column::PiaBoardId)
            .distinct()
            .filter(test_log::Column::FullTestCompleted.eq(true))
            .into_tuple::<i32>()
            .all(self.conn())
            .await?;
        Ok(ids.len() as u64)
    }

    // ------------------------------------------------------------------
    // 板卡 / PMT
    // ------------------------------------------------------------------

    pub async fn find_board_by_serial(&self, serial_number: &str) -> AppResult<Option<pia_board::Model>> {
        Ok(pia_board::Entity::find()
            .filter(pia_board::Column::SerialNumber.eq(serial_number))
            .one(self.conn())
            .await?)
    }

    pub async fn find_board_by_id(&self, board_id: i32) -> AppResult<Option<pia_board::Model>> {
        Ok(pia_board::Entity::find_by_id(board_id).one(self.conn()).await?)
    }

    pub async fn find_boards_by_part_number(&self, part_number: &str) -> AppResult<Vec<pia_board::Model>> {
        Ok(pia_board::Entity::find()
            .filter(pia_board::Column::PartNumber.eq(part_number))
            .order_by_asc(pia_board::Column::SerialNumber)
            .all(self.conn())
            .await?)
    }

    pub async fn find_pmt_by_serial(&self, serial_number: &str) -> AppResult<Option<pmt_device::Model>> {
        Ok(pmt_device::Entity::find()
            .filter(pmt_device::Column::PmtSerialNumber.eq(serial_number))
            .one(self.conn())
            .await?)
    }

    /// 没有任何失败测量项的板卡（没有测试记录的板卡也算）
    pub async fn find_boards_with_all_specs_passing(&self) -> AppResult<Vec<pia_board::Model>> {
        let failing_boards = Query::select()
            .column((test_log::Entity, test_log::Column::PiaBoardId))
            .from(test_log::Entity)
            .inner_join(
                sub_test::Entity,
                Expr::col((sub_test::Entity, sub_test::Column::TestLogId))
                    .equals((test_log::Entity, test_log::Column::Id)),
            )
            .inner_join(
                spec::Entity,
                Expr::col((spec::Entity, spec::Column::SubTestId)).equals((sub_test::Entity, sub_test::Column::Id)),
            )
            .and_where(Expr::col((spec::Entity, spec::Column::Result)).eq(false))
            .to_owned();

        Ok(pia_board::Entity::find()
            .filter(pia_board::Column::Id.not_in_subquery(failing_boards))
            .order_by_asc(pia_board::Column::SerialNumber)
            .all(self.conn())
            .await?)
    }

    /// 板卡列表及每块板卡的测试日志数量
    pub async fn list_boards(&self, search_term: Option<&str>) -> AppResult<Vec<BoardSummary>> {
        let mut select = pia_board::Entity::find();
        if let Some(term) = search_term.map(str::trim).filter(|t| !t.is_empty()) {
            let term = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(lower_like((pia_board::Entity, pia_board::Column::SerialNumber), &term))
                    .add(lower_like((pia_board::Entity, pia_board::Column::PartNumber), &term)),
            );
        }
        let boards = select.order_by_asc(pia_board::Column::SerialNumber).all(self.conn()).await?;

        let counts: HashMap<i32, i64> = test_log::Entity::find()
            .select_only()
            .column(test_log::Column::PiaBoardId)
            .column_as(test_log::Column::Id.count(), "cnt")
            .group_by(test_log::Column::PiaBoardId)
            .into_tuple::<(i32, i64)>()
            .all(self.conn())
            .await?
            .into_iter()
            .collect();

        Ok(boards
            .into_iter()
            .map(|board| {
                let test_log_count = counts.get(&board.id).copied().unwrap_or(0) as u64;
                BoardSummary { board, test_log_count }
            })
            .collect())
    }

    /// PMT 列表及每个 PMT 的测试日志数量
    pub async fn list_pmts(&self, search_term: Option<&str>) -> AppResult<Vec<PmtSummary>> {
        let mut select = pmt_device::Entity::find();
        if let Some(term) = search_term.map(str::trim).filter(|t| !t.is_empty()) {
            let term = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(lower_like((pmt_device::Entity, pmt_device::Column::PmtSerialNumber), &term))
                    .add(lower_like((pmt_device::Entity, pmt_device::Column::BatchNumber), &term)),
            );
        }
        let pmts = select.order_by_asc(pmt_device::Column::PmtSerialNumber).all(self.conn()).await?;

        let counts: HashMap<i32, i64> = test_log::Entity::find()
            .select_only()
            .column(test_log::Column::PmtId)
            .column_as(test_log::Column::Id.count(), "cnt")
            .filter(test_log::Column::PmtId.is_not_null())
            .group_by(test_log::Column::PmtId)
            .into_tuple::<(i32, i64)>()
            .all(self.conn())
            .await?
            .into_iter()
            .collect();

        Ok(pmts
            .into_iter()
            .map(|pmt| {
                let test_log_count = counts.get(&pmt.id).copied().unwrap_or(0) as u64;
                PmtSummary { pmt, test_log_count }
            })
            .collect())
    }

    /// 厂商列表及参考数据、批次数量
    pub async fn list_manufacturers(&self, search_term: Option<&str>) -> AppResult<Vec<ManufacturerSummary>> {
        let mut select = manufacturer::Entity::find();
        if let Some(term) = search_term.map(str::trim).filter(|t| !t.is_empty()) {
            let term = format!("%{}%", term.to_lowercase());
            select = select.filter(lower_like((manufacturer::Entity, manufacturer::Column::Name), &term));
        }
        let manufacturers = select.order_by_asc(manufacturer::Column::Name).all(self.conn()).await?;

        let spec_counts: HashMap<i32, i64> = manufacturer_spec::Entity::find()
            .select_only()
            .column(manufacturer_spec::Column::ManufacturerId)
            .column_as(manufacturer_spec::Column::Id.count(), "cnt")
            .group_by(manufacturer_spec::Column::ManufacturerId)
            .into_tuple::<(i32, i64)>()
            .all(self.conn())
            .await?
            .into_iter()
            .collect();
        let batch_counts: HashMap<i32, i64> = manufacturer_device_batch::Entity::find()
            .select_only()
            .column(manufacturer_device_batch::Column::ManufacturerId)
            .column_as(manufacturer_device_batch::Column::Id.count(), "cnt")
            .group_by(manufacturer_device_batch::Column::ManufacturerId)
            .into_tuple::<(i32, i64)>()
            .all(self.conn())
            .await?
            .into_iter()
            .collect();

        Ok(manufacturers
            .into_iter()
            .map(|m| ManufacturerSummary {
                spec_count: spec_counts.get(&m.id).copied().unwrap_or(0) as u64,
                batch_count: batch_counts.get(&m.id).copied().unwrap_or(0) as u64,
                id: m.id,
                name: m.name,
                description: m.description,
                contact_info: m.contact_info,
                website: m.website,
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // 去重列表
    // ------------------------------------------------------------------

    pub async fn board_serial_numbers(&self) -> AppResult<Vec<String>> {
        Ok(pia_board::Entity::find()
            .select_only()
            .column(pia_board::Column::SerialNumber)
            .distinct()
            .order_by_asc(pia_board::Column::SerialNumber)
            .into_tuple::<String>()
            .all(self.conn())
            .await?)
    }

    pub async fn board_part_numbers(&self) -> AppResult<Vec<String>> {
        let rows = pia_board::Entity::find()
            .select_only()
            .column(pia_board::Column::PartNumber)
            .distinct()
            .order_by_asc(pia_board::Column::PartNumber)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    pub async fn pmt_serial_numbers(&self) -> AppResult<Vec<String>> {
        let rows = pmt_device::Entity::find()
            .select_only()
            .column(pmt_device::Column::PmtSerialNumber)
            .distinct()
            .order_by_asc(pmt_device::Column::PmtSerialNumber)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    pub async fn pmt_batch_numbers(&self) -> AppResult<Vec<String>> {
        let rows = pmt_device::Entity::find()
            .select_only()
            .column(pmt_device::Column::BatchNumber)
            .distinct()
            .order_by_asc(pmt_device::Column::BatchNumber)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    pub async fn test_fixtures(&self) -> AppResult<Vec<String>> {
        let rows = test_log::Entity::find()
            .select_only()
            .column(test_log::Column::TestFixture)
            .distinct()
            .order_by_asc(test_log::Column::TestFixture)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().filter(|f| !f.is_empty()).collect())
    }

    pub async fn spec_names(&self) -> AppResult<Vec<String>> {
        let rows = spec::Entity::find()
            .select_only()
            .column(spec::Column::Name)
            .distinct()
            .order_by_asc(spec::Column::Name)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// 带曲线数据的测量项名称
    pub async fn plot_spec_names(&self) -> AppResult<Vec<String>> {
        let rows = spec::Entity::find()
            .select_only()
            .column(spec::Column::Name)
            .distinct()
            .filter(spec::Column::HasPlot.eq(true))
            .order_by_asc(spec::Column::Name)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// 与参考测量项出现在同一测试日志中、且有数值的其他测量项名称
    pub async fn paired_spec_names(&self, spec_name: &str) -> AppResult<Vec<String>> {
        let reference_logs = Query::select()
            .column((sub_test::Entity, sub_test::Column::TestLogId))
            .from(sub_test::Entity)
            .inner_join(
                spec::Entity,
                Expr::col((spec::Entity, spec::Column::SubTestId)).equals((sub_test::Entity, sub_test::Column::Id)),
            )
            .and_where(Expr::col((spec::Entity, spec::Column::Name)).eq(spec_name))
            .distinct()
            .to_owned();

        let rows = spec::Entity::find()
            .select_only()
            .column(spec::Column::Name)
            .distinct()
            .join(JoinType::InnerJoin, spec::Relation::SubTest.def())
            .filter(sub_test::Column::TestLogId.in_subquery(reference_logs))
            .filter(spec::Column::Name.ne(spec_name))
            .filter(spec::Column::Measurement.is_not_null())
            .order_by_asc(spec::Column::Name)
            .into_tuple::<Option<String>>()
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    // ------------------------------------------------------------------
    // 测量查询
    // ------------------------------------------------------------------

    /// 根据过滤条件构造测量项查询语句
    pub fn measurement_statement(filter: &SpecQueryFilter) -> Select<spec::Entity> {
        let mut stmt = spec::Entity::find()
            .join(JoinType::InnerJoin, spec::Relation::SubTest.def())
            .join(JoinType::InnerJoin, sub_test::Relation::TestLog.def())
            .join(JoinType::LeftJoin, test_log::Relation::PiaBoard.def())
            .join(JoinType::LeftJoin, test_log::Relation::PmtDevice.def());

        match filter.spec_names.as_slice() {
            [] => {}
            [name] => stmt = stmt.filter(spec::Column::Name.eq(name.as_str())),
            names => stmt = stmt.filter(spec::Column::Name.is_in(names.iter().map(String::as_str))),
        }

        if !filter.csv_identifiers.is_empty() {
            let vals: Vec<String> = filter
                .csv_identifiers
                .iter()
                .map(|v| v.trim().to_uppercase())
                .filter(|v| !v.is_empty())
                .collect();
            let upper_in = |col: (pia_board::Entity, pia_board::Column)| {
                Expr::expr(Func::upper(Expr::col(col))).is_in(vals.clone())
            };
            stmt = stmt.filter(
                Condition::any()
                    .add(upper_in((pia_board::Entity, pia_board::Column::SerialNumber)))
                    .add(upper_in((pia_board::Entity, pia_board::Column::PartNumber)))
                    .add(
                        Expr::expr(Func::upper(Expr::col((pmt_device::Entity, pmt_device::Column::PmtSerialNumber))))
                            .is_in(vals.clone()),
                    ),
            );
        }

        if let Some(v) = &filter.pia_serial {
            stmt = stmt.filter(pia_board::Column::SerialNumber.eq(v.as_str()));
        }
        if let Some(v) = &filter.pia_part {
            stmt = stmt.filter(pia_board::Column::PartNumber.eq(v.as_str()));
        }
        if let Some(v) = &filter.pmt_serial {
            stmt = stmt.filter(pmt_device::Column::PmtSerialNumber.eq(v.as_str()));
        }
        if let Some(v) = &filter.pmt_batch {
            stmt = stmt.filter(pmt_device::Column::BatchNumber.eq(v.as_str()));
        }
        if let Some(v) = &filter.test_fixture {
            stmt = stmt.filter(test_log::Column::TestFixture.eq(v.as_str()));
        }
        if let Some(from) = filter.date_from {
            stmt = stmt.filter(test_log::Column::CreatedAt.gte(time_utils::start_of_day(from)));
        }
        if let Some(to) = filter.date_to {
            stmt = stmt.filter(test_log::Column::CreatedAt.lte(time_utils::end_of_day(to)));
        }
        if filter.full_tests_only {
            stmt = stmt.filter(test_log::Column::FullTestCompleted.eq(true));
        }

        stmt = match filter.order_key {
            Some(OrderKey::PiaSerialNumber) => stmt.order_by_asc(pia_board::Column::SerialNumber),
            Some(OrderKey::PiaPartNumber) => stmt.order_by_asc(pia_board::Column::PartNumber),
            Some(OrderKey::PmtSerialNumber) => stmt.order_by_asc(pmt_device::Column::PmtSerialNumber),
            Some(OrderKey::Recent) => stmt.order_by_desc(test_log::Column::CreatedAt),
            Some(OrderKey::TestName) => stmt.order_by_asc(test_log::Column::Name),
            Some(OrderKey::TestFixture) => stmt.order_by_asc(test_log::Column::TestFixture),
            Some(OrderKey::PmtGeneration) => stmt.order_by_asc(pmt_device::Column::Generation),
            Some(OrderKey::PmtBatch) => stmt.order_by_asc(pmt_device::Column::BatchNumber),
            None => stmt,
        };
        // 分页时保持稳定顺序
        stmt.order_by_asc(spec::Column::Id)
    }

    pub async fn count_measurements(&self, filter: &SpecQueryFilter) -> AppResult<u64> {
        Ok(Self::measurement_statement(filter).count(self.conn()).await?)
    }

    pub async fn measurements_page(
        &self,
        filter: &SpecQueryFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<MeasurementRecord>> {
        let specs = Self::measurement_statement(filter)
            .offset(offset)
            .limit(limit)
            .all(self.conn())
            .await?;
        self.hydrate(specs).await
    }

    /// 一次取出全部匹配的测量记录
    pub async fn measurements(&self, filter: &SpecQueryFilter) -> AppResult<Vec<MeasurementRecord>> {
        let specs = Self::measurement_statement(filter).all(self.conn()).await?;
        self.hydrate(specs).await
    }

    /// 按 id 列表取测量记录，保持传入顺序
    pub async fn measurements_by_ids(&self, spec_ids: &[i32]) -> AppResult<Vec<MeasurementRecord>> {
        let mut specs = Vec::with_capacity(spec_ids.len());
        for chunk in spec_ids.chunks(ID_CHUNK) {
            specs.extend(
                spec::Entity::find()
                    .filter(spec::Column::Id.is_in(chunk.iter().copied()))
                    .all(self.conn())
                    .await?,
            );
        }
        let order: HashMap<i32, usize> = spec_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        specs.sort_by_key(|s| order.get(&s.id).copied().unwrap_or(usize::MAX));
        self.hydrate(specs).await
    }

    /// 测试日志查询，但不读取 HTML 正文和摘要
    fn test_log_without_html() -> Select<test_log::Entity> {
        test_log::Entity::find()
            .select_only()
            .columns(
                test_log::Column::iter()
                    .filter(|c| !matches!(c, test_log::Column::HtmlContent | test_log::Column::HtmlHash)),
            )
            .expr_as(Expr::cust("NULL"), "html_content")
            .expr_as(Expr::cust("NULL"), "html_hash")
    }

    /// 为测量项批量加载子测试、测试日志、板卡和 PMT
    async fn hydrate(&self, specs: Vec<spec::Model>) -> AppResult<Vec<MeasurementRecord>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.conn();

        let sub_test_ids = dedup_ids(specs.iter().map(|s| s.sub_test_id));
        let mut sub_tests = HashMap::new();
        for chunk in sub_test_ids.chunks(ID_CHUNK) {
            for m in sub_test::Entity::find()
                .filter(sub_test::Column::Id.is_in(chunk.iter().copied()))
                .all(db)
                .await?
            {
                sub_tests.insert(m.id, m);
            }
        }

        let log_ids = dedup_ids(sub_tests.values().map(|s: &sub_test::Model| s.test_log_id));
        let mut logs = HashMap::new();
        for chunk in log_ids.chunks(ID_CHUNK) {
            for m in Self::test_log_without_html()
                .filter(test_log::Column::Id.is_in(chunk.iter().copied()))
                .into_model::<test_log::Model>()
                .all(db)
                .await?
            {
                logs.insert(m.id, m);
            }
        }

        let board_ids = dedup_ids(logs.values().map(|l: &test_log::Model| l.pia_board_id));
        let mut boards = HashMap::new();
        for chunk in board_ids.chunks(ID_CHUNK) {
            for m in pia_board::Entity::find()
                .filter(pia_board::Column::Id.is_in(chunk.iter().copied()))
                .all(db)
                .await?
            {
                boards.insert(m.id, m);
            }
        }

        let pmt_ids = dedup_ids(logs.values().filter_map(|l: &test_log::Model| l.pmt_id));
        let mut pmts = HashMap::new();
        for chunk in pmt_ids.chunks(ID_CHUNK) {
            for m in pmt_device::Entity::find()
                .filter(pmt_device::Column::Id.is_in(chunk.iter().copied()))
                .all(db)
                .await?
            {
                pmts.insert(m.id, m);
            }
        }

        let mut records = Vec::with_capacity(specs.len());
        for spec in specs {
            let Some(sub_test) = sub_tests.get(&spec.sub_test_id) else {
                log::warn!("[QUERY] 测量项 {} 的子测试不存在", spec.id);
                continue;
            };
            let Some(test_log) = logs.get(&sub_test.test_log_id) else {
                log::warn!("[QUERY] 子测试 {} 的测试日志不存在", sub_test.id);
                continue;
            };
            let Some(board) = boards.get(&test_log.pia_board_id) else {
                log::warn!("[QUERY] 测试日志 {} 的板卡不存在", test_log.id);
                continue;
            };
            let pmt = test_log.pmt_id.and_then(|id| pmts.get(&id)).cloned();
            records.push(MeasurementRecord {
                spec,
                sub_test: sub_test.clone(),
                test_log: test_log.clone(),
                board: board.clone(),
                pmt,
            });
        }
        Ok(records)
    }

    /// 指定子测试在已完成测试中的全部测量项，按测量项名称分组
    ///
    /// `exclude_outliers` 时只保留 `nominal ± |nominal|·tolerance` 开区间内的测量值；
    /// `days_from_today` 为 0 时不限时间
    pub async fn specs_of_subtest_from_completed_tests(
        &self,
        subtest_name: &str,
        exclude_outliers: bool,
        tolerance: f64,
        days_from_today: i64,
    ) -> AppResult<BTreeMap<String, Vec<spec::Model>>> {
        let mut query = spec::Entity::find()
            .join(JoinType::InnerJoin, spec::Relation::SubTest.def())
            .join(JoinType::InnerJoin, sub_test::Relation::TestLog.def())
            .filter(sub_test::Column::Name.eq(subtest_name))
            .filter(test_log::Column::FullTestCompleted.eq(true));

        if days_from_today > 0 {
            query = query.filter(test_log::Column::CreatedAt.gt(time_utils::days_ago(days_from_today)));
        }
        if exclude_outliers {
            query = query.filter(Expr::cust_with_values(
                "spec.measurement > spec.nominal - ABS(spec.nominal) * ? AND spec.measurement < spec.nominal + ABS(spec.nominal) * ?",
                [tolerance, tolerance],
            ));
        }

        let specs = query.order_by_asc(spec::Column::Id).all(self.conn()).await?;
        let mut grouped: BTreeMap<String, Vec<spec::Model>> = BTreeMap::new();
        for s in specs {
            grouped.entry(s.name.clone().unwrap_or_default()).or_default().push(s);
        }
        Ok(grouped)
    }

    // ------------------------------------------------------------------
    // 厂商参考数据
    // ------------------------------------------------------------------

    /// 指定测量项的厂商参考数据（设备序列号、测量值都不为空）
    pub async fn manufacturer_data_for_spec(&self, spec_name: &str) -> AppResult<Vec<ManufacturerDataPoint>> {
        let rows = manufacturer_spec::Entity::find()
            .find_also_related(manufacturer::Entity)
            .filter(manufacturer_spec::Column::SpecName.eq(spec_name))
            .filter(manufacturer_spec::Column::DeviceSerial.is_not_null())
            .filter(manufacturer_spec::Column::Measurement.is_not_null())
            .order_by_asc(manufacturer_spec::Column::Id)
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(s, m)| {
                Some(ManufacturerDataPoint {
                    device_serial: s.device_serial?,
                    measurement: s.measurement?,
                    manufacturer: m.map(|m| m.name).unwrap_or_else(|| "Unknown".to_string()),
                })
            })
            .collect())
    }

    pub async fn find_manufacturer_by_name(&self, name: &str) -> AppResult<Option<manufacturer::Model>> {
        Ok(manufacturer::Entity::find()
            .filter(manufacturer::Column::Name.eq(name))
            .one(self.conn())
            .await?)
    }
}
