//! 数据库浏览页服务
//!
//! 四种视图（测试日志、PIA 板卡、PMT 器件、厂商）的列表、详情、编辑与删除，
//! 以及厂商数据导入、整库导出和全库字符串搜索。
//!
//! 删除分两步：`request_delete` 返回影响范围和确认令牌，`confirm_delete` 凭令牌执行，
//! 级联删除在同一事务内完成。同一时刻只有一个待确认的删除，新的请求会使旧令牌失效。

use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::search_service::load_report_html;
use crate::models::entities::{
    manufacturer, manufacturer_device_batch, manufacturer_spec, pia_board, pmt_device, spec, sub_test, test_log,
};
use crate::models::enums::{ImportFormat, ResultFilter, ViewMode};
use crate::models::structs::{
    BoardSummary, DatabaseStats, ImportResult, ManufacturerSummary, PmtSummary, StringMatch, TestLogFilter,
    TestLogSummary,
};
use crate::services::infrastructure::excel::{DatabaseExporter, ManufacturerImporter};
use crate::services::infrastructure::persistence::{DatabaseManager, Queries};
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// 默认显示最近几个月的测试日志
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 6;
/// 单条 IN 语句的最大参数个数
const ID_CHUNK: usize = 500;

/// 空白字符串存为 NULL
fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 浏览页过滤条件（只作用于测试日志视图；搜索词同时用于其它视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserFilters {
    pub search_term: String,
    pub test_fixture: Option<String>,
    pub result: ResultFilter,
    pub full_tests_only: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Default for BrowserFilters {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            test_fixture: None,
            result: ResultFilter::All,
            full_tests_only: false,
            date_from: Some(time_utils::months_ago(DEFAULT_LOOKBACK_MONTHS)),
            date_to: Some(time_utils::now_naive_utc().date()),
        }
    }
}

impl BrowserFilters {
    fn search(&self) -> Option<&str> {
        Some(self.search_term.trim()).filter(|t| !t.is_empty())
    }

    fn to_test_log_filter(&self) -> TestLogFilter {
        TestLogFilter {
            search_term: self.search().map(str::to_string),
            test_fixture: self.test_fixture.as_deref().and_then(non_empty),
            result: self.result,
            full_tests_only: self.full_tests_only,
            date_from: self.date_from,
            date_to: self.date_to,
            limit: None,
        }
    }
}

/// 当前视图的列表数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "view", content = "rows")]
pub enum BrowserListing {
    TestLogs(Vec<TestLogSummary>),
    PiaBoards(Vec<BoardSummary>),
    PmtDevices(Vec<PmtSummary>),
    Manufacturers(Vec<ManufacturerSummary>),
}

impl BrowserListing {
    pub fn len(&self) -> usize {
        match self {
            BrowserListing::TestLogs(rows) => rows.len(),
            BrowserListing::PiaBoards(rows) => rows.len(),
            BrowserListing::PmtDevices(rows) => rows.len(),
            BrowserListing::Manufacturers(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 页面副标题，例如 "12 Test Logs"
    pub fn subtitle(&self) -> String {
        let label = match self {
            BrowserListing::TestLogs(_) => "Test Logs",
            BrowserListing::PiaBoards(_) => "PIA Boards",
            BrowserListing::PmtDevices(_) => "PMT Devices",
            BrowserListing::Manufacturers(_) => "Manufacturers",
        };
        format!("{} {}", self.len(), label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTestDetail {
    pub sub_test: sub_test::Model,
    pub specs: Vec<spec::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLogDetail {
    pub test_log: test_log::Model,
    pub board: Option<pia_board::Model>,
    pub pmt: Option<pmt_device::Model>,
    pub has_html: bool,
    pub sub_tests: Vec<SubTestDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturerDetail {
    pub manufacturer: manufacturer::Model,
    pub batches: Vec<manufacturer_device_batch::Model>,
    pub specs: Vec<manufacturer_spec::Model>,
}

/// 详情面板的数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record")]
pub enum RecordDetail {
    TestLog(Box<TestLogDetail>),
    PiaBoard { board: pia_board::Model, test_logs: Vec<TestLogSummary> },
    PmtDevice { pmt: pmt_device::Model, test_log_count: u64 },
    Manufacturer(Box<ManufacturerDetail>),
}

/// 详情面板中可编辑字段的提交值，空字符串存为 NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RecordUpdate {
    TestLog {
        id: i32,
        #[serde(default)]
        test_fixture: String,
        #[serde(default)]
        pia_serial_number: String,
        #[serde(default)]
        pia_part_number: String,
        #[serde(default)]
        pmt_serial_number: String,
    },
    PiaBoard {
        id: i32,
        #[serde(default)]
        serial_number: String,
        #[serde(default)]
        part_number: String,
        #[serde(default)]
        generation_project: String,
        #[serde(default)]
        version: String,
    },
    PmtDevice {
        id: i32,
        #[serde(default)]
        pmt_serial_number: String,
        #[serde(default)]
        batch_number: String,
        #[serde(default)]
        generation: String,
    },
    Manufacturer {
        id: i32,
        #[serde(default)]
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        website: String,
        #[serde(default)]
        contact_info: String,
    },
}

/// 新增厂商
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewManufacturer {
    pub name: String,
    pub description: String,
    pub website: String,
    pub contact_info: String,
}

/// 删除会波及的记录数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteImpact {
    pub test_logs: u64,
    pub sub_tests: u64,
    pub specs: u64,
    /// 删除 PMT 时解除关联的测试日志
    pub detached_test_logs: u64,
    pub batches: u64,
    pub manufacturer_specs: u64,
}

/// 等待确认的删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub token: String,
    pub kind: ViewMode,
    pub id: i32,
    pub message: String,
    pub impact: DeleteImpact,
}

fn record_label(kind: ViewMode) -> &'static str {
    match kind {
        ViewMode::TestLogs => "TestLog",
        ViewMode::PiaBoards => "PCBABoard",
        ViewMode::PmtDevices => "PMT",
        ViewMode::Manufacturers => "Manufacturer",
    }
}

async fn sub_test_ids<C: ConnectionTrait>(db: &C, log_ids: &[i32]) -> AppResult<Vec<i32>> {
    let mut ids = Vec::new();
    for chunk in log_ids.chunks(ID_CHUNK) {
        let found: Vec<i32> = sub_test::Entity::find()
            .select_only()
            .column(sub_test::Column::Id)
            .filter(sub_test::Column::TestLogId.is_in(chunk.iter().copied()))
            .into_tuple()
            .all(db)
            .await?;
        ids.extend(found);
    }
    Ok(ids)
}

async fn board_log_ids<C: ConnectionTrait>(db: &C, board_id: i32) -> AppResult<Vec<i32>> {
    Ok(test_log::Entity::find()
        .select_only()
        .column(test_log::Column::Id)
        .filter(test_log::Column::PiaBoardId.eq(board_id))
        .into_tuple()
        .all(db)
        .await?)
}

async fn count_specs<C: ConnectionTrait>(db: &C, sub_ids: &[i32]) -> AppResult<u64> {
    let mut total = 0;
    for chunk in sub_ids.chunks(ID_CHUNK) {
        total += spec::Entity::find()
            .filter(spec::Column::SubTestId.is_in(chunk.iter().copied()))
            .count(db)
            .await?;
    }
    Ok(total)
}

/// 删除测试日志及其子测试、测量项
async fn delete_test_logs<C: ConnectionTrait>(db: &C, log_ids: &[i32]) -> AppResult<DeleteImpact> {
    let sub_ids = sub_test_ids(db, log_ids).await?;
    let mut impact = DeleteImpact::default();
    for chunk in sub_ids.chunks(ID_CHUNK) {
        impact.specs += spec::Entity::delete_many()
            .filter(spec::Column::SubTestId.is_in(chunk.iter().copied()))
            .exec(db)
            .await?
            .rows_affected;
    }
    for chunk in log_ids.chunks(ID_CHUNK) {
        impact.sub_tests += sub_test::Entity::delete_many()
            .filter(sub_test::Column::TestLogId.is_in(chunk.iter().copied()))
            .exec(db)
            .await?
            .rows_affected;
        impact.test_logs += test_log::Entity::delete_many()
            .filter(test_log::Column::Id.is_in(chunk.iter().copied()))
            .exec(db)
            .await?
            .rows_affected;
    }
    Ok(impact)
}

/// 删除操作在事务内的执行体
async fn execute_delete(txn: &DatabaseTransaction, kind: ViewMode, id: i32) -> AppResult<DeleteImpact> {
    match kind {
        ViewMode::TestLogs => {
            let impact = delete_test_logs(txn, &[id]).await?;
            if impact.test_logs == 0 {
                return Err(AppError::not_found_error("TestLog", format!("测试日志 {} 不存在", id)));
            }
            Ok(impact)
        }
        ViewMode::PiaBoards => {
            let log_ids = board_log_ids(txn, id).await?;
            let impact = delete_test_logs(txn, &log_ids).await?;
            let removed = pia_board::Entity::delete_by_id(id).exec(txn).await?.rows_affected;
            if removed == 0 {
                return Err(AppError::not_found_error("PiaBoard", format!("板卡 {} 不存在", id)));
            }
            Ok(impact)
        }
        ViewMode::PmtDevices => {
            let detached = test_log::Entity::update_many()
                .col_expr(test_log::Column::PmtId, sea_orm::sea_query::Expr::value(Option::<i32>::None))
                .filter(test_log::Column::PmtId.eq(id))
                .exec(txn)
                .await?
                .rows_affected;
            let removed = pmt_device::Entity::delete_by_id(id).exec(txn).await?.rows_affected;
            if removed == 0 {
                return Err(AppError::not_found_error("PmtDevice", format!("PMT {} 不存在", id)));
            }
            Ok(DeleteImpact { detached_test_logs: detached, ..Default::default() })
        }
        ViewMode::Manufacturers => {
            let manufacturer_specs = manufacturer_spec::Entity::delete_many()
                .filter(manufacturer_spec::Column::ManufacturerId.eq(id))
                .exec(txn)
                .await?
                .rows_affected;
            let batches = manufacturer_device_batch::Entity::delete_many()
                .filter(manufacturer_device_batch::Column::ManufacturerId.eq(id))
                .exec(txn)
                .await?
                .rows_affected;
            let removed = manufacturer::Entity::delete_by_id(id).exec(txn).await?.rows_affected;
            if removed == 0 {
                return Err(AppError::not_found_error("Manufacturer", format!("厂商 {} 不存在", id)));
            }
            Ok(DeleteImpact { batches, manufacturer_specs, ..Default::default() })
        }
    }
}

/// 板卡序列号不能为空且不能与其它板卡重复
async fn validated_board_serial<C: ConnectionTrait>(db: &C, board_id: i32, serial: &str) -> AppResult<String> {
    let serial = non_empty(serial).ok_or_else(|| AppError::validation_error("PIA serial number is required."))?;
    let clash = pia_board::Entity::find()
        .filter(pia_board::Column::SerialNumber.eq(serial.as_str()))
        .filter(pia_board::Column::Id.ne(board_id))
        .one(db)
        .await?;
    if clash.is_some() {
        return Err(AppError::validation_error(format!("PIA serial number '{}' already exists.", serial)));
    }
    Ok(serial)
}

/// 厂商名不能为空且唯一
async fn validated_manufacturer_name<C: ConnectionTrait>(db: &C, manufacturer_id: Option<i32>, name: &str) -> AppResult<String> {
    let name = non_empty(name).ok_or_else(|| AppError::validation_error("Manufacturer name is required."))?;
    let mut query = manufacturer::Entity::find().filter(manufacturer::Column::Name.eq(name.as_str()));
    if let Some(id) = manufacturer_id {
        query = query.filter(manufacturer::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::validation_error(format!("Manufacturer '{}' already exists.", name)));
    }
    Ok(name)
}

async fn apply_update(txn: &DatabaseTransaction, update: RecordUpdate) -> AppResult<()> {
    match update {
        RecordUpdate::TestLog {
            id,
            test_fixture,
            pia_serial_number,
            pia_part_number,
            pmt_serial_number,
        } => {
            let log = test_log::Entity::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| AppError::not_found_error("TestLog", format!("测试日志 {} 不存在", id)))?;

            if let Some(board) = pia_board::Entity::find_by_id(log.pia_board_id).one(txn).await? {
                let serial = validated_board_serial(txn, board.id, &pia_serial_number).await?;
                let mut board: pia_board::ActiveModel = board.into();
                board.serial_number = Set(serial);
                board.part_number = Set(non_empty(&pia_part_number));
                board.update(txn).await?;
            }
            if let Some(pmt_id) = log.pmt_id {
                if let Some(pmt) = pmt_device::Entity::find_by_id(pmt_id).one(txn).await? {
                    let mut pmt: pmt_device::ActiveModel = pmt.into();
                    pmt.pmt_serial_number = Set(non_empty(&pmt_serial_number));
                    pmt.update(txn).await?;
                }
            }

            let mut log: test_log::ActiveModel = log.into();
            log.test_fixture = Set(non_empty(&test_fixture));
            log.update(txn).await?;
        }
        RecordUpdate::PiaBoard {
            id,
            serial_number,
            part_number,
            generation_project,
            version,
        } => {
            let board = pia_board::Entity::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| AppError::not_found_error("PiaBoard", format!("板卡 {} 不存在", id)))?;
            let serial = validated_board_serial(txn, id, &serial_number).await?;
            let mut board: pia_board::ActiveModel = board.into();
            board.serial_number = Set(serial);
            board.part_number = Set(non_empty(&part_number));
            board.generation_project = Set(non_empty(&generation_project));
            board.version = Set(non_empty(&version));
            board.update(txn).await?;
        }
        RecordUpdate::PmtDevice {
            id,
            pmt_serial_number,
            batch_number,
            generation,
        } => {
            let pmt = pmt_device::Entity::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| AppError::not_found_error("PmtDevice", format!("PMT {} 不存在", id)))?;
            let mut pmt: pmt_device::ActiveModel = pmt.into();
            pmt.pmt_serial_number = Set(non_empty(&pmt_serial_number));
            pmt.batch_number = Set(non_empty(&batch_number));
            pmt.generation = Set(non_empty(&generation));
            pmt.update(txn).await?;
        }
        RecordUpdate::Manufacturer {
            id,
            name,
            description,
            website,
            contact_info,
        } => {
            let mfr = manufacturer::Entity::find_by_id(id)
                .one(txn)
                .await?
                .ok_or_else(|| AppError::not_found_error("Manufacturer", format!("厂商 {} 不存在", id)))?;
            let name = validated_manufacturer_name(txn, Some(id), &name).await?;
            let mut mfr: manufacturer::ActiveModel = mfr.into();
            mfr.name = Set(name);
            mfr.description = Set(non_empty(&description));
            mfr.website = Set(non_empty(&website));
            mfr.contact_info = Set(non_empty(&contact_info));
            mfr.update(txn).await?;
        }
    }
    Ok(())
}

/// 数据库浏览页服务
pub struct DatabaseBrowserService {
    manager: DatabaseManager,
    queries: Queries,
    view_mode: ViewMode,
    filters: BrowserFilters,
    pending_delete: Option<(String, ViewMode, i32)>,
}

impl DatabaseBrowserService {
    pub fn new(manager: DatabaseManager) -> Self {
        let queries = manager.queries();
        Self {
            manager,
            queries,
            view_mode: ViewMode::TestLogs,
            filters: BrowserFilters::default(),
            pending_delete: None,
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn filters(&self) -> &BrowserFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: BrowserFilters) {
        self.filters = filters;
    }

    /// 清空过滤条件（日期范围回到默认的最近六个月）
    pub fn clear_filters(&mut self) {
        self.filters = BrowserFilters::default();
    }

    /// 加载当前视图
    pub async fn load_data(&self) -> AppResult<BrowserListing> {
        let search = self.filters.search();
        let listing = match self.view_mode {
            ViewMode::TestLogs => {
                BrowserListing::TestLogs(self.queries.list_test_logs(&self.filters.to_test_log_filter()).await?)
            }
            ViewMode::PiaBoards => BrowserListing::PiaBoards(self.queries.list_boards(search).await?),
            ViewMode::PmtDevices => BrowserListing::PmtDevices(self.queries.list_pmts(search).await?),
            ViewMode::Manufacturers => BrowserListing::Manufacturers(self.queries.list_manufacturers(search).await?),
        };
        info!("[BROWSER] {}", listing.subtitle());
        Ok(listing)
    }

    pub async fn fixture_options(&self) -> AppResult<Vec<String>> {
        self.queries.test_fixtures().await
    }

    pub async fn stats(&self) -> AppResult<DatabaseStats> {
        self.queries.database_stats().await
    }

    /// 侧栏统计文字
    pub async fn stats_text(&self) -> AppResult<String> {
        let stats = self.stats().await?;
        Ok(format!(
            "{} boards | {} PMTs | {} logs",
            stats.total_boards, stats.total_pmts, stats.total_test_logs
        ))
    }

    pub async fn record_detail(&self, kind: ViewMode, id: i32) -> AppResult<RecordDetail> {
        let db = self.manager.connection();
        let db = db.as_ref();
        match kind {
            ViewMode::TestLogs => {
                let test_log = test_log::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| AppError::not_found_error("TestLog", format!("测试日志 {} 不存在", id)))?;
                let board = pia_board::Entity::find_by_id(test_log.pia_board_id).one(db).await?;
                let pmt = match test_log.pmt_id {
                    Some(pmt_id) => pmt_device::Entity::find_by_id(pmt_id).one(db).await?,
                    None => None,
                };
                let subs = sub_test::Entity::find()
                    .filter(sub_test::Column::TestLogId.eq(id))
                    .order_by_asc(sub_test::Column::Id)
                    .all(db)
                    .await?;
                let mut sub_tests = Vec::with_capacity(subs.len());
                for sub in subs {
                    let specs = spec::Entity::find()
                        .filter(spec::Column::SubTestId.eq(sub.id))
                        .order_by_asc(spec::Column::Id)
                        .all(db)
                        .await?;
                    sub_tests.push(SubTestDetail { sub_test: sub, specs });
                }
                let has_html = test_log.html_content.is_some() || test_log.html_path.is_some();
                Ok(RecordDetail::TestLog(Box::new(TestLogDetail {
                    test_log,
                    board,
                    pmt,
                    has_html,
                    sub_tests,
                })))
            }
            ViewMode::PiaBoards => {
                let board = pia_board::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| AppError::not_found_error("PiaBoard", format!("板卡 {} 不存在", id)))?;
                let test_logs = self.queries.test_logs_for_board(id).await?;
                Ok(RecordDetail::PiaBoard { board, test_logs })
            }
            ViewMode::PmtDevices => {
                let pmt = pmt_device::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| AppError::not_found_error("PmtDevice", format!("PMT {} 不存在", id)))?;
                let test_log_count = test_log::Entity::find()
                    .filter(test_log::Column::PmtId.eq(id))
                    .count(db)
                    .await?;
                Ok(RecordDetail::PmtDevice { pmt, test_log_count })
            }
            ViewMode::Manufacturers => {
                let manufacturer = manufacturer::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| AppError::not_found_error("Manufacturer", format!("厂商 {} 不存在", id)))?;
                let batches = manufacturer_device_batch::Entity::find()
                    .filter(manufacturer_device_batch::Column::ManufacturerId.eq(id))
                    .order_by_asc(manufacturer_device_batch::Column::Id)
                    .all(db)
                    .await?;
                let specs = manufacturer_spec::Entity::find()
                    .filter(manufacturer_spec::Column::ManufacturerId.eq(id))
                    .order_by_asc(manufacturer_spec::Column::Id)
                    .all(db)
                    .await?;
                Ok(RecordDetail::Manufacturer(Box::new(ManufacturerDetail {
                    manufacturer,
                    batches,
                    specs,
                })))
            }
        }
    }

    /// 测试日志的 HTML 报告
    pub async fn html_report(&self, test_log_id: i32) -> AppResult<String> {
        load_report_html(&self.queries, test_log_id).await
    }

    /// 保存详情面板的修改
    pub async fn save_changes(&self, update: RecordUpdate) -> AppResult<()> {
        let description = format!("{:?}", update);
        self.manager
            .transaction(move |txn| Box::pin(async move { apply_update(txn, update).await }))
            .await
            .map_err(|e| {
                warn!("[BROWSER] 保存修改失败: {}", e);
                e
            })?;
        crate::log_user_operation!("保存修改: {}", description);
        Ok(())
    }

    pub async fn add_manufacturer(&self, new: NewManufacturer) -> AppResult<manufacturer::Model> {
        let created = self
            .manager
            .transaction(move |txn| {
                Box::pin(async move {
                    let name = validated_manufacturer_name(txn, None, &new.name).await?;
                    let mut model = manufacturer::ActiveModel::new();
                    model.name = Set(name);
                    model.description = Set(non_empty(&new.description));
                    model.website = Set(non_empty(&new.website));
                    model.contact_info = Set(non_empty(&new.contact_info));
                    Ok(model.insert(txn).await?)
                })
            })
            .await?;
        crate::log_user_operation!("新增厂商: {}", created.name);
        Ok(created)
    }

    /// 第一步：统计影响范围并发放确认令牌
    pub async fn request_delete(&mut self, kind: ViewMode, id: i32) -> AppResult<DeleteConfirmation> {
        let db = self.manager.connection();
        let db = db.as_ref();
        let impact = match kind {
            ViewMode::TestLogs => {
                if test_log::Entity::find_by_id(id).one(db).await?.is_none() {
                    return Err(AppError::not_found_error("TestLog", format!("测试日志 {} 不存在", id)));
                }
                let sub_ids = sub_test_ids(db, &[id]).await?;
                DeleteImpact {
                    test_logs: 1,
                    sub_tests: sub_ids.len() as u64,
                    specs: count_specs(db, &sub_ids).await?,
                    ..Default::default()
                }
            }
            ViewMode::PiaBoards => {
                if pia_board::Entity::find_by_id(id).one(db).await?.is_none() {
                    return Err(AppError::not_found_error("PiaBoard", format!("板卡 {} 不存在", id)));
                }
                let log_ids = board_log_ids(db, id).await?;
                let sub_ids = sub_test_ids(db, &log_ids).await?;
                DeleteImpact {
                    test_logs: log_ids.len() as u64,
                    sub_tests: sub_ids.len() as u64,
                    specs: count_specs(db, &sub_ids).await?,
                    ..Default::default()
                }
            }
            ViewMode::PmtDevices => {
                if pmt_device::Entity::find_by_id(id).one(db).await?.is_none() {
                    return Err(AppError::not_found_error("PmtDevice", format!("PMT {} 不存在", id)));
                }
                DeleteImpact {
                    detached_test_logs: test_log::Entity::find()
                        .filter(test_log::Column::PmtId.eq(id))
                        .count(db)
                        .await?,
                    ..Default::default()
                }
            }
            ViewMode::Manufacturers => {
                if manufacturer::Entity::find_by_id(id).one(db).await?.is_none() {
                    return Err(AppError::not_found_error("Manufacturer", format!("厂商 {} 不存在", id)));
                }
                DeleteImpact {
                    batches: manufacturer_device_batch::Entity::find()
                        .filter(manufacturer_device_batch::Column::ManufacturerId.eq(id))
                        .count(db)
                        .await?,
                    manufacturer_specs: manufacturer_spec::Entity::find()
                        .filter(manufacturer_spec::Column::ManufacturerId.eq(id))
                        .count(db)
                        .await?,
                    ..Default::default()
                }
            }
        };

        let token = Uuid::new_v4().to_string();
        self.pending_delete = Some((token.clone(), kind, id));
        Ok(DeleteConfirmation {
            token,
            kind,
            id,
            message: format!(
                "Are you sure you want to delete this {} record?\n\nThis action cannot be undone.",
                record_label(kind)
            ),
            impact,
        })
    }

    /// 放弃一次删除
    pub fn cancel_delete(&mut self, token: &str) -> bool {
        self.take_pending_delete(token).is_some()
    }

    fn take_pending_delete(&mut self, token: &str) -> Option<(ViewMode, i32)> {
        if !matches!(&self.pending_delete, Some((pending, _, _)) if pending == token) {
            return None;
        }
        self.pending_delete.take().map(|(_, kind, id)| (kind, id))
    }

    /// 第二步：凭令牌执行删除，令牌只能使用一次
    pub async fn confirm_delete(&mut self, token: &str) -> AppResult<DeleteImpact> {
        let (kind, id) = self
            .take_pending_delete(token)
            .ok_or_else(|| AppError::validation_error("删除未确认或确认令牌已失效"))?;

        let impact = self
            .manager
            .transaction(move |txn| Box::pin(async move { execute_delete(txn, kind, id).await }))
            .await?;
        crate::log_user_operation!("删除 {} #{}: {:?}", record_label(kind), id, impact);
        Ok(impact)
    }

    pub async fn import_manufacturer_data(&self, file_path: &Path, format: ImportFormat) -> ImportResult {
        let importer = ManufacturerImporter::new(self.manager.connection());
        let result = importer.import_from_excel(file_path, format).await;
        if result.success {
            crate::log_user_operation!(
                "导入厂商数据 {}: 厂商 {} 批次 {} 参考值 {}",
                file_path.display(),
                result.manufacturers_added,
                result.batches_added,
                result.specs_added
            );
        }
        result
    }

    pub fn export_import_template(&self, file_path: &Path, format: ImportFormat) -> AppResult<()> {
        ManufacturerImporter::export_template(file_path, format)
    }

    /// 整库导出，返回写出的工作表数
    pub async fn export_database(&self, file_path: &Path) -> AppResult<usize> {
        let db = self.manager.connection();
        DatabaseExporter::export_database_to_excel(db.as_ref(), file_path)
            .await
            .map_err(|e| {
                crate::log_export_failure!("整库导出 {}: {}", file_path.display(), e);
                e
            })
    }

    pub async fn search_database(&self, needle: &str) -> AppResult<Vec<StringMatch>> {
        if needle.trim().is_empty() {
            return Err(AppError::validation_error("搜索内容不能为空"));
        }
        let db = self.manager.connection();
        DatabaseExporter::search_database_for_string(db.as_ref(), needle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::persistence::{NewSpec, NewTestLog, TestDataGenerator};
    use chrono::NaiveDateTime;

    fn recent(days_ago: i64) -> NaiveDateTime {
        time_utils::days_ago(days_ago)
    }

    async fn seeded() -> DatabaseManager {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();
        let logs = vec![
            NewTestLog::new("PIA-100", recent(2))
                .part("PART-1")
                .pmt("PMT-9", "B7")
                .fixture("Plexus")
                .html("<html>one</html>")
                .spec(NewSpec::range("Power", "Vout", 5.0, 4.0, 5.0, 6.0))
                .spec(NewSpec::range("Power", "Vin", 12.0, 11.0, 12.0, 13.0)),
            NewTestLog::new("PIA-100", recent(1))
                .part("PART-1")
                .fixture("Benchtop")
                .spec(NewSpec::range("Power", "Vout", 7.0, 4.0, 5.0, 6.0)),
            NewTestLog::new("PIA-200", recent(400)).part("PART-2").fixture("Plexus"),
        ];
        for log in &logs {
            TestDataGenerator::insert_test_log(db.as_ref(), log).await.unwrap();
        }
        manager
    }

    fn test_logs(listing: BrowserListing) -> Vec<TestLogSummary> {
        match listing {
            BrowserListing::TestLogs(rows) => rows,
            other => panic!("unexpected listing {:?}", other.subtitle()),
        }
    }

    #[tokio::test]
    async fn default_filters_cover_last_six_months() {
        let svc = DatabaseBrowserService::new(seeded().await);
        let rows = test_logs(svc.load_data().await.unwrap());
        assert_eq!(rows.len(), 2);
        // 最新的在前
        assert_eq!(rows[0].test_fixture.as_deref(), Some("Benchtop"));
    }

    #[tokio::test]
    async fn result_and_fixture_filters() {
        let mut svc = DatabaseBrowserService::new(seeded().await);
        svc.set_filters(BrowserFilters {
            result: ResultFilter::FailedOnly,
            ..Default::default()
        });
        let failed = test_logs(svc.load_data().await.unwrap());
        assert_eq!(failed.len(), 1);
        assert!(!failed[0].full_test_passed);

        svc.set_filters(BrowserFilters {
            test_fixture: Some("Plexus".into()),
            date_from: None,
            ..Default::default()
        });
        assert_eq!(svc.load_data().await.unwrap().len(), 2);

        svc.set_filters(BrowserFilters {
            search_term: "pmt-9".into(),
            ..Default::default()
        });
        assert_eq!(svc.load_data().await.unwrap().len(), 1);

        svc.clear_filters();
        assert_eq!(svc.filters().search_term, "");
    }

    #[tokio::test]
    async fn board_pmt_and_manufacturer_views() {
        let mut svc = DatabaseBrowserService::new(seeded().await);
        svc.set_view_mode(ViewMode::PiaBoards);
        match svc.load_data().await.unwrap() {
            BrowserListing::PiaBoards(rows) => {
                let board = rows.iter().find(|b| b.board.serial_number == "PIA-100").unwrap();
                assert_eq!(board.test_log_count, 2);
            }
            other => panic!("unexpected {}", other.subtitle()),
        }

        svc.set_view_mode(ViewMode::PmtDevices);
        let pmts = svc.load_data().await.unwrap();
        assert_eq!(pmts.subtitle(), "1 PMT Devices");

        svc.add_manufacturer(NewManufacturer { name: " Hamamatsu ".into(), ..Default::default() })
            .await
            .unwrap();
        svc.set_view_mode(ViewMode::Manufacturers);
        match svc.load_data().await.unwrap() {
            BrowserListing::Manufacturers(rows) => {
                assert_eq!(rows[0].name, "Hamamatsu");
                assert_eq!(rows[0].description, None);
            }
            other => panic!("unexpected {}", other.subtitle()),
        }

        assert_eq!(svc.stats_text().await.unwrap(), "2 boards | 1 PMTs | 3 logs");
        assert_eq!(svc.fixture_options().await.unwrap(), vec!["Benchtop", "Plexus"]);
    }

    #[tokio::test]
    async fn manufacturer_name_rules() {
        let svc = DatabaseBrowserService::new(seeded().await);
        let err = svc.add_manufacturer(NewManufacturer::default()).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let acme = svc
            .add_manufacturer(NewManufacturer { name: "Acme".into(), ..Default::default() })
            .await
            .unwrap();
        svc.add_manufacturer(NewManufacturer { name: "Other".into(), ..Default::default() })
            .await
            .unwrap();
        assert!(svc
            .add_manufacturer(NewManufacturer { name: "Acme".into(), ..Default::default() })
            .await
            .is_err());

        let rename = RecordUpdate::Manufacturer {
            id: acme.id,
            name: "Other".into(),
            description: String::new(),
            website: String::new(),
            contact_info: String::new(),
        };
        assert!(svc.save_changes(rename).await.is_err());

        let keep = RecordUpdate::Manufacturer {
            id: acme.id,
            name: "Acme".into(),
            description: "tubes".into(),
            website: "".into(),
            contact_info: "sales@acme".into(),
        };
        svc.save_changes(keep).await.unwrap();
        match svc.record_detail(ViewMode::Manufacturers, acme.id).await.unwrap() {
            RecordDetail::Manufacturer(detail) => {
                assert_eq!(detail.manufacturer.description.as_deref(), Some("tubes"));
                assert_eq!(detail.manufacturer.website, None);
            }
            _ => panic!("expected manufacturer detail"),
        }
    }

    #[tokio::test]
    async fn edits_turn_blank_into_null_and_guard_serials() {
        let manager = seeded().await;
        let svc = DatabaseBrowserService::new(manager.clone());
        let board = manager.queries().find_board_by_serial("PIA-100").await.unwrap().unwrap();

        let blank_serial = RecordUpdate::PiaBoard {
            id: board.id,
            serial_number: "  ".into(),
            part_number: String::new(),
            generation_project: String::new(),
            version: String::new(),
        };
        assert!(svc.save_changes(blank_serial).await.is_err());

        let duplicate = RecordUpdate::PiaBoard {
            id: board.id,
            serial_number: "PIA-200".into(),
            part_number: String::new(),
            generation_project: String::new(),
            version: String::new(),
        };
        assert!(svc.save_changes(duplicate).await.is_err());

        let ok = RecordUpdate::PiaBoard {
            id: board.id,
            serial_number: "PIA-101".into(),
            part_number: String::new(),
            generation_project: "Gen3".into(),
            version: String::new(),
        };
        svc.save_changes(ok).await.unwrap();
        let updated = manager.queries().find_board_by_serial("PIA-101").await.unwrap().unwrap();
        assert_eq!(updated.part_number, None);
        assert_eq!(updated.generation_project.as_deref(), Some("Gen3"));

        let log_id = manager.queries().test_logs_for_board(board.id).await.unwrap()[0].id;
        let log_edit = RecordUpdate::TestLog {
            id: log_id,
            test_fixture: "".into(),
            pia_serial_number: "PIA-101".into(),
            pia_part_number: "PART-X".into(),
            pmt_serial_number: "".into(),
        };
        svc.save_changes(log_edit).await.unwrap();
        let log = manager.queries().get_test_log(log_id).await.unwrap().unwrap();
        assert_eq!(log.test_fixture, None);
    }

    #[tokio::test]
    async fn delete_requires_confirmation_and_cascades() {
        let manager = seeded().await;
        let mut svc = DatabaseBrowserService::new(manager.clone());
        let board = manager.queries().find_board_by_serial("PIA-100").await.unwrap().unwrap();

        assert!(svc.confirm_delete("not-a-token").await.is_err());

        let confirmation = svc.request_delete(ViewMode::PiaBoards, board.id).await.unwrap();
        assert_eq!(confirmation.impact.test_logs, 2);
        assert_eq!(confirmation.impact.specs, 3);
        assert!(confirmation.message.contains("PCBABoard"));

        let impact = svc.confirm_delete(&confirmation.token).await.unwrap();
        assert_eq!(impact.test_logs, 2);
        assert_eq!(impact.sub_tests, 2);
        assert_eq!(impact.specs, 3);
        assert!(manager.queries().find_board_by_serial("PIA-100").await.unwrap().is_none());
        assert_eq!(manager.queries().spec_names().await.unwrap().len(), 0);

        // 令牌只能用一次
        assert!(svc.confirm_delete(&confirmation.token).await.is_err());
    }

    #[tokio::test]
    async fn deleting_pmt_detaches_test_logs() {
        let manager = seeded().await;
        let mut svc = DatabaseBrowserService::new(manager.clone());
        let pmt = manager.queries().find_pmt_by_serial("PMT-9").await.unwrap().unwrap();

        let confirmation = svc.request_delete(ViewMode::PmtDevices, pmt.id).await.unwrap();
        assert_eq!(confirmation.impact.detached_test_logs, 1);
        assert!(svc.cancel_delete(&confirmation.token));
        assert!(svc.confirm_delete(&confirmation.token).await.is_err());

        let confirmation = svc.request_delete(ViewMode::PmtDevices, pmt.id).await.unwrap();
        svc.confirm_delete(&confirmation.token).await.unwrap();
        assert_eq!(manager.queries().database_stats().await.unwrap().total_test_logs, 3);
        assert_eq!(manager.queries().database_stats().await.unwrap().total_pmts, 0);

        assert!(svc.request_delete(ViewMode::TestLogs, 9999).await.is_err());
    }

    #[tokio::test]
    async fn new_delete_request_supersedes_pending_one() {
        let manager = seeded().await;
        let mut svc = DatabaseBrowserService::new(manager.clone());
        let pmt = manager.queries().find_pmt_by_serial("PMT-9").await.unwrap().unwrap();
        let board = manager.queries().find_board_by_serial("PIA-100").await.unwrap().unwrap();

        // 对话框被关掉而没有取消，随后又发起新的删除
        let first = svc.request_delete(ViewMode::PmtDevices, pmt.id).await.unwrap();
        let again = svc.request_delete(ViewMode::PmtDevices, pmt.id).await.unwrap();
        let board_delete = svc.request_delete(ViewMode::PiaBoards, board.id).await.unwrap();
        assert_ne!(first.token, again.token);
        assert!(matches!(&svc.pending_delete, Some((token, ViewMode::PiaBoards, _)) if *token == board_delete.token));

        assert!(svc.confirm_delete(&first.token).await.is_err());
        assert!(!svc.cancel_delete(&again.token));
        assert!(manager.queries().find_pmt_by_serial("PMT-9").await.unwrap().is_some());

        svc.confirm_delete(&board_delete.token).await.unwrap();
        assert!(svc.pending_delete.is_none());
        assert!(manager.queries().find_board_by_serial("PIA-100").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_detail_and_html() {
        let manager = seeded().await;
        let svc = DatabaseBrowserService::new(manager.clone());
        let board = manager.queries().find_board_by_serial("PIA-100").await.unwrap().unwrap();
        let logs = manager.queries().test_logs_for_board(board.id).await.unwrap();
        let with_html = logs.iter().find(|l| l.has_html).unwrap();

        match svc.record_detail(ViewMode::TestLogs, with_html.id).await.unwrap() {
            RecordDetail::TestLog(detail) => {
                assert_eq!(detail.sub_tests.len(), 1);
                assert_eq!(detail.sub_tests[0].specs.len(), 2);
                assert_eq!(detail.pmt.unwrap().batch_number.as_deref(), Some("B7"));
            }
            _ => panic!("expected test log detail"),
        }
        assert_eq!(svc.html_report(with_html.id).await.unwrap(), "<html>one</html>");
    }

    #[tokio::test]
    async fn database_search_and_export() {
        let svc = DatabaseBrowserService::new(seeded().await);
        assert!(svc.search_database(" ").await.is_err());
        let hits = svc.search_database("benchtop").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].column, "test_fixture");

        let dir = tempfile::tempdir().unwrap();
        let sheets = svc.export_database(&dir.path().join("all.xlsx")).await.unwrap();
        assert_eq!(sheets, 5);
    }
}
