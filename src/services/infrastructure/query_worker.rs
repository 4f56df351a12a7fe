//! 后台查询工作者
//!
//! 在独立任务中执行测量查询，通过 mpsc 通道报告进度：
//! 先执行计数查询发出 `Started`，之后按批读取，每读到一行发出一次 `Progress`，
//! 最后发出且只发出一个终止事件（`Finished` 或 `Failed`）。
//! 取消后停止读取，以已读到的行结束。

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::persistence::Queries;
use crate::models::structs::{MeasurementRecord, SpecQueryFilter};
use crate::utils::error::{AppError, AppResult};

/// 查询过程中的事件
#[derive(Debug, Clone)]
pub enum QueryEvent {
    Started { total: u64 },
    Progress { done: u64, total: u64 },
    Finished(Vec<MeasurementRecord>),
    Failed(String),
}

impl QueryEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryEvent::Finished(_) | QueryEvent::Failed(_))
    }
}

/// 测量数据来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    async fn count(&self, filter: &SpecQueryFilter) -> AppResult<u64>;

    async fn fetch_page(&self, filter: &SpecQueryFilter, offset: u64, limit: u64) -> AppResult<Vec<MeasurementRecord>>;
}

#[async_trait]
impl MeasurementSource for Queries {
    async fn count(&self, filter: &SpecQueryFilter) -> AppResult<u64> {
        self.count_measurements(filter).await
    }

    async fn fetch_page(&self, filter: &SpecQueryFilter, offset: u64, limit: u64) -> AppResult<Vec<MeasurementRecord>> {
        self.measurements_page(filter, offset, limit).await
    }
}

/// 执行一次查询，事件写入 `events`
///
/// 接收端被丢弃时视同取消
pub async fn run_query(
    source: Arc<dyn MeasurementSource>,
    filter: SpecQueryFilter,
    batch_size: u64,
    token: CancellationToken,
    events: mpsc::UnboundedSender<QueryEvent>,
) {
    let terminal = match collect_rows(source.as_ref(), &filter, batch_size.max(1), &token, &events).await {
        Ok(records) => {
            log::info!("[QUERY] 查询完成，共 {} 行", records.len());
            QueryEvent::Finished(records)
        }
        Err(e) => {
            crate::log_query_failure!("测量查询: {}", e);
            QueryEvent::Failed(e.to_string())
        }
    };
    let _ = events.send(terminal);
}

async fn collect_rows(
    source: &dyn MeasurementSource,
    filter: &SpecQueryFilter,
    batch_size: u64,
    token: &CancellationToken,
    events: &mpsc::UnboundedSender<QueryEvent>,
) -> AppResult<Vec<MeasurementRecord>> {
    let total = source.count(filter).await?;
    let _ = events.send(QueryEvent::Started { total });

    let mut records = Vec::with_capacity(total as usize);
    let mut offset = 0u64;

    'pages: while offset < total {
        if token.is_cancelled() {
            break;
        }
        let page = tokio::select! {
            _ = token.cancelled() => break 'pages,
            page = source.fetch_page(filter, offset, batch_size) => page?,
        };
        if page.is_empty() {
            // 计数之后数据被删除
            break;
        }
        offset += page.len() as u64;

        for record in page {
            if token.is_cancelled() {
                break 'pages;
            }
            records.push(record);
            let progress = QueryEvent::Progress { done: records.len() as u64, total };
            if events.send(progress).is_err() {
                token.cancel();
                break 'pages;
            }
        }
    }

    if token.is_cancelled() {
        log::info!("[QUERY] 查询已取消，保留已读取的 {} 行", records.len());
    }
    Ok(records)
}

struct RunningQuery {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// 查询调度者：同一时间最多一个查询，启动新查询时取消上一个
pub struct QueryRunner {
    source: Arc<dyn MeasurementSource>,
    batch_size: u64,
    current: Mutex<Option<RunningQuery>>,
}

impl QueryRunner {
    pub fn new(source: Arc<dyn MeasurementSource>, batch_size: u64) -> Self {
        Self {
            source,
            batch_size,
            current: Mutex::new(None),
        }
    }

    /// 启动查询并返回事件接收端
    pub fn start(&self, filter: SpecQueryFilter) -> mpsc::UnboundedReceiver<QueryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.take() {
            log::debug!("[QUERY] 新查询开始，取消上一个查询");
            previous.token.cancel();
        }

        let handle = tokio::spawn(run_query(
            self.source.clone(),
            filter,
            self.batch_size,
            token.clone(),
            tx,
        ));
        *current = Some(RunningQuery { token, handle });
        rx
    }

    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(running) = current.as_ref() {
            running.token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.as_ref().map_or(false, |r| !r.handle.is_finished())
    }

    /// 启动查询并等待终止事件；进度回调接收 (done, total)
    pub async fn run<F>(&self, filter: SpecQueryFilter, mut on_progress: F) -> AppResult<Vec<MeasurementRecord>>
    where
        F: FnMut(u64, u64) + Send,
    {
        let mut rx = self.start(filter);
        while let Some(event) = rx.recv().await {
            match event {
                QueryEvent::Started { total } => on_progress(0, total),
                QueryEvent::Progress { done, total } => on_progress(done, total),
                QueryEvent::Finished(records) => return Ok(records),
                QueryEvent::Failed(message) => return Err(AppError::persistence_error(message)),
            }
        }
        Err(AppError::cancelled("测量查询"))
    }
}

impl Drop for QueryRunner {
    fn drop(&mut self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(running) = current.take() {
                running.token.cancel();
            }
        }
    }
}
