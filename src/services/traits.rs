//! 服务生命周期
//!
//! 持有外部资源（数据库连接、临时目录）的服务实现该 trait，
//! 应用启动时做健康检查，退出时调用 `shutdown` 释放资源。

use async_trait::async_trait;

use crate::utils::error::AppResult;

#[async_trait]
pub trait BaseService: Send + Sync {
    fn service_name(&self) -> &'static str;

    /// 构造之后的额外准备，默认什么都不做
    async fn initialize(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// 释放资源，默认什么都不做
    async fn shutdown(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// 资源可用时返回 Ok
    async fn health_check(&self) -> AppResult<()>;
}
