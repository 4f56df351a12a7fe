//! PCBA 板卡实体
//!
//! 以序列号唯一标识，一块板卡可以有多条测试日志

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;

use crate::utils::time_utils::now_naive_utc;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pia_board")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub serial_number: String,              // 板卡序列号
    #[sea_orm(nullable)]
    pub part_number: Option<String>,        // 料号
    #[sea_orm(nullable)]
    pub generation_project: Option<String>, // 代次/项目
    #[sea_orm(nullable)]
    pub version: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_log::Entity")]
    TestLog,
}

impl Related<super::test_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        let now = now_naive_utc();
        Self {
            created_at: Set(now),
            updated_at: Set(now),
            ..ActiveModelTrait::default()
        }
    }

    fn before_save<'life0, 'async_trait, C>(
        mut self,
        _db: &'life0 C,
        _insert: bool,
    ) -> core::pin::Pin<Box<dyn core::future::Future<Output = Result<Self, DbErr>> + core::marker::Send + 'async_trait>>
    where
        'life0: 'async_trait,
        C: 'async_trait + ConnectionTrait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            self.updated_at = Set(now_naive_utc());
            Ok(self)
        })
    }
}
