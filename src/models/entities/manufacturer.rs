//! 厂商实体：供应商提供的参考测量数据归属于厂商

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;

use crate::utils::time_utils::now_naive_utc;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manufacturer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub contact_info: Option<String>,
    #[sea_orm(nullable)]
    pub website: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::manufacturer_device_batch::Entity")]
    DeviceBatch,
    #[sea_orm(has_many = "super::manufacturer_spec::Entity")]
    Spec,
}

impl Related<super::manufacturer_device_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceBatch.def()
    }
}

impl Related<super::manufacturer_spec::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Spec.def()
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
