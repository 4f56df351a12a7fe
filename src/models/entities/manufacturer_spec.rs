//! 厂商提供的单项测量值，spec_name 与本地 Spec.name 对应用于比对

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;

use crate::utils::time_utils::now_naive_utc;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manufacturer_spec")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub manufacturer_id: i32,
    #[sea_orm(nullable)]
    pub device_batch_id: Option<i32>,
    pub spec_name: String,
    #[sea_orm(nullable)]
    pub device_serial: Option<String>,
    #[sea_orm(nullable)]
    pub measurement: Option<f64>,
    #[sea_orm(nullable)]
    pub unit: Option<String>,
    #[sea_orm(nullable)]
    pub lower_limit: Option<f64>,
    #[sea_orm(nullable)]
    pub nominal: Option<f64>,
    #[sea_orm(nullable)]
    pub upper_limit: Option<f64>,
    #[sea_orm(nullable)]
    pub test_date: Option<NaiveDateTime>,
    #[sea_orm(nullable)]
    pub test_conditions: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manufacturer::Entity",
        from = "Column::ManufacturerId",
        to = "super::manufacturer::Column::Id"
    )]
    Manufacturer,
    #[sea_orm(
        belongs_to = "super::manufacturer_device_batch::Entity",
        from = "Column::DeviceBatchId",
        to = "super::manufacturer_device_batch::Column::Id"
    )]
    DeviceBatch,
}

impl Related<super::manufacturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manufacturer.def()
    }
}

impl Related<super::manufacturer_device_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceBatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            created_at: Set(now_naive_utc()),
            ..ActiveModelTrait::default()
        }
    }
}
