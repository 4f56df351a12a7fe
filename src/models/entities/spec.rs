//! 测量项（Spec）实体
//!
//! 单个测量值及其上下限、判定结果，可附带曲线数据（plot_data JSON）

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;

use crate::models::enums::MeasurementType;
use crate::models::structs::{PlotPayload, PlotSeries};
use crate::utils::time_utils::now_naive_utc;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "spec")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sub_test_id: i32,
    #[sea_orm(nullable)]
    pub name: Option<String>,
    #[sea_orm(nullable)]
    pub unit: Option<String>,
    pub created_at: NaiveDateTime,
    pub measurement_type: MeasurementType,
    #[sea_orm(nullable)]
    pub measurement: Option<f64>,
    #[sea_orm(nullable)]
    pub has_plot: Option<bool>,
    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub plot_image: Option<Vec<u8>>,
    #[sea_orm(column_type = "Text", nullable)]
    pub plot_data: Option<String>,
    #[sea_orm(nullable)]
    pub lower_limit: Option<f64>,
    #[sea_orm(nullable)]
    pub nominal: Option<f64>,
    #[sea_orm(nullable)]
    pub upper_limit: Option<f64>,
    #[sea_orm(nullable)]
    pub result: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sub_test::Entity",
        from = "Column::SubTestId",
        to = "super::sub_test::Column::Id"
    )]
    SubTest,
}

impl Related<super::sub_test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubTest.def()
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

impl Model {
    /// 解析曲线数据；格式不正确时返回 None
    pub fn plot_series(&self) -> Option<Vec<PlotSeries>> {
        parse_plot_data(self.plot_data.as_deref())
    }
}

/// 解析 plot_data 文本：单条 `{"x":..,"y":..,"label":..}` 或其数组
pub fn parse_plot_data(raw: Option<&str>) -> Option<Vec<PlotSeries>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<PlotPayload>(raw) {
        Ok(payload) => Some(payload.into_series()),
        Err(e) => {
            log::debug!("plot_data 解析失败: {}", e);
            None
        }
    }
}

/// 序列化曲线数据，单条时写成对象
pub fn serialize_plot_data(series: &[PlotSeries]) -> Option<String> {
    let payload = match series {
        [] => return None,
        [single] => PlotPayload::Single(single.clone()),
        many => PlotPayload::Multiple(many.to_vec()),
    };
    serde_json::to_string(&payload).ok()
}
