//! 测试日志实体
//!
//! 一次完整的测试运行。由上游测试流程写入，本程序只浏览、编辑夹具信息和删除

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;

use crate::utils::time_utils::now_naive_utc;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub pia_board_id: i32,
    #[sea_orm(nullable)]
    pub pmt_id: Option<i32>,
    #[sea_orm(nullable)]
    pub name: Option<String>,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub generation_project: Option<String>,
    #[sea_orm(nullable)]
    pub script_version: Option<String>,
    #[sea_orm(nullable)]
    pub test_fixture: Option<String>,
    pub created_at: NaiveDateTime,
    #[sea_orm(default_value = false)]
    pub full_test_completed: bool,
    #[sea_orm(default_value = false)]
    pub full_test_passed: bool,
    #[sea_orm(nullable, unique)]
    pub html_path: Option<String>,
    #[sea_orm(column_type = "Text", nullable, unique)]
    #[serde(skip_serializing)]
    pub html_content: Option<String>,       // 内嵌 HTML 报告，列表中不下发
    #[sea_orm(nullable, unique)]
    #[serde(skip_serializing)]
    pub html_hash: Option<Vec<u8>>,         // HTML 的 SHA-256 摘要（32 字节）
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pia_board::Entity",
        from = "Column::PiaBoardId",
        to = "super::pia_board::Column::Id"
    )]
    PiaBoard,
    #[sea_orm(
        belongs_to = "super::pmt_device::Entity",
        from = "Column::PmtId",
        to = "super::pmt_device::Column::Id"
    )]
    PmtDevice,
    #[sea_orm(has_many = "super::sub_test::Entity")]
    SubTest,
}

impl Related<super::pia_board::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PiaBoard.def()
    }
}

impl Related<super::pmt_device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PmtDevice.def()
    }
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
            full_test_completed: Set(false),
            full_test_passed: Set(false),
            ..ActiveModelTrait::default()
        }
    }
}

/// 由各测量项结果汇总整体通过状态
///
/// 没有测量项时不算通过；结果为空（未判定）的测量项不拉低汇总
pub fn rollup_passed<I>(results: I) -> bool
where
    I: IntoIterator<Item = Option<bool>>,
{
    let mut seen = false;
    for result in results {
        seen = true;
        if result == Some(false) {
            return false;
        }
    }
    seen
}
