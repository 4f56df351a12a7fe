//! # 核心枚举定义模块
//!
//! 测量类型、查询排序键、浏览页视图模式等在多个服务之间共享的枚举。
//! `MeasurementType` 以名称（RANGE、BOOLEAN...）存入数据库，与已有数据库文件保持兼容。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 测量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum MeasurementType {
    #[sea_orm(string_value = "RANGE")]
    Range,
    #[sea_orm(string_value = "BOOLEAN")]
    Boolean,
    #[sea_orm(string_value = "PLOT")]
    Plot,
    #[sea_orm(string_value = "INT")]
    Int,
    #[sea_orm(string_value = "FLOAT")]
    Float,
}

impl Default for MeasurementType {
    fn default() -> Self {
        MeasurementType::Float
    }
}

/// 测量查询排序键，显示文本即界面下拉框中的选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKey {
    #[serde(rename = "PIA Serial Number")]
    PiaSerialNumber,
    #[serde(rename = "PIA Part Number")]
    PiaPartNumber,
    #[serde(rename = "PMT Serial Number")]
    PmtSerialNumber,
    #[serde(rename = "Recent")]
    Recent,
    #[serde(rename = "Test Name")]
    TestName,
    #[serde(rename = "Test Fixture")]
    TestFixture,
    #[serde(rename = "PMT Generation")]
    PmtGeneration,
    #[serde(rename = "PMT Batch")]
    PmtBatch,
}

impl OrderKey {
    pub const ALL: [OrderKey; 8] = [
        OrderKey::PiaSerialNumber,
        OrderKey::PiaPartNumber,
        OrderKey::PmtSerialNumber,
        OrderKey::Recent,
        OrderKey::TestName,
        OrderKey::TestFixture,
        OrderKey::PmtGeneration,
        OrderKey::PmtBatch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderKey::PiaSerialNumber => "PIA Serial Number",
            OrderKey::PiaPartNumber => "PIA Part Number",
            OrderKey::PmtSerialNumber => "PMT Serial Number",
            OrderKey::Recent => "Recent",
            OrderKey::TestName => "Test Name",
            OrderKey::TestFixture => "Test Fixture",
            OrderKey::PmtGeneration => "PMT Generation",
            OrderKey::PmtBatch => "PMT Batch",
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderKey::ALL
            .iter()
            .copied()
            .find(|k| k.label() == s)
            .ok_or_else(|| format!("未知的排序键: {}", s))
    }
}

/// 数据库浏览页的视图模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    #[serde(rename = "Test Logs")]
    TestLogs,
    #[serde(rename = "PIA Boards")]
    PiaBoards,
    #[serde(rename = "PMT Devices")]
    PmtDevices,
    #[serde(rename = "Manufacturers")]
    Manufacturers,
}

/// 测试日志结果过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResultFilter {
    #[default]
    #[serde(rename = "All")]
    All,
    #[serde(rename = "Passed Only")]
    PassedOnly,
    #[serde(rename = "Failed Only")]
    FailedOnly,
}

/// 每个设备保留哪些测试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestSelection {
    #[default]
    All,
    First,
    Last,
}

/// 厂商导入文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    /// 单工作表
    #[default]
    Simple,
    /// Manufacturers / Batches / Specs 三个工作表
    Detailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveEnum;

    #[test]
    fn measurement_type_is_stored_by_name() {
        assert_eq!(MeasurementType::Range.to_value(), "RANGE");
        assert_eq!(MeasurementType::Plot.to_value(), "PLOT");
        assert_eq!(
            MeasurementType::try_from_value(&"BOOLEAN".to_string()).unwrap(),
            MeasurementType::Boolean
        );
    }

    #[test]
    fn order_key_round_trips_through_label() {
        for key in OrderKey::ALL {
            assert_eq!(key.label().parse::<OrderKey>().unwrap(), key);
        }
        assert!("Newest".parse::<OrderKey>().is_err());
        let json = serde_json::to_string(&OrderKey::Recent).unwrap();
        assert_eq!(json, "\"Recent\"");
    }
}
