//! 集成测试共用的数据准备

use chrono::{Duration, NaiveDate, NaiveDateTime};

use pcba_viewer_lib::services::infrastructure::{NewSpec, NewTestLog, TestDataGenerator};
use pcba_viewer_lib::services::DatabaseManager;

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid test timestamp")
}

/// 两块板卡、三次测试：PIA00001 测了两次（一次失败），PIA00002 测了一次
pub async fn seeded_database() -> DatabaseManager {
    let manager = DatabaseManager::in_memory().await.expect("in-memory database");
    let conn = manager.connection();

    let logs = vec![
        NewTestLog::new("PIA00001", at(1, 9))
            .part("PIA-100")
            .pmt("PMT00001", "B2401")
            .fixture("Fixture-A")
            .html("<html><body>first run</body></html>")
            .spec(NewSpec::range("Gain", "Gain", 12.5, 9.0, 10.0, 11.0).with_unit("dB"))
            .spec(NewSpec::range("Offset", "Offset", 0.05, -0.1, 0.0, 0.1).with_unit("V")),
        NewTestLog::new("PIA00001", at(2, 9) + Duration::minutes(30))
            .part("PIA-100")
            .pmt("PMT00001", "B2401")
            .fixture("Fixture-B")
            .html("<html><body>second run</body></html>")
            .spec(NewSpec::range("Gain", "Gain", 10.2, 9.0, 10.0, 11.0).with_unit("dB"))
            .spec(NewSpec::range("Offset", "Offset", 0.02, -0.1, 0.0, 0.1).with_unit("V")),
        NewTestLog::new("PIA00002", at(3, 14))
            .part("PIA-200")
            .pmt("PMT00002", "B2402")
            .fixture("Fixture-A")
            .spec(NewSpec::range("Gain", "Gain", 9.8, 9.0, 10.0, 11.0).with_unit("dB")),
    ];
    for log in &logs {
        TestDataGenerator::insert_test_log(conn.as_ref(), log)
            .await
            .expect("insert test log");
    }
    manager
}
