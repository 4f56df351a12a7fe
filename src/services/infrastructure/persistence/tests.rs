#[cfg(test)]
mod tests {
    use crate::database_migration::DatabaseMigration;
    use crate::models::entities::{pia_board, test_log};
    use crate::models::enums::{OrderKey, ResultFilter};
    use crate::models::structs::*;
    use crate::services::infrastructure::persistence::*;
    use crate::services::traits::BaseService;
    use crate::utils::error::AppError;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, Set};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    /// 三块板卡、两个夹具、一条失败记录
    async fn seeded() -> DatabaseManager {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();

        let logs = vec![
            NewTestLog::new("PIA-001", at(1, 8))
                .part("P-100")
                .pmt("PMT-A1", "B1")
                .fixture("Plexus")
                .html("<html>one</html>")
                .spec(NewSpec::range("Amp", "Gain", 10.0, 9.0, 10.0, 11.0).with_unit("dB"))
                .spec(NewSpec::range("Amp", "Offset", 0.01, -0.1, 0.0, 0.1)),
            NewTestLog::new("PIA-001", at(5, 8))
                .part("P-100")
                .pmt("PMT-A1", "B1")
                .fixture("Fixture-A")
                .spec(NewSpec::range("Amp", "Gain", 10.4, 9.0, 10.0, 11.0).with_unit("dB")),
            NewTestLog::new("PIA-002", at(3, 8))
                .part("P-200")
                .pmt("PMT-B7", "B2")
                .fixture("Plexus")
                .spec(NewSpec::range("Amp", "Gain", 12.0, 9.0, 10.0, 11.0).with_unit("dB")),
            NewTestLog::new("pia-003", at(4, 8))
                .part("P-100")
                .fixture("Fixture-A")
                .spec(NewSpec::range("Amp", "Gain", 9.5, 9.0, 10.0, 11.0)),
        ];
        for log in &logs {
            TestDataGenerator::insert_test_log(db.as_ref(), log).await.unwrap();
        }
        manager
    }

    #[tokio::test]
    async fn migration_is_idempotent_and_describes_tables() {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();
        DatabaseMigration::migrate(db.as_ref()).await.unwrap();

        let tables = DatabaseMigration::describe_tables(db.as_ref()).await.unwrap();
        let spec_table = tables.iter().find(|t| t.name == "spec").unwrap();
        assert!(spec_table.columns.contains(&"plot_data".to_string()));
        assert_eq!(spec_table.row_count, 0);
        assert!(tables.iter().any(|t| t.name == "manufacturer_spec"));
    }

    #[tokio::test]
    async fn health_check_pings_connection() {
        let mut manager = DatabaseManager::in_memory().await.unwrap();
        manager.initialize().await.unwrap();
        assert!(manager.health_check().await.is_ok());
        assert_eq!(manager.service_name(), "DatabaseManager");
    }

    #[tokio::test]
    async fn find_matching_string_is_case_insensitive_and_newest_first() {
        let manager = seeded().await;
        let q = manager.queries();

        let hits = q.find_matching_string("PIA-00").await.unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let by_pmt = q.find_matching_string("pmt-b7").await.unwrap();
        assert_eq!(by_pmt.len(), 1);
        assert_eq!(by_pmt[0].pia_serial, "PIA-002");
        assert_eq!(by_pmt[0].pmt_batch.as_deref(), Some("B2"));

        let by_batch = q.search_test_logs("b1").await.unwrap();
        assert_eq!(by_batch.len(), 2);
    }

    #[tokio::test]
    async fn list_rows_report_html_presence_without_loading_it() {
        let manager = seeded().await;
        let q = manager.queries();
        let recent = q.get_recent(10).await.unwrap();
        assert_eq!(recent.len(), 4);
        let with_html: Vec<_> = recent.iter().filter(|r| r.has_html).collect();
        assert_eq!(with_html.len(), 1);

        let html = q.get_html_content(with_html[0].id).await.unwrap();
        assert_eq!(html.as_deref(), Some("<html>one</html>"));
        assert_eq!(q.get_html_path(with_html[0].id).await.unwrap(), None);
        assert_eq!(q.get_html_content(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn measurement_filters_narrow_results() {
        let manager = seeded().await;
        let q = manager.queries();

        let all = SpecQueryFilter::for_spec("Gain");
        assert_eq!(q.count_measurements(&all).await.unwrap(), 4);

        let fixture = SpecQueryFilter {
            test_fixture: Some("Plexus".into()),
            ..all.clone()
        };
        assert_eq!(q.count_measurements(&fixture).await.unwrap(), 2);

        let fixture_and_part = SpecQueryFilter {
            pia_part: Some("P-100".into()),
            ..fixture.clone()
        };
        let records = q.measurements(&fixture_and_part).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].board_serial(), "PIA-001");
        assert_eq!(records[0].pmt_serial(), Some("PMT-A1"));
        assert!(records[0].test_log.html_content.is_none());

        let dated = SpecQueryFilter {
            date_from: Some(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()),
            ..all.clone()
        };
        assert_eq!(q.count_measurements(&dated).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn csv_identifiers_compare_upper_case() {
        let manager = seeded().await;
        let q = manager.queries();
        let filter = SpecQueryFilter {
            csv_identifiers: vec!["PIA-003".into(), "pmt-b7".into()],
            ..SpecQueryFilter::for_spec("Gain")
        };
        let records = q.measurements(&filter).await.unwrap();
        let mut serials: Vec<_> = records.iter().map(|r| r.board_serial().to_string()).collect();
        serials.sort();
        assert_eq!(serials, vec!["PIA-002", "pia-003"]);
    }

    #[tokio::test]
    async fn order_keys_sort_results() {
        let manager = seeded().await;
        let q = manager.queries();

        let recent = SpecQueryFilter {
            order_key: Some(OrderKey::Recent),
            ..SpecQueryFilter::for_spec("Gain")
        };
        let records = q.measurements(&recent).await.unwrap();
        assert!(records
            .windows(2)
            .all(|w| w[0].test_log.created_at >= w[1].test_log.created_at));

        let by_serial = SpecQueryFilter {
            order_key: Some(OrderKey::PiaSerialNumber),
            ..SpecQueryFilter::for_spec("Gain")
        };
        let records = q.measurements(&by_serial).await.unwrap();
        assert_eq!(records[0].board_serial(), "PIA-001");
    }

    #[tokio::test]
    async fn pages_cover_the_full_result() {
        let manager = seeded().await;
        let q = manager.queries();
        let filter = SpecQueryFilter::for_spec("Gain");
        let first = q.measurements_page(&filter, 0, 3).await.unwrap();
        let second = q.measurements_page(&filter, 3, 3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 1);
        assert!(first.iter().all(|r| r.spec_id() != second[0].spec_id()));
    }

    #[tokio::test]
    async fn distinct_lists_and_paired_names() {
        let manager = seeded().await;
        let q = manager.queries();
        assert_eq!(q.test_fixtures().await.unwrap(), vec!["Fixture-A", "Plexus"]);
        assert_eq!(q.pmt_batch_numbers().await.unwrap(), vec!["B1", "B2"]);
        assert_eq!(q.spec_names().await.unwrap(), vec!["Gain", "Offset"]);
        assert_eq!(q.paired_spec_names("Gain").await.unwrap(), vec!["Offset"]);
        assert!(q.plot_spec_names().await.unwrap().is_empty());
        assert_eq!(q.board_serial_numbers().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stats_and_passing_boards() {
        let manager = seeded().await;
        let q = manager.queries();

        let stats = q.database_stats().await.unwrap();
        assert_eq!(stats.total_boards, 3);
        assert_eq!(stats.total_pmts, 2);
        assert_eq!(stats.total_test_logs, 4);
        assert_eq!(stats.completed_tests, 4);
        // PIA-002 的 Gain 超出上限
        assert_eq!(stats.passed_tests, 3);

        let passing = q.find_boards_with_all_specs_passing().await.unwrap();
        let serials: Vec<_> = passing.iter().map(|b| b.serial_number.as_str()).collect();
        assert_eq!(serials, vec!["PIA-001", "pia-003"]);

        assert_eq!(q.count_boards_with_full_test().await.unwrap(), 3);
        assert_eq!(q.count_by_location("Plexus").await.unwrap(), ("Plexus".to_string(), 2));
    }

    #[tokio::test]
    async fn board_lookups_and_counts() {
        let manager = seeded().await;
        let q = manager.queries();
        let board = q.find_board_by_serial("PIA-001").await.unwrap().unwrap();
        assert_eq!(q.test_logs_for_board(board.id).await.unwrap().len(), 2);
        assert_eq!(q.find_boards_by_part_number("P-100").await.unwrap().len(), 2);
        assert!(q.find_pmt_by_serial("PMT-B7").await.unwrap().is_some());

        let boards = q.list_boards(None).await.unwrap();
        let first = boards.iter().find(|b| b.board.serial_number == "PIA-001").unwrap();
        assert_eq!(first.test_log_count, 2);
        let pmts = q.list_pmts(Some("a1")).await.unwrap();
        assert_eq!(pmts.len(), 1);
        assert_eq!(pmts[0].test_log_count, 2);
    }

    #[tokio::test]
    async fn test_log_filter_by_result_and_dates() {
        let manager = seeded().await;
        let q = manager.queries();

        let failed = q
            .list_test_logs(&TestLogFilter {
                result: ResultFilter::FailedOnly,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].pia_serial, "PIA-002");

        let early = q
            .list_test_logs(&TestLogFilter {
                date_to: Some(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()),
                search_term: Some("pia".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(early.len(), 2);
    }

    #[tokio::test]
    async fn specs_of_subtest_excludes_outliers_and_old_tests() {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();
        let now = crate::utils::time_utils::now_naive_utc();
        for (serial, gain, age) in [("A", 10.0, 1), ("B", 14.5, 2), ("C", 10.2, 500)] {
            let log = NewTestLog::new(serial, now - Duration::days(age))
                .spec(NewSpec::range("Amp", "Gain", gain, 9.0, 10.0, 11.0));
            TestDataGenerator::insert_test_log(db.as_ref(), &log).await.unwrap();
        }
        let q = manager.queries();

        let grouped = q.specs_of_subtest_from_completed_tests("Amp", false, 0.4, 365).await.unwrap();
        assert_eq!(grouped["Gain"].len(), 2);

        let filtered = q.specs_of_subtest_from_completed_tests("Amp", true, 0.4, 365).await.unwrap();
        assert_eq!(filtered["Gain"].len(), 1);
        assert_eq!(filtered["Gain"][0].measurement, Some(10.0));

        let unbounded = q.specs_of_subtest_from_completed_tests("Amp", false, 0.4, 0).await.unwrap();
        assert_eq!(unbounded["Gain"].len(), 3);
    }

    #[tokio::test]
    async fn test_log_exists_matches_file_digest() {
        let manager = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let known = dir.path().join("known.html");
        let unknown = dir.path().join("unknown.html");
        std::fs::write(&known, "<html>one</html>").unwrap();
        std::fs::write(&unknown, "<html>other</html>").unwrap();

        let (digest, exists) = manager.queries().test_log_exists(&known).await.unwrap();
        assert_eq!(digest.len(), 32);
        assert!(exists);
        let (_, exists) = manager.queries().test_log_exists(&unknown).await.unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let result: Result<(), AppError> = manager
            .transaction(|txn| {
                Box::pin(async move {
                    let mut board = pia_board::ActiveModel::new();
                    board.serial_number = Set("ROLLBACK".to_string());
                    board.insert(txn).await?;
                    Err(AppError::validation_error("中止"))
                })
            })
            .await;
        assert!(result.is_err());
        assert!(manager.queries().find_board_by_serial("ROLLBACK").await.unwrap().is_none());

        manager
            .transaction(|txn| {
                Box::pin(async move {
                    let mut board = pia_board::ActiveModel::new();
                    board.serial_number = Set("COMMIT".to_string());
                    board.insert(txn).await?;
                    Ok(())
                })
            })
            .await
            .unwrap();
        assert!(manager.queries().find_board_by_serial("COMMIT").await.unwrap().is_some());
        assert_eq!(
            test_log::Entity::find().all(manager.connection().as_ref()).await.unwrap().len(),
            0
        );
    }

    #[tokio::test]
    async fn populate_random_writes_every_board() {
        use rand::{rngs::StdRng, SeedableRng};

        let manager = DatabaseManager::in_memory().await.unwrap();
        let db = manager.connection();
        // 在后台任务里生成，随机源需要能跨线程移动
        let written = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(7);
            TestDataGenerator::populate_random(db.as_ref(), &mut rng, 3, 2).await
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(written, 6);

        let q = manager.queries();
        assert_eq!(q.board_serial_numbers().await.unwrap(), vec!["PIA00001", "PIA00002", "PIA00003"]);
        let board = q.find_board_by_serial("PIA00002").await.unwrap().unwrap();
        assert_eq!(q.test_logs_for_board(board.id).await.unwrap().len(), 2);
    }
}
