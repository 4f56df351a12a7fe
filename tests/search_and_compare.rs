mod common;

use std::time::{Duration, SystemTime};

use tempfile::tempdir;

use pcba_viewer_lib::services::application::search_service::{cleanup_temp_dir, CompareSide, SelectionOutcome};
use pcba_viewer_lib::services::SearchService;
use pcba_viewer_lib::utils::config::SearchConfig;

#[tokio::test]
async fn search_then_open_and_export_report() {
    let manager = common::seeded_database().await;
    let temp = tempdir().unwrap();
    let mut service = SearchService::new(manager.queries(), SearchConfig::default(), temp.path().join("tmp")).unwrap();

    service.load_autocomplete().await.unwrap();
    let suggestions = service.suggestions("pia0");
    assert!(suggestions.iter().any(|s| s == "PIA00001"));

    let results = service.search("PIA00001").await.unwrap();
    assert_eq!(results.len(), 2);

    let report = service.load_report(results[0].test_log_id).await.unwrap();
    assert!(report.html.contains("run"));
    assert_eq!(service.recent_reports().len(), 1);

    let out = temp.path().join(service.default_export_name().unwrap());
    service.export_html(&out).await.unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), report.html);
}

#[tokio::test]
async fn compare_mode_fills_left_then_right() {
    let manager = common::seeded_database().await;
    let temp = tempdir().unwrap();
    let mut service = SearchService::new(manager.queries(), SearchConfig::default(), temp.path().to_path_buf()).unwrap();
    let ids: Vec<i32> = service.search("PIA").await.unwrap().iter().map(|r| r.test_log_id).collect();
    assert_eq!(ids.len(), 3);

    service.set_compare_mode(true);
    match service.select_result(ids[0]).await.unwrap() {
        SelectionOutcome::Compare { side, .. } => assert_eq!(side, CompareSide::Left),
        other => panic!("unexpected outcome {:?}", other),
    }
    match service.select_result(ids[1]).await.unwrap() {
        SelectionOutcome::Compare { side, .. } => assert_eq!(side, CompareSide::Right),
        other => panic!("unexpected outcome {:?}", other),
    }

    let page = service.render_comparison().unwrap();
    assert!(page.contains("iframe"));

    // 打开单个报告会退出比较模式
    service.load_report(ids[2]).await.unwrap();
    assert!(!service.compare_mode());
}

#[test]
fn stale_temp_reports_are_removed() {
    let dir = tempdir().unwrap();
    let stale = dir.path().join("pcba_report_old.html");
    let other = dir.path().join("notes.html");
    std::fs::write(&stale, "x").unwrap();
    std::fs::write(&other, "y").unwrap();

    let later = SystemTime::now() + Duration::from_secs(48 * 3600);
    let removed = cleanup_temp_dir(dir.path(), Duration::from_secs(24 * 3600), later).unwrap();
    assert_eq!(removed, 1);
    assert!(!stale.exists());
    assert!(other.exists());
}

#[tokio::test]
async fn shutdown_keeps_fresh_temp_reports() {
    use pcba_viewer_lib::services::BaseService;

    let manager = common::seeded_database().await;
    let temp = tempdir().unwrap();
    let mut service = SearchService::new(manager.queries(), SearchConfig::default(), temp.path().to_path_buf()).unwrap();
    let id = service.search("PIA00002").await.unwrap()[0].test_log_id;
    service.load_report(id).await.unwrap();

    let written = service.write_temp_html().await.unwrap();
    service.health_check().await.unwrap();
    service.shutdown().await.unwrap();
    assert!(written.exists());
}
