mod common;

use calamine::{open_workbook, Reader, Xlsx};
use tempfile::tempdir;

use pcba_viewer_lib::models::report::ReportColumn;
use pcba_viewer_lib::services::ReportGenerationService;
use pcba_viewer_lib::utils::config::ReportConfig;

#[tokio::test]
async fn report_rows_are_capped_per_device_and_exported() {
    let manager = common::seeded_database().await;
    let mut service = ReportGenerationService::new(manager.queries(), ReportConfig::default());

    let mut request = service.default_request(vec!["Gain".to_string()]);
    request.max_tests = 1;
    let table = service.generate_report(request).await.unwrap();

    // 每块板卡只保留最近一次 Gain 测量
    assert_eq!(table.rows.len(), 2);
    let first_board = table.rows.iter().find(|r| r.pia_serial == "PIA00001").unwrap();
    assert_eq!(first_board.measurement, Some(10.2));
    assert_eq!(first_board.passed, Some(true));

    let dir = tempdir().unwrap();
    let path = dir.path().join("gain.xlsx");
    let summary = service.export_to_excel(&path).unwrap();
    assert_eq!(summary.data_rows, 2);

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let sheet = workbook.sheet_names().first().cloned().unwrap();
    let range = workbook.worksheet_range(&sheet).unwrap().unwrap();
    assert!(range.rows().count() >= 3);
}

#[tokio::test]
async fn edits_to_the_table_can_be_reset() {
    let manager = common::seeded_database().await;
    let mut service = ReportGenerationService::new(manager.queries(), ReportConfig::default());
    let request = service.default_request(vec!["Gain".to_string(), "Offset".to_string()]);
    let generated = service.generate_report(request).await.unwrap();
    assert_eq!(generated.rows.len(), 5);

    assert_eq!(service.delete_rows(&[0, 1, 99]), 2);
    service.delete_columns(&[ReportColumn::Unit]).unwrap();
    let edited = service.table();
    assert_eq!(edited.rows.len(), 3);
    assert!(!edited.columns.contains(&ReportColumn::Unit));

    let restored = service.reset().unwrap();
    assert_eq!(restored.rows.len(), 5);
    assert!(restored.columns.contains(&ReportColumn::Unit));
}

#[tokio::test]
async fn report_without_specs_is_rejected() {
    let manager = common::seeded_database().await;
    let mut service = ReportGenerationService::new(manager.queries(), ReportConfig::default());
    let request = service.default_request(Vec::new());
    assert!(service.generate_report(request).await.is_err());
    assert!(service.export_to_excel(std::path::Path::new("unused.xlsx")).is_err());
}
