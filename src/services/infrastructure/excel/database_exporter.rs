//! 整库导出与全库字符串搜索
//!
//! 两者都按表逐行读取原始值，不经过实体模型，因此对旧库中多出来的列同样有效。

use std::path::Path;

use log::{error, info, warn};
use rust_xlsxwriter::{Format, Workbook};
use sea_orm::{ConnectionTrait, DatabaseConnection, QueryResult, Statement};

use crate::database_migration::DatabaseMigration;
use crate::models::structs::StringMatch;
use crate::utils::error::AppResult;

/// Excel 工作表名最长 31 个字符
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Excel 单元格最多容纳 32,767 个字符
pub const MAX_CELL_CHARS: usize = 32_767;

/// 从 SQLite 读出的单元格原始值
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl RawValue {
    fn read(row: &QueryResult, idx: usize) -> Self {
        // 依次尝试各存储类型，NULL 在第一次尝试时就得到 None
        if let Ok(v) = row.try_get_by_index::<Option<i64>>(idx) {
            return v.map(RawValue::Integer).unwrap_or(RawValue::Null);
        }
        if let Ok(Some(v)) = row.try_get_by_index::<Option<f64>>(idx) {
            return RawValue::Real(v);
        }
        if let Ok(Some(v)) = row.try_get_by_index::<Option<String>>(idx) {
            return RawValue::Text(v);
        }
        if let Ok(Some(v)) = row.try_get_by_index::<Option<Vec<u8>>>(idx) {
            return RawValue::Blob(v);
        }
        RawValue::Null
    }
}

/// 表内容：列名与逐行原始值
#[derive(Debug, Clone)]
pub struct TableDump {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

/// 截断为合法的工作表名
pub fn sheet_name_for(table: &str) -> String {
    table.chars().take(MAX_SHEET_NAME_LEN).collect()
}

pub struct DatabaseExporter;

impl DatabaseExporter {
    /// 读取所有表的全部行
    pub async fn dump_tables(db: &DatabaseConnection) -> AppResult<Vec<TableDump>> {
        let tables = DatabaseMigration::describe_tables(db).await?;
        let mut dumps = Vec::with_capacity(tables.len());

        for table in tables {
            let sql = format!("SELECT * FROM \"{}\"", table.name);
            let rows = db
                .query_all(Statement::from_string(db.get_database_backend(), sql))
                .await?;
            let rows = rows
                .iter()
                .map(|row| (0..table.columns.len()).map(|idx| RawValue::read(row, idx)).collect())
                .collect();
            dumps.push(TableDump {
                name: table.name,
                columns: table.columns,
                rows,
            });
        }
        Ok(dumps)
    }

    /// 每个非空表写成一个工作表，返回写出的工作表数
    pub async fn export_database_to_excel(db: &DatabaseConnection, excel_path: &Path) -> AppResult<usize> {
        let dumps = Self::dump_tables(db).await?;
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let mut sheets_written = 0;

        for dump in &dumps {
            if dump.rows.is_empty() {
                info!("[EXPORT] 表 '{}' 为空，跳过", dump.name);
                continue;
            }

            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet_name_for(&dump.name))?;
            for (col, column) in dump.columns.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, column, &header_format)?;
            }
            for (r, row) in dump.rows.iter().enumerate() {
                let sheet_row = r as u32 + 1;
                for (c, value) in row.iter().enumerate() {
                    let col = c as u16;
                    match value {
                        RawValue::Null => {}
                        RawValue::Integer(v) => {
                            worksheet.write_number(sheet_row, col, *v as f64)?;
                        }
                        RawValue::Real(v) => {
                            worksheet.write_number(sheet_row, col, *v)?;
                        }
                        RawValue::Text(s) if s.chars().count() > MAX_CELL_CHARS => {
                            warn!(
                                "[EXPORT] 表 '{}' 第 {} 行列 '{}' 超过 {} 个字符，已截断",
                                dump.name,
                                sheet_row,
                                dump.columns.get(c).map(String::as_str).unwrap_or(""),
                                MAX_CELL_CHARS
                            );
                            let truncated: String = s.chars().take(MAX_CELL_CHARS).collect();
                            worksheet.write_string(sheet_row, col, truncated)?;
                        }
                        RawValue::Text(s) => {
                            worksheet.write_string(sheet_row, col, s)?;
                        }
                        RawValue::Blob(bytes) => {
                            worksheet.write_string(sheet_row, col, format!("<{} bytes>", bytes.len()))?;
                        }
                    }
                }
            }
            sheets_written += 1;
            info!("[EXPORT] 已导出 {}/{} 个表: {}", sheets_written, dumps.len(), dump.name);
        }

        workbook.save(excel_path).map_err(|e| {
            error!("[EXPORT] 保存整库导出失败: {}", e);
            e
        })?;
        info!("[EXPORT] 整库导出完成: {}", excel_path.display());
        Ok(sheets_written)
    }

    /// 在每个表的每个文本值中查找子串（不区分大小写）
    pub async fn search_database_for_string(db: &DatabaseConnection, needle: &str) -> AppResult<Vec<StringMatch>> {
        let needle_lower = needle.to_lowercase();
        let mut matches = Vec::new();

        for dump in Self::dump_tables(db).await? {
            for (row_index, row) in dump.rows.iter().enumerate() {
                for (column, value) in dump.columns.iter().zip(row) {
                    if let RawValue::Text(text) = value {
                        if text.to_lowercase().contains(&needle_lower) {
                            matches.push(StringMatch {
                                table: dump.name.clone(),
                                column: column.clone(),
                                row_index,
                                value: text.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::persistence::{DatabaseManager, NewSpec, NewTestLog, TestDataGenerator};
    use calamine::{open_workbook, Reader, Xlsx};
    use chrono::NaiveDate;

    async fn seeded() -> DatabaseManager {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let log = NewTestLog::new("PIA-Alpha", at)
            .part("PART-9")
            .fixture("Plexus")
            .html("<html>alpha</html>")
            .spec(NewSpec::range("Amplifier", "Gain", 10.0, 9.0, 10.0, 11.0));
        TestDataGenerator::insert_test_log(manager.connection().as_ref(), &log)
            .await
            .unwrap();
        manager
    }

    #[test]
    fn sheet_names_are_truncated() {
        let long = "a_table_name_that_is_definitely_longer_than_allowed";
        assert_eq!(sheet_name_for(long).chars().count(), MAX_SHEET_NAME_LEN);
        assert_eq!(sheet_name_for("spec"), "spec");
    }

    #[tokio::test]
    async fn export_skips_empty_tables() {
        let manager = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.xlsx");

        let written = DatabaseExporter::export_database_to_excel(manager.connection().as_ref(), &path)
            .await
            .unwrap();
        // pia_board, test_log, sub_test, spec
        assert_eq!(written, 4);

        let mut wb: Xlsx<_> = open_workbook(&path).unwrap();
        let names = wb.sheet_names().to_vec();
        assert!(names.contains(&"pia_board".to_string()));
        assert!(!names.contains(&"manufacturer".to_string()));

        let range = wb.worksheet_range("pia_board").unwrap().unwrap();
        let header: Vec<String> = range.rows().next().unwrap().iter().map(|c| c.to_string()).collect();
        assert!(header.contains(&"serial_number".to_string()));
        assert_eq!(range.rows().count(), 2);
    }

    #[tokio::test]
    async fn string_search_is_case_insensitive() {
        let manager = seeded().await;
        let matches = DatabaseExporter::search_database_for_string(manager.connection().as_ref(), "pia-alpha")
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].table, "pia_board");
        assert_eq!(matches[0].column, "serial_number");
        assert_eq!(matches[0].row_index, 0);
        assert_eq!(matches[0].value, "PIA-Alpha");

        let html = DatabaseExporter::search_database_for_string(manager.connection().as_ref(), "ALPHA</")
            .await
            .unwrap();
        assert!(html.iter().any(|m| m.table == "test_log" && m.column == "html_content"));
    }

    #[tokio::test]
    async fn oversized_text_cells_are_truncated() {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let html = format!("<html>{}</html>", "x".repeat(40_000));
        let log = NewTestLog::new("PIA-Big", at).html(&html);
        TestDataGenerator::insert_test_log(manager.connection().as_ref(), &log)
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.xlsx");
        let written = DatabaseExporter::export_database_to_excel(manager.connection().as_ref(), &path)
            .await
            .unwrap();
        assert!(written >= 2);

        let mut wb: Xlsx<_> = open_workbook(&path).unwrap();
        let range = wb.worksheet_range("test_log").unwrap().unwrap();
        let mut rows = range.rows();
        let header: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
        let html_col = header.iter().position(|h| h == "html_content").unwrap();
        let cell = rows.next().unwrap()[html_col].to_string();
        assert_eq!(cell.chars().count(), MAX_CELL_CHARS);
        assert!(cell.starts_with("<html>xxx"));
    }
}
