/// 厂商参考数据导入
///
/// 支持两种 Excel 布局：
/// - 简单格式：单个工作表，每行一条厂商测量值
/// - 详细格式：`Manufacturers`、`Batches`、`Specs` 三个工作表
///
/// 单行出错只记警告并继续，整体失败才写入 errors。
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::NaiveDateTime;
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};

use crate::models::entities::{manufacturer, manufacturer_device_batch, manufacturer_spec};
use crate::models::enums::ImportFormat;
use crate::models::structs::ImportResult;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

/// 简单格式的列（模板列顺序）
pub const SIMPLE_COLUMNS: [&str; 12] = [
    "manufacturer_name",
    "batch_number",
    "device_type",
    "device_serial",
    "spec_name",
    "measurement",
    "unit",
    "lower_limit",
    "nominal",
    "upper_limit",
    "test_date",
    "notes",
];

/// 简单格式必需的列
pub const REQUIRED_SIMPLE_COLUMNS: [&str; 3] = ["manufacturer_name", "spec_name", "measurement"];

pub const MANUFACTURERS_SHEET: &str = "Manufacturers";
pub const BATCHES_SHEET: &str = "Batches";
pub const SPECS_SHEET: &str = "Specs";

const MANUFACTURER_COLUMNS: [&str; 4] = ["name", "description", "contact_info", "website"];
const BATCH_COLUMNS: [&str; 4] = ["manufacturer_name", "batch_number", "device_type", "notes"];
const SPEC_COLUMNS: [&str; 11] = [
    "manufacturer_name",
    "batch_number",
    "device_serial",
    "spec_name",
    "measurement",
    "unit",
    "lower_limit",
    "nominal",
    "upper_limit",
    "test_date",
    "notes",
];

/// 按表头名访问的工作表内容
#[derive(Debug, Default)]
struct SheetTable {
    headers: Vec<String>,
    rows: Vec<Vec<DataType>>,
}

impl SheetTable {
    fn from_range(range: &calamine::Range<DataType>) -> Self {
        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
            .unwrap_or_default();
        // 整行为空的行不计入
        let rows = rows
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .map(|row| row.to_vec())
            .collect();
        Self { headers, rows }
    }

    fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    fn cell<'a>(&self, row: &'a [DataType], column: &str) -> Option<&'a DataType> {
        let idx = self.headers.iter().position(|h| h == column)?;
        match row.get(idx) {
            None | Some(DataType::Empty) => None,
            Some(DataType::String(s)) if s.trim().is_empty() => None,
            Some(cell) => Some(cell),
        }
    }

    fn text(&self, row: &[DataType], column: &str) -> Option<String> {
        self.cell(row, column).map(cell_text).filter(|s| !s.is_empty())
    }

    fn number(&self, row: &[DataType], column: &str) -> Result<Option<f64>, String> {
        match self.cell(row, column) {
            None => Ok(None),
            Some(DataType::Float(v)) | Some(DataType::DateTime(v)) => Ok(Some(*v)),
            Some(DataType::Int(v)) => Ok(Some(*v as f64)),
            Some(DataType::Bool(b)) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            Some(other) => {
                let text = cell_text(other);
                text.parse::<f64>()
                    .map(Some)
                    .map_err(|_| format!("could not convert string to float: '{}'", text))
            }
        }
    }

    fn date(&self, row: &[DataType], column: &str) -> Result<Option<NaiveDateTime>, ()> {
        match self.cell(row, column) {
            None => Ok(None),
            Some(DataType::DateTime(serial)) | Some(DataType::Float(serial)) => {
                time_utils::from_excel_serial(*serial).map(Some).ok_or(())
            }
            Some(DataType::Int(serial)) => time_utils::from_excel_serial(*serial as f64).map(Some).ok_or(()),
            Some(other) => time_utils::parse_datetime_text(&cell_text(other)).map(Some).ok_or(()),
        }
    }
}

/// 单元格文本；整数值的浮点数不带小数部分
fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn open_xlsx(file_path: &Path) -> AppResult<Xlsx<std::io::BufReader<std::fs::File>>> {
    if !file_path.exists() {
        return Err(AppError::validation_error(format!("文件不存在: {}", file_path.display())));
    }
    open_workbook(file_path).map_err(|e| AppError::excel_error(format!("无法打开Excel文件: {}", e)))
}

fn read_sheet(workbook: &mut Xlsx<std::io::BufReader<std::fs::File>>, sheet_name: &str) -> AppResult<SheetTable> {
    match workbook.worksheet_range(sheet_name) {
        Some(Ok(range)) => Ok(SheetTable::from_range(&range)),
        Some(Err(e)) => Err(AppError::excel_error(format!("无法读取工作表 {}: {}", sheet_name, e))),
        None => Err(AppError::not_found_error("Worksheet", sheet_name.to_string())),
    }
}

/// 厂商数据导入器
pub struct ManufacturerImporter {
    db: Arc<DatabaseConnection>,
}

impl ManufacturerImporter {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 导入 Excel 文件，失败信息都放在返回结果里
    pub async fn import_from_excel(&self, file_path: &Path, format: ImportFormat) -> ImportResult {
        info!("[IMPORT] 开始导入厂商数据: {} ({:?})", file_path.display(), format);
        let mut result = ImportResult::new();

        let outcome = match format {
            ImportFormat::Simple => self.import_simple_format(file_path, &mut result).await,
            ImportFormat::Detailed => self.import_detailed_format(file_path, &mut result).await,
        };
        if let Err(e) = outcome {
            result.fail(format!("Import failed: {}", e));
        }

        info!(
            "[IMPORT] 导入结束: 厂商 {}, 批次 {}, 测量项 {}, 警告 {}, 错误 {}",
            result.manufacturers_added,
            result.batches_added,
            result.specs_added,
            result.warnings.len(),
            result.errors.len()
        );
        result
    }

    async fn import_simple_format(&self, file_path: &Path, result: &mut ImportResult) -> AppResult<()> {
        let mut workbook = open_xlsx(file_path)?;
        let first_sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::excel_error("Excel文件中没有工作表"))?;
        let table = read_sheet(&mut workbook, &first_sheet)?;

        let missing: Vec<&str> = REQUIRED_SIMPLE_COLUMNS
            .iter()
            .copied()
            .filter(|c| !table.has_column(c))
            .collect();
        if !missing.is_empty() {
            result.fail(format!("Missing required columns: {:?}", missing));
            return Ok(());
        }

        let txn = self.db.begin().await?;
        let mut manufacturers: HashMap<String, manufacturer::Model> = HashMap::new();
        let mut batches: HashMap<(String, String), manufacturer_device_batch::Model> = HashMap::new();

        for (idx, row) in table.rows.iter().enumerate() {
            // 与表格中看到的行号一致：表头占第 1 行
            let row_number = idx + 2;
            if let Err(e) =
                Self::import_simple_row(&txn, &table, row, row_number, &mut manufacturers, &mut batches, result).await
            {
                warn!("[IMPORT] 第{}行导入失败: {}", row_number, e);
                result.warnings.push(format!("Row {}: {}", row_number, e));
            }
        }

        txn.commit().await?;
        Ok(())
    }

    async fn import_simple_row(
        txn: &DatabaseTransaction,
        table: &SheetTable,
        row: &[DataType],
        row_number: usize,
        manufacturers: &mut HashMap<String, manufacturer::Model>,
        batches: &mut HashMap<(String, String), manufacturer_device_batch::Model>,
        result: &mut ImportResult,
    ) -> Result<(), String> {
        let mfr_name = table
            .text(row, "manufacturer_name")
            .ok_or_else(|| "manufacturer_name is empty".to_string())?;
        let spec_name = table
            .text(row, "spec_name")
            .ok_or_else(|| "spec_name is empty".to_string())?;

        if !manufacturers.contains_key(&mfr_name) {
            let (mfr, created) = get_or_create_manufacturer(txn, &mfr_name).await.map_err(|e| e.to_string())?;
            if created {
                result.manufacturers_added += 1;
            }
            manufacturers.insert(mfr_name.clone(), mfr);
        }
        let manufacturer_id = manufacturers[&mfr_name].id;

        let mut device_batch_id = None;
        if let Some(batch_number) = table.text(row, "batch_number") {
            let key = (mfr_name.clone(), batch_number.clone());
            if !batches.contains_key(&key) {
                let existing = manufacturer_device_batch::Entity::find()
                    .filter(manufacturer_device_batch::Column::ManufacturerId.eq(manufacturer_id))
                    .filter(manufacturer_device_batch::Column::BatchNumber.eq(batch_number.as_str()))
                    .one(txn)
                    .await
                    .map_err(|e| e.to_string())?;
                let batch = match existing {
                    Some(batch) => batch,
                    None => {
                        let mut batch = manufacturer_device_batch::ActiveModel::new();
                        batch.manufacturer_id = Set(manufacturer_id);
                        batch.batch_number = Set(batch_number.clone());
                        batch.device_type = Set(table.text(row, "device_type"));
                        let batch = batch.insert(txn).await.map_err(|e| e.to_string())?;
                        result.batches_added += 1;
                        batch
                    }
                };
                batches.insert(key.clone(), batch);
            }
            device_batch_id = Some(batches[&key].id);
        }

        let mut spec = manufacturer_spec::ActiveModel::new();
        spec.manufacturer_id = Set(manufacturer_id);
        spec.device_batch_id = Set(device_batch_id);
        spec.spec_name = Set(spec_name);
        spec.device_serial = Set(table.text(row, "device_serial"));
        spec.measurement = Set(table.number(row, "measurement")?);
        spec.unit = Set(table.text(row, "unit"));
        spec.lower_limit = Set(table.number(row, "lower_limit")?);
        spec.nominal = Set(table.number(row, "nominal")?);
        spec.upper_limit = Set(table.number(row, "upper_limit")?);
        spec.notes = Set(table.text(row, "notes"));
        match table.date(row, "test_date") {
            Ok(date) => spec.test_date = Set(date),
            Err(()) => result
                .warnings
                .push(format!("Row {}: Could not parse test_date", row_number)),
        }

        spec.insert(txn).await.map_err(|e| e.to_string())?;
        result.specs_added += 1;
        Ok(())
    }

    async fn import_detailed_format(&self, file_path: &Path, result: &mut ImportResult) -> AppResult<()> {
        let mut workbook = open_xlsx(file_path)?;
        let sheet_names = workbook.sheet_names().to_vec();
        let has_sheet = |name: &str| sheet_names.iter().any(|s| s == name);

        let txn = self.db.begin().await?;

        if has_sheet(MANUFACTURERS_SHEET) {
            let table = read_sheet(&mut workbook, MANUFACTURERS_SHEET)?;
            for row in &table.rows {
                let Some(name) = table.text(row, "name") else {
                    continue;
                };
                let mut mfr = manufacturer::ActiveModel::new();
                mfr.name = Set(name);
                mfr.description = Set(table.text(row, "description"));
                mfr.contact_info = Set(table.text(row, "contact_info"));
                mfr.website = Set(table.text(row, "website"));
                mfr.insert(&txn).await?;
                result.manufacturers_added += 1;
            }
        }

        if has_sheet(BATCHES_SHEET) {
            let table = read_sheet(&mut workbook, BATCHES_SHEET)?;
            for row in &table.rows {
                let Some(mfr_name) = table.text(row, "manufacturer_name") else {
                    continue;
                };
                let Some(mfr) = find_manufacturer(&txn, &mfr_name).await? else {
                    continue;
                };
                let Some(batch_number) = table.text(row, "batch_number") else {
                    continue;
                };
                let mut batch = manufacturer_device_batch::ActiveModel::new();
                batch.manufacturer_id = Set(mfr.id);
                batch.batch_number = Set(batch_number);
                batch.device_type = Set(table.text(row, "device_type"));
                batch.notes = Set(table.text(row, "notes"));
                batch.insert(&txn).await?;
                result.batches_added += 1;
            }
        }

        if has_sheet(SPECS_SHEET) {
            let table = read_sheet(&mut workbook, SPECS_SHEET)?;
            for (idx, row) in table.rows.iter().enumerate() {
                let row_number = idx + 2;
                match Self::import_detailed_spec_row(&txn, &table, row).await {
                    Ok(true) => result.specs_added += 1,
                    Ok(false) => result
                        .warnings
                        .push(format!("Specs row {}: Manufacturer not found", row_number)),
                    Err(e) => {
                        warn!("[IMPORT] Specs 第{}行导入失败: {}", row_number, e);
                        result.warnings.push(format!("Specs row {}: {}", row_number, e));
                    }
                }
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// 厂商不存在时返回 Ok(false)
    async fn import_detailed_spec_row(
        txn: &DatabaseTransaction,
        table: &SheetTable,
        row: &[DataType],
    ) -> Result<bool, String> {
        let mfr_name = table.text(row, "manufacturer_name").unwrap_or_default();
        let Some(mfr) = find_manufacturer(txn, &mfr_name).await.map_err(|e| e.to_string())? else {
            return Ok(false);
        };
        let spec_name = table
            .text(row, "spec_name")
            .ok_or_else(|| "spec_name is empty".to_string())?;

        let mut device_batch_id = None;
        if let Some(batch_number) = table.text(row, "batch_number") {
            device_batch_id = manufacturer_device_batch::Entity::find()
                .filter(manufacturer_device_batch::Column::ManufacturerId.eq(mfr.id))
                .filter(manufacturer_device_batch::Column::BatchNumber.eq(batch_number))
                .one(txn)
                .await
                .map_err(|e| e.to_string())?
                .map(|b| b.id);
        }

        let mut spec = manufacturer_spec::ActiveModel::new();
        spec.manufacturer_id = Set(mfr.id);
        spec.device_batch_id = Set(device_batch_id);
        spec.spec_name = Set(spec_name);
        spec.device_serial = Set(table.text(row, "device_serial"));
        spec.measurement = Set(table.number(row, "measurement")?);
        spec.unit = Set(table.text(row, "unit"));
        spec.lower_limit = Set(table.number(row, "lower_limit")?);
        spec.nominal = Set(table.number(row, "nominal")?);
        spec.upper_limit = Set(table.number(row, "upper_limit")?);
        spec.test_date = Set(table.date(row, "test_date").ok().flatten());
        spec.notes = Set(table.text(row, "notes"));
        spec.insert(txn).await.map_err(|e| e.to_string())?;
        Ok(true)
    }

    /// 导出空白导入模板
    pub fn export_template(file_path: &Path, format: ImportFormat) -> AppResult<()> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let sheets: Vec<(&str, &[&str])> = match format {
            ImportFormat::Simple => vec![("Sheet1", &SIMPLE_COLUMNS[..])],
            ImportFormat::Detailed => vec![
                (MANUFACTURERS_SHEET, &MANUFACTURER_COLUMNS[..]),
                (BATCHES_SHEET, &BATCH_COLUMNS[..]),
                (SPECS_SHEET, &SPEC_COLUMNS[..]),
            ],
        };

        for (sheet_name, columns) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet_name)?;
            for (col, header) in columns.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
                worksheet.set_column_width(col as u16, 16)?;
            }
        }

        workbook.save(file_path)?;
        info!("[EXPORT] 导入模板已保存: {}", file_path.display());
        Ok(())
    }
}

async fn find_manufacturer(txn: &DatabaseTransaction, name: &str) -> AppResult<Option<manufacturer::Model>> {
    Ok(manufacturer::Entity::find()
        .filter(manufacturer::Column::Name.eq(name))
        .one(txn)
        .await?)
}

/// 返回厂商以及是否新建
async fn get_or_create_manufacturer(
    txn: &DatabaseTransaction,
    name: &str,
) -> AppResult<(manufacturer::Model, bool)> {
    if let Some(mfr) = find_manufacturer(txn, name).await? {
        return Ok((mfr, false));
    }
    let mut mfr = manufacturer::ActiveModel::new();
    mfr.name = Set(name.to_string());
    Ok((mfr.insert(txn).await?, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::persistence::DatabaseManager;
    use sea_orm::PaginatorTrait;
    use tempfile::tempdir;

    fn write_sheet(workbook: &mut Workbook, name: &str, rows: &[Vec<&str>]) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                // 数字写成数值单元格
                match value.parse::<f64>() {
                    Ok(v) if r > 0 => sheet.write_number(r as u32, c as u16, v).unwrap(),
                    _ => sheet.write_string(r as u32, c as u16, *value).unwrap(),
                };
            }
        }
    }

    #[tokio::test]
    async fn simple_format_creates_and_reuses_manufacturers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("simple.xlsx");
        let mut wb = Workbook::new();
        write_sheet(
            &mut wb,
            "Sheet1",
            &[
                vec!["manufacturer_name", "batch_number", "device_serial", "spec_name", "measurement", "unit", "test_date"],
                vec!["Hamamatsu", "B1", "PIA-001", "Gain", "10.1", "dB", "2024-01-05"],
                vec!["Hamamatsu", "B1", "PIA-002", "Gain", "9.9", "dB", "not a date"],
                vec!["ET Enterprises", "", "PIA-003", "Gain", "abc", "", ""],
                vec!["ET Enterprises", "", "PIA-004", "Offset", "0.02", "V", ""],
            ],
        );
        wb.save(&path).unwrap();

        let manager = DatabaseManager::in_memory().await.unwrap();
        let importer = ManufacturerImporter::new(manager.connection());
        let result = importer.import_from_excel(&path, ImportFormat::Simple).await;

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.manufacturers_added, 2);
        assert_eq!(result.batches_added, 1);
        assert_eq!(result.specs_added, 3);
        assert!(result.warnings.contains(&"Row 3: Could not parse test_date".to_string()));
        assert!(result.warnings.iter().any(|w| w.starts_with("Row 4:")));

        let specs = manufacturer_spec::Entity::find().all(manager.connection().as_ref()).await.unwrap();
        let first = specs.iter().find(|s| s.device_serial.as_deref() == Some("PIA-001")).unwrap();
        assert_eq!(first.measurement, Some(10.1));
        assert_eq!(first.test_date.unwrap().to_string(), "2024-01-05 00:00:00");
        assert!(first.device_batch_id.is_some());

        // 再次导入时厂商和批次复用
        let again = importer.import_from_excel(&path, ImportFormat::Simple).await;
        assert_eq!(again.manufacturers_added, 0);
        assert_eq!(again.batches_added, 0);
        assert_eq!(again.specs_added, 3);
    }

    #[tokio::test]
    async fn simple_format_reports_missing_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        let mut wb = Workbook::new();
        write_sheet(&mut wb, "Sheet1", &[vec!["manufacturer_name", "unit"], vec!["Acme", "V"]]);
        wb.save(&path).unwrap();

        let manager = DatabaseManager::in_memory().await.unwrap();
        let result = ManufacturerImporter::new(manager.connection())
            .import_from_excel(&path, ImportFormat::Simple)
            .await;

        assert!(!result.success);
        assert_eq!(result.errors, vec![r#"Missing required columns: ["spec_name", "measurement"]"#.to_string()]);
        assert_eq!(result.specs_added, 0);
    }

    #[tokio::test]
    async fn missing_file_fails_the_import() {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let result = ManufacturerImporter::new(manager.connection())
            .import_from_excel(Path::new("/nonexistent/file.xlsx"), ImportFormat::Detailed)
            .await;
        assert!(!result.success);
        assert!(result.errors[0].starts_with("Import failed:"));
    }

    #[tokio::test]
    async fn detailed_format_reads_three_sheets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("detailed.xlsx");
        let mut wb = Workbook::new();
        write_sheet(
            &mut wb,
            MANUFACTURERS_SHEET,
            &[
                MANUFACTURER_COLUMNS.to_vec(),
                vec!["Hamamatsu", "PMT vendor", "sales@example.com", "https://example.com"],
            ],
        );
        write_sheet(
            &mut wb,
            BATCHES_SHEET,
            &[BATCH_COLUMNS.to_vec(), vec!["Hamamatsu", "LOT-7", "PMT", ""], vec!["Nobody", "LOT-8", "", ""]],
        );
        write_sheet(
            &mut wb,
            SPECS_SHEET,
            &[
                SPEC_COLUMNS.to_vec(),
                vec!["Hamamatsu", "LOT-7", "PMT-1", "Gain", "1.5", "", "1", "1.5", "2", "", ""],
                vec!["Unknown Co", "", "PMT-2", "Gain", "1.4", "", "", "", "", "", ""],
            ],
        );
        wb.save(&path).unwrap();

        let manager = DatabaseManager::in_memory().await.unwrap();
        let result = ManufacturerImporter::new(manager.connection())
            .import_from_excel(&path, ImportFormat::Detailed)
            .await;

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.manufacturers_added, 1);
        assert_eq!(result.batches_added, 1);
        assert_eq!(result.specs_added, 1);
        assert_eq!(result.warnings, vec!["Specs row 3: Manufacturer not found".to_string()]);

        let db = manager.connection();
        let mfr = manufacturer::Entity::find().one(db.as_ref()).await.unwrap().unwrap();
        assert_eq!(mfr.website.as_deref(), Some("https://example.com"));
        let spec = manufacturer_spec::Entity::find().one(db.as_ref()).await.unwrap().unwrap();
        assert!(spec.device_batch_id.is_some());
        assert_eq!(spec.upper_limit, Some(2.0));
        assert_eq!(manufacturer_device_batch::Entity::find().count(db.as_ref()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn templates_have_expected_headers() {
        let dir = tempdir().unwrap();
        let simple = dir.path().join("simple_template.xlsx");
        let detailed = dir.path().join("detailed_template.xlsx");
        ManufacturerImporter::export_template(&simple, ImportFormat::Simple).unwrap();
        ManufacturerImporter::export_template(&detailed, ImportFormat::Detailed).unwrap();

        let mut wb: Xlsx<_> = open_workbook(&simple).unwrap();
        let sheet = wb.sheet_names()[0].clone();
        let table = read_sheet(&mut wb, &sheet).unwrap();
        assert_eq!(table.headers, SIMPLE_COLUMNS.to_vec());
        assert!(table.rows.is_empty());

        let wb: Xlsx<_> = open_workbook(&detailed).unwrap();
        assert_eq!(wb.sheet_names().to_vec(), vec![MANUFACTURERS_SHEET, BATCHES_SHEET, SPECS_SHEET]);

        // 空模板导入不产生任何数据
        let manager = DatabaseManager::in_memory().await.unwrap();
        let result = ManufacturerImporter::new(manager.connection())
            .import_from_excel(&detailed, ImportFormat::Detailed)
            .await;
        assert!(result.success);
        assert_eq!(result.specs_added, 0);
    }
}
