/// Excel 相关基础设施：厂商数据导入、报表写出、整库导出
pub mod database_exporter;
pub mod manufacturer_importer;
pub mod report_writer;

pub use database_exporter::{DatabaseExporter, RawValue, TableDump};
pub use manufacturer_importer::ManufacturerImporter;
pub use report_writer::{ReportExportSummary, ReportWriter};
