/// 报表 Excel 写出
///
/// 普通布局每个测量一行；转置布局每个设备每次测试一行、每个测量项一列。
/// 开启 include_plots 时另起 "Plots" 工作表放置曲线图片。
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use log::{info, warn};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Image, Workbook, Worksheet, XlsxError};

use crate::models::report::{ExportStyle, ReportColumn, ReportRow};
use crate::services::infrastructure::plot_renderer::{
    parse_hex_color, PlotRenderer, REPORT_PLOT_HEIGHT, REPORT_PLOT_WIDTH,
};
use crate::utils::error::{AppError, AppResult};

pub const REPORT_SHEET: &str = "Report Data";
pub const PLOTS_SHEET: &str = "Plots";

const COLUMN_WIDTH: f64 = 15.0;
/// 相邻两张曲线图之间的行距
const PLOT_ROW_SPACING: u32 = 20;
/// 曲线标签所在列（第 10 列）
const PLOT_LABEL_COL: u16 = 9;
const NA: &str = "N/A";

/// 导出结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportExportSummary {
    pub data_rows: usize,
    pub plots: usize,
}

fn xlsx_color(hex: &str) -> AppResult<Color> {
    let rgb = parse_hex_color(hex)?;
    Ok(Color::RGB(((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32))
}

fn xlsx_border(style: &str) -> FormatBorder {
    match style {
        "medium" => FormatBorder::Medium,
        "thick" => FormatBorder::Thick,
        "none" => FormatBorder::None,
        _ => FormatBorder::Thin,
    }
}

/// 由导出样式生成的单元格格式
struct CellFormats {
    header: Format,
    data: Format,
    zebra: Format,
    pass: Format,
    fail: Format,
    zebra_enabled: bool,
    conditional_enabled: bool,
}

impl CellFormats {
    fn from_style(style: &ExportStyle) -> AppResult<Self> {
        let border = xlsx_border(&style.border_style);
        let border_color = xlsx_color(&style.border_color)?;
        let base = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(border)
            .set_border_color(border_color);

        let mut header = base
            .clone()
            .set_background_color(xlsx_color(&style.header_bg_color)?)
            .set_font_color(xlsx_color(&style.header_text_color)?)
            .set_font_size(style.header_font_size);
        if style.header_font_bold {
            header = header.set_bold();
        }

        let data_font = base
            .set_font_color(xlsx_color(&style.data_text_color)?)
            .set_font_size(style.data_font_size);

        Ok(Self {
            header,
            data: data_font.clone().set_background_color(xlsx_color(&style.data_bg_color)?),
            zebra: data_font.clone().set_background_color(xlsx_color(&style.zebra_color)?),
            pass: data_font.clone().set_background_color(xlsx_color(&style.pass_color)?),
            fail: data_font.set_background_color(xlsx_color(&style.fail_color)?),
            zebra_enabled: style.zebra_enabled,
            conditional_enabled: style.conditional_enabled,
        })
    }

    /// 0 起的工作表行号；按 1 起的行号偶数行上斑马纹
    fn row_format(&self, sheet_row: u32) -> &Format {
        if self.zebra_enabled && (sheet_row + 1) % 2 == 0 {
            &self.zebra
        } else {
            &self.data
        }
    }

    fn result_format(&self, passed: Option<bool>) -> Option<&Format> {
        if !self.conditional_enabled {
            return None;
        }
        match passed {
            Some(true) => Some(&self.pass),
            Some(false) => Some(&self.fail),
            None => None,
        }
    }
}

fn write_opt_number(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
    format: &Format,
) -> Result<(), XlsxError> {
    match value {
        Some(v) if v.is_finite() => sheet.write_number_with_format(row, col, v, format)?,
        _ => sheet.write_string_with_format(row, col, NA, format)?,
    };
    Ok(())
}

/// 普通布局中实际输出的列
pub fn visible_columns(style: &ExportStyle, hidden: &HashSet<ReportColumn>) -> Vec<ReportColumn> {
    ReportColumn::ALL
        .iter()
        .copied()
        .filter(|c| c.enabled_by(style) && !hidden.contains(c))
        .collect()
}

pub struct ReportWriter;

impl ReportWriter {
    /// 写出报表文件
    pub fn write_report(
        path: &Path,
        rows: &[ReportRow],
        style: &ExportStyle,
        hidden: &HashSet<ReportColumn>,
    ) -> AppResult<ReportExportSummary> {
        if rows.is_empty() {
            return Err(AppError::validation_error("没有可导出的报表数据，请先生成报表"));
        }

        let columns = visible_columns(style, hidden);
        if !style.transpose && columns.is_empty() {
            return Err(AppError::report_generation_error("所有列都已隐藏，无法导出报表"));
        }

        let formats = CellFormats::from_style(style)?;
        let mut workbook = Workbook::new();
        let mut summary = ReportExportSummary::default();

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(REPORT_SHEET)?;
            summary.data_rows = if style.transpose {
                Self::write_transposed(sheet, rows, &formats)?
            } else {
                Self::write_normal(sheet, rows, &formats, &columns)?
            };
        }

        if style.include_plots {
            summary.plots = Self::write_plots(&mut workbook, rows)?;
        }

        workbook.save(path)?;
        info!(
            "[EXPORT] 报表已保存到 {} ({} 行, {} 张曲线图)",
            path.display(),
            summary.data_rows,
            summary.plots
        );
        Ok(summary)
    }

    fn write_normal(
        sheet: &mut Worksheet,
        rows: &[ReportRow],
        formats: &CellFormats,
        columns: &[ReportColumn],
    ) -> AppResult<usize> {
        for (col, column) in columns.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, column.header(), &formats.header)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            let row_fmt = formats.row_format(r);
            let result_fmt = formats.result_format(row.passed).unwrap_or(row_fmt);

            for (c, column) in columns.iter().enumerate() {
                let col = c as u16;
                match column {
                    ReportColumn::SpecName => {
                        sheet.write_string_with_format(r, col, &row.spec_name, row_fmt)?;
                    }
                    ReportColumn::Unit => {
                        sheet.write_string_with_format(r, col, &row.unit, row_fmt)?;
                    }
                    ReportColumn::LowerLimit => write_opt_number(sheet, r, col, row.lower_limit, row_fmt)?,
                    ReportColumn::UpperLimit => write_opt_number(sheet, r, col, row.upper_limit, row_fmt)?,
                    ReportColumn::Measurement => write_opt_number(sheet, r, col, row.measurement, result_fmt)?,
                    ReportColumn::Status => {
                        sheet.write_string_with_format(r, col, row.status_text(), result_fmt)?;
                    }
                    ReportColumn::PiaSerial => {
                        sheet.write_string_with_format(r, col, &row.pia_serial, row_fmt)?;
                    }
                    ReportColumn::PiaPart => {
                        sheet.write_string_with_format(r, col, &row.pia_part, row_fmt)?;
                    }
                    ReportColumn::PmtSerial => {
                        sheet.write_string_with_format(r, col, &row.pmt_serial, row_fmt)?;
                    }
                    ReportColumn::PmtBatch => {
                        sheet.write_string_with_format(r, col, &row.pmt_batch, row_fmt)?;
                    }
                    ReportColumn::TestName => {
                        sheet.write_string_with_format(r, col, &row.test_name, row_fmt)?;
                    }
                    ReportColumn::TestFixture => {
                        sheet.write_string_with_format(r, col, &row.test_fixture, row_fmt)?;
                    }
                    ReportColumn::TestDate => {
                        sheet.write_string_with_format(r, col, row.test_date_text(), row_fmt)?;
                    }
                }
            }
        }

        for col in 0..columns.len() {
            sheet.set_column_width(col as u16, COLUMN_WIDTH)?;
        }
        Ok(rows.len())
    }

    fn write_transposed(sheet: &mut Worksheet, rows: &[ReportRow], formats: &CellFormats) -> AppResult<usize> {
        let spec_names: Vec<&str> = rows
            .iter()
            .map(|r| r.spec_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut headers = vec!["Device", "Test Date"];
        headers.extend(spec_names.iter().copied());
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &formats.header)?;
        }

        // 设备、测试时间都按首次出现的顺序
        let mut devices: Vec<(String, Vec<(String, Vec<&ReportRow>)>)> = Vec::new();
        for row in rows {
            let device_key = row.device_key();
            let date_key = row.test_date_text();
            let dev_idx = match devices.iter().position(|(k, _)| *k == device_key) {
                Some(idx) => idx,
                None => {
                    devices.push((device_key, Vec::new()));
                    devices.len() - 1
                }
            };
            let tests = &mut devices[dev_idx].1;
            match tests.iter_mut().find(|(d, _)| *d == date_key) {
                Some((_, members)) => members.push(row),
                None => tests.push((date_key, vec![row])),
            }
        }

        let mut r = 1u32;
        for (device_key, tests) in &devices {
            for (date_key, members) in tests {
                let row_fmt = formats.row_format(r);
                sheet.write_string_with_format(r, 0, device_key, row_fmt)?;
                sheet.write_string_with_format(r, 1, date_key, row_fmt)?;

                for (i, spec_name) in spec_names.iter().enumerate() {
                    let col = i as u16 + 2;
                    // 同一次测试中同名测量项取最后一条
                    match members.iter().rev().find(|m| m.spec_name == *spec_name) {
                        Some(m) => {
                            let fmt = formats.result_format(m.passed).unwrap_or(row_fmt);
                            write_opt_number(sheet, r, col, m.measurement, fmt)?;
                        }
                        None => {
                            sheet.write_string_with_format(r, col, NA, row_fmt)?;
                        }
                    }
                }
                r += 1;
            }
        }

        for col in 0..headers.len() {
            sheet.set_column_width(col as u16, COLUMN_WIDTH)?;
        }
        Ok((r - 1) as usize)
    }

    /// 带曲线数据的行逐个渲染成图片；单个失败只跳过
    fn write_plots(workbook: &mut Workbook, rows: &[ReportRow]) -> AppResult<usize> {
        let plot_rows: Vec<&ReportRow> = rows
            .iter()
            .filter(|r| r.has_plot && r.plot_data.as_deref().map_or(false, |d| !d.is_empty()))
            .collect();
        if plot_rows.is_empty() {
            return Ok(0);
        }

        let sheet = workbook.add_worksheet();
        sheet.set_name(PLOTS_SHEET)?;

        let mut row_offset = 0u32;
        let mut written = 0;
        for row in plot_rows {
            let series = crate::models::entities::spec::parse_plot_data(row.plot_data.as_deref()).unwrap_or_default();
            let png = match PlotRenderer::render_series_png(&series, REPORT_PLOT_WIDTH, REPORT_PLOT_HEIGHT) {
                Ok(png) => png,
                Err(e) => {
                    warn!("[EXPORT] 跳过 {} 的曲线图: {}", row.spec_name, e);
                    continue;
                }
            };
            let image = Image::new_from_buffer(&png)?;
            sheet.insert_image(row_offset, 0, &image)?;
            sheet.write_string(
                row_offset,
                PLOT_LABEL_COL,
                format!("{} | {} | {}", row.spec_name, row.pia_serial, row.test_date),
            )?;
            row_offset += PLOT_ROW_SPACING;
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::structs::PlotSeries;
    use calamine::{open_workbook, DataType, Reader, Xlsx};
    use chrono::NaiveDate;

    fn row(spec: &str, pia: &str, minute: u32, measurement: Option<f64>, passed: Option<bool>) -> ReportRow {
        ReportRow {
            spec_id: 1,
            spec_name: spec.to_string(),
            measurement,
            unit: "V".to_string(),
            lower_limit: Some(0.0),
            upper_limit: Some(1.0),
            nominal: None,
            result: passed,
            passed,
            has_plot: false,
            plot_data: None,
            pia_serial: pia.to_string(),
            pia_part: "P1".to_string(),
            pmt_serial: "N/A".to_string(),
            pmt_batch: "N/A".to_string(),
            test_name: "Full Test".to_string(),
            test_fixture: "Plexus".to_string(),
            test_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(10, minute, 0).unwrap(),
            test_log_id: 1,
        }
    }

    fn read(path: &Path, sheet: &str) -> Vec<Vec<DataType>> {
        let mut wb: Xlsx<_> = open_workbook(path).unwrap();
        let range = wb.worksheet_range(sheet).unwrap().unwrap();
        range.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn normal_layout_honours_style_and_hidden_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let rows = vec![row("Gain", "PIA-1", 0, Some(0.5), Some(true)), row("Gain", "PIA-2", 0, None, None)];
        let style = ExportStyle {
            include_units: false,
            include_plots: false,
            ..Default::default()
        };
        let hidden: HashSet<ReportColumn> = [ReportColumn::PmtBatch].into_iter().collect();

        let summary = ReportWriter::write_report(&path, &rows, &style, &hidden).unwrap();
        assert_eq!(summary, ReportExportSummary { data_rows: 2, plots: 0 });

        let cells = read(&path, REPORT_SHEET);
        let header: Vec<String> = cells[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(
            header,
            vec![
                "Spec Name", "Lower Limit", "Upper Limit", "Measurement", "Status", "PIA Serial", "PIA Part",
                "PMT Serial", "Test Name", "Test Fixture", "Test Date"
            ]
        );
        assert_eq!(cells[1][3], DataType::Float(0.5));
        assert_eq!(cells[1][4], DataType::String("PASS".into()));
        assert_eq!(cells[2][3], DataType::String("N/A".into()));
        assert_eq!(cells[2][4], DataType::String("N/A".into()));
        assert_eq!(cells[1][10], DataType::String("2024-03-01 10:00".into()));
    }

    #[test]
    fn transposed_layout_groups_by_device_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transposed.xlsx");
        let rows = vec![
            row("Offset", "PIA-1", 0, Some(0.1), Some(true)),
            row("Gain", "PIA-1", 0, Some(3.0), Some(false)),
            row("Gain", "PIA-1", 5, Some(0.9), Some(true)),
            row("Gain", "PIA-2", 0, Some(0.7), Some(true)),
        ];
        let style = ExportStyle {
            transpose: true,
            include_plots: false,
            ..Default::default()
        };

        let summary = ReportWriter::write_report(&path, &rows, &style, &HashSet::new()).unwrap();
        assert_eq!(summary.data_rows, 3);

        let cells = read(&path, REPORT_SHEET);
        let header: Vec<String> = cells[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(header, vec!["Device", "Test Date", "Gain", "Offset"]);
        assert_eq!(cells[1][0], DataType::String("PIA-1_N/A".into()));
        assert_eq!(cells[1][1], DataType::String("2024-03-01 10:00".into()));
        assert_eq!(cells[1][2], DataType::Float(3.0));
        assert_eq!(cells[1][3], DataType::Float(0.1));
        assert_eq!(cells[2][1], DataType::String("2024-03-01 10:05".into()));
        assert_eq!(cells[2][3], DataType::String("N/A".into()));
        assert_eq!(cells[3][0], DataType::String("PIA-2_N/A".into()));
    }

    #[test]
    fn plots_sheet_gets_label_per_plot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.xlsx");
        let series = vec![PlotSeries {
            x: vec![0.0, 1.0, 2.0],
            y: vec![1.0, 0.0, 1.0],
            label: Some("Response".into()),
        }];
        let mut with_plot = row("Response Curve", "PIA-1", 0, None, None);
        with_plot.has_plot = true;
        with_plot.plot_data = crate::models::entities::spec::serialize_plot_data(&series);
        let mut broken = row("Broken Curve", "PIA-1", 0, None, None);
        broken.has_plot = true;
        broken.plot_data = Some("not json".into());
        let rows = vec![with_plot.clone(), broken, with_plot];

        let summary = ReportWriter::write_report(&path, &rows, &ExportStyle::default(), &HashSet::new()).unwrap();
        assert_eq!(summary.plots, 2);

        // 图片不占单元格，按绝对位置读取标签
        let mut wb: Xlsx<_> = open_workbook(&path).unwrap();
        let range = wb.worksheet_range(PLOTS_SHEET).unwrap().unwrap();
        let label = DataType::String("Response Curve | PIA-1 | 2024-03-01 10:00:00".into());
        assert_eq!(range.get_value((0, PLOT_LABEL_COL as u32)), Some(&label));
        assert_eq!(range.get_value((PLOT_ROW_SPACING, PLOT_LABEL_COL as u32)), Some(&label));
    }

    #[test]
    fn empty_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportWriter::write_report(&dir.path().join("x.xlsx"), &[], &ExportStyle::default(), &HashSet::new())
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn hiding_every_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let hidden: HashSet<ReportColumn> = ReportColumn::ALL.iter().copied().collect();
        let rows = vec![row("Gain", "PIA-1", 0, Some(1.0), Some(true))];
        let err = ReportWriter::write_report(&dir.path().join("x.xlsx"), &rows, &ExportStyle::default(), &hidden)
            .unwrap_err();
        assert_eq!(err.error_code(), "REPORT_GENERATION_ERROR");
    }
}
