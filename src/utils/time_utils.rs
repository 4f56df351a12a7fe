use chrono::{Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// 界面与报表统一的日期时间显示格式
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// 文件名用的时间戳格式
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 数据库中的时间为朴素 UTC
#[inline]
pub fn now_naive_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// 按显示格式输出
#[inline]
pub fn format_display(dt: &NaiveDateTime) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}

/// 可选时间的显示，缺失时为 "N/A"
pub fn format_display_opt(dt: Option<&NaiveDateTime>) -> String {
    dt.map(format_display).unwrap_or_else(|| "N/A".to_string())
}

/// 当天 00:00:00
#[inline]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// 当天 23:59:59.999，用于包含式日期范围
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default()) + Duration::days(1) - Duration::milliseconds(1)
}

/// 今天往前 N 个月的日期（本地时区）
pub fn months_ago(months: u32) -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_sub_months(Months::new(months)).unwrap_or(today)
}

/// 今天往前 N 天的 UTC 时间
pub fn days_ago(days: i64) -> NaiveDateTime {
    now_naive_utc() - Duration::days(days)
}

/// 朴素 UTC 时间转 epoch 秒，用于绘图 x 轴
pub fn to_epoch_seconds(dt: &NaiveDateTime) -> f64 {
    Utc.from_utc_datetime(dt).timestamp() as f64
}

/// 文件名时间戳（本地时间）
pub fn file_stamp() -> String {
    Local::now().format(FILE_STAMP_FORMAT).to_string()
}

/// 导入文件中接受的日期时间文本格式
const IMPORT_DATETIME_FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const IMPORT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// 解析导入文件中的日期文本，只有日期时取当天 00:00
pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    IMPORT_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            IMPORT_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(start_of_day)
        })
}

/// Excel 序列日期（1899-12-30 起的天数）转朴素时间
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::default());
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
}
