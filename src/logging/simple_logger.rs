/// 控制台 + 追加文件的日志器
/// 同步写入，查询与导出的日志量不需要异步批处理

use super::*;
use log::{Log, Metadata, Record};
use std::sync::{Arc, Mutex};
use std::fs::OpenOptions;
use std::io::{Write as IoWrite, BufWriter};
use chrono::Local;

/// 实现 log::Log 的简单日志器
pub struct SimpleLogger {
    config: LoggerConfig,
    file_writer: Arc<Mutex<Option<BufWriter<std::fs::File>>>>,
}

impl SimpleLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            file_writer: Arc::new(Mutex::new(None)),
        }
    }

    /// 打开日志文件并注册为全局 logger
    pub fn init(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = self.config.file_path() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;

            let mut writer_guard = self.file_writer.lock().map_err(|_| "文件写入器锁定失败")?;
            *writer_guard = Some(BufWriter::new(file));
        }

        let logger = SimpleLogger {
            config: self.config.clone(),
            file_writer: self.file_writer.clone(),
        };

        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(self.config.level.into());

        Ok(())
    }

    fn format_line(&self, record: &Record) -> String {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        match self.config.format {
            LogFormat::Plain => format!("[{}] [{}] {}", stamp, record.level(), record.args()),
            LogFormat::Structured => format!(
                "[{}] [{}] [{}] - {}",
                stamp,
                record.level(),
                record.target(),
                record.args()
            ),
        }
    }

    fn write_to_console(&self, record: &Record) {
        let message = self.format_line(record);

        match record.level() {
            log::Level::Error => {
                eprintln!("\x1b[31m{}\x1b[0m", message);
            }
            log::Level::Warn => {
                eprintln!("\x1b[33m{}\x1b[0m", message);
            }
            _ => {
                println!("{}", message);
            }
        }
    }

    fn write_to_file(&self, record: &Record) {
        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(writer) = writer_guard.as_mut() {
                let message = format!("{}\n", self.format_line(record));

                if let Err(e) = writer.write_all(message.as_bytes()) {
                    eprintln!("写入日志文件失败: {}", e);
                } else {
                    let _ = writer.flush();
                }
            }
        }
    }
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        for target in &self.config.targets {
            match target {
                LogTarget::Console => self.write_to_console(record),
                LogTarget::File { .. } => self.write_to_file(record),
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(writer) = writer_guard.as_mut() {
                let _ = writer.flush();
            }
        }
    }
}
