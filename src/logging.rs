//! 日志模块 - 同步事件日志（文件 + 控制台）以及诊断日志初始化

use crate::error::ConfigError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// 事件日志时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 同步事件日志
///
/// 引擎只负责产生消息，时间戳和落盘由实现决定。
pub trait EventLog: Send + Sync {
    fn log(&self, message: &str);
}

/// 格式化一条带时间戳的日志行
pub fn format_line(message: &str) -> String {
    format!("[{}] {}", chrono::Local::now().format(TIMESTAMP_FORMAT), message)
}

/// 同时写入日志文件和控制台
pub struct FileAndConsoleLog {
    writer: Mutex<BufWriter<File>>,
}

impl FileAndConsoleLog {
    pub fn open(log_file_path: &Path) -> Result<Self, ConfigError> {
        if log_file_path.is_dir() {
            return Err(ConfigError::LogPathIsDirectory(log_file_path.to_path_buf()));
        }

        let unwritable = |source: io::Error| ConfigError::LogFileUnwritable {
            path: log_file_path.to_path_buf(),
            source,
        };

        if let Some(parent) = log_file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unwritable)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)
            .map_err(unwritable)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventLog for FileAndConsoleLog {
    fn log(&self, message: &str) {
        let line = format_line(message);

        // 持有锁期间完成控制台和文件的整行写入，避免并发写入交错
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{}", line);
        }

        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            tracing::warn!("写入日志文件失败: {}", e);
        }
    }
}

/// 内存日志，测试时用来断言事件
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

#[cfg(test)]
impl EventLog for MemoryLog {
    fn log(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}

/// 初始化诊断日志（tracing），输出到 stderr
///
/// 默认只显示 warn 及以上，可以用 RUST_LOG 覆盖。
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
