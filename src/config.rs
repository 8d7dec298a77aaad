//! 应用配置模块

use crate::error::ConfigError;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// 命令行参数（原始形式，尚未校验）
#[derive(Debug, Parser)]
#[command(name = "foldersync", about = "One-way periodic folder mirroring")]
pub struct Cli {
    /// 源目录
    pub source_path: PathBuf,
    /// 副本目录
    pub replica_path: PathBuf,
    /// 同步间隔（秒），必须是正整数
    #[arg(allow_hyphen_values = true)]
    pub interval_seconds: String,
    /// 日志文件路径
    pub log_file_path: PathBuf,
}

/// 参数数量不对时打印的用法说明
pub fn usage() -> String {
    [
        "foldersync <source_path> <replica_path> <interval_seconds> <log_file_path>",
        "Example for Windows: C:\\Source C:\\Replica 60 C:\\Logs\\sync.log",
        "Example for Linux/MacOS: /Source /Replica 60 /Logs/sync.log",
    ]
    .join("\n")
}

/// 同步选项，启动时加载一次，之后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub source_path: PathBuf,
    pub replica_path: PathBuf,
    pub interval_seconds: u64,
    pub log_file_path: PathBuf,
}

impl SyncOptions {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl TryFrom<Cli> for SyncOptions {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let interval_seconds = cli
            .interval_seconds
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidInterval(cli.interval_seconds.clone()))?;

        Ok(Self {
            source_path: cli.source_path,
            replica_path: cli.replica_path,
            interval_seconds,
            log_file_path: cli.log_file_path,
        })
    }
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 每个阶段的最大并发数
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
        }
    }
}
