use std::sync::Arc;

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::{Cli, EngineConfig, SyncOptions};
pub use crate::core::{Interrupt, PassReport, PassStatus, SyncEngine, SyncService};
pub use error::{ConfigError, SyncError};

use crate::core::Blake3Hasher;
use logging::{EventLog, FileAndConsoleLog};
use storage::LocalFileSystem;

/// 按选项组装一个使用本地磁盘、BLAKE3 和文件+控制台日志的同步服务
pub fn build_service(options: SyncOptions) -> Result<SyncService, ConfigError> {
    let log: Arc<dyn EventLog> = Arc::new(FileAndConsoleLog::open(&options.log_file_path)?);

    let engine = SyncEngine::new(
        Arc::new(LocalFileSystem::new()),
        Arc::new(Blake3Hasher::new()),
        log.clone(),
    );

    Ok(SyncService::new(engine, options, log))
}
