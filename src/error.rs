//! 错误类型

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 同步过程中的错误
///
/// 单个文件/目录级别的错误只会被记录，不会中断整轮同步。
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot delete {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory error at {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not under {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// 工作任务 panic 或被取消
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn delete(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Delete {
            path: path.into(),
            source,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }
}

/// 启动阶段的配置错误，出现即退出进程
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Incorrect interval seconds value: {0}")]
    InvalidInterval(String),

    #[error(
        "The path points to a directory, but a file is needed: {}\nPlease try to use: {}",
        .0.display(),
        .0.join("sync.log").display()
    )]
    LogPathIsDirectory(PathBuf),

    #[error("You have not access to file: {}: {source}", path.display())]
    LogFileUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
