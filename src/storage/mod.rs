pub mod local;

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use local::LocalFileSystem;

/// 文件系统抽象接口
///
/// 所有方法都直接反映调用时的文件系统状态，不做缓存。
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// 路径是否存在（文件或目录）
    async fn exists(&self, path: &Path) -> bool;

    /// 路径是否是目录
    async fn is_directory(&self, path: &Path) -> bool;

    /// 复制文件，目标存在时覆盖
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// 删除文件
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// 递归创建目录，已存在时直接成功
    async fn create_directory(&self, path: &Path) -> Result<()>;

    /// 递归删除目录
    async fn delete_directory(&self, path: &Path) -> Result<()>;

    /// 递归列出 root 下所有文件（不含 root 本身）
    async fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// 递归列出 root 下所有目录（不含 root 本身）
    async fn list_directories(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// 目录中是否没有任何文件和子目录
    async fn is_empty_directory(&self, path: &Path) -> Result<bool> {
        Ok(self.list_files(path).await?.is_empty() && self.list_directories(path).await?.is_empty())
    }
}
