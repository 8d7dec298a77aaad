use super::FileSystem;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// 本地磁盘实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// 递归遍历 root，按条目类型过滤
    ///
    /// walkdir 是阻塞的，放到 spawn_blocking 里避免阻塞 async runtime。
    async fn walk(root: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1).follow_links(false) {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    SyncError::directory(path, e.into())
                })?;

                let file_type = entry.file_type();
                if (want_dirs && file_type.is_dir()) || (!want_dirs && file_type.is_file()) {
                    entries.push(entry.into_path());
                }
            }
            Ok(entries)
        })
        .await?
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_directory(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)
            .await
            .map(|_| ())
            .map_err(|source| SyncError::Copy {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| SyncError::delete(path, e))
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| SyncError::directory(path, e))
    }

    async fn delete_directory(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path)
            .await
            .map_err(|e| SyncError::delete(path, e))
    }

    async fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Self::walk(root, false).await
    }

    async fn list_directories(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Self::walk(root, true).await
    }
}
