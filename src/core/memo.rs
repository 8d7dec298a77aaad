//! 单轮同步内的目录创建记录
//!
//! 只用来跳过重复的存在性检查，文件系统本身才是权威。

use crate::error::{Result, SyncError};
use crate::storage::FileSystem;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// 已确保存在的目录集合，支持多个任务并发插入
///
/// 同一路径的并发调用会等待第一次创建完成；创建失败不会被记住，下次调用会重试。
#[derive(Debug, Default)]
pub struct CreatedDirs {
    dirs: DashMap<PathBuf, Arc<OnceCell<()>>>,
}

impl CreatedDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 确保目录存在
    pub async fn ensure(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }

        // 先把 cell 克隆出来，不在 await 期间持有 DashMap 的锁
        let cell = self.dirs.entry(path.to_path_buf()).or_default().clone();

        cell.get_or_try_init(|| async {
            if !fs.is_directory(path).await {
                fs.create_directory(path).await?;
            }
            Ok::<_, SyncError>(())
        })
        .await?;

        Ok(())
    }
}

#[cfg(test)]
impl CreatedDirs {
    pub fn contains(&self, path: &Path) -> bool {
        self.dirs
            .get(path)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.dirs.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileSystem;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 统计 create_directory 调用次数
    #[derive(Default)]
    struct CountingFs {
        inner: LocalFileSystem,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl FileSystem for CountingFs {
        async fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path).await
        }
        async fn is_directory(&self, path: &Path) -> bool {
            self.inner.is_directory(path).await
        }
        async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
            self.inner.copy_file(from, to).await
        }
        async fn delete_file(&self, path: &Path) -> Result<()> {
            self.inner.delete_file(path).await
        }
        async fn create_directory(&self, path: &Path) -> Result<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_directory(path).await
        }
        async fn delete_directory(&self, path: &Path) -> Result<()> {
            self.inner.delete_directory(path).await
        }
        async fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
            self.inner.list_files(root).await
        }
        async fn list_directories(&self, root: &Path) -> Result<Vec<PathBuf>> {
            self.inner.list_directories(root).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_ensure_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        let fs = Arc::new(CountingFs::default());
        let memo = Arc::new(CreatedDirs::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let fs = fs.clone();
                let memo = memo.clone();
                let target = target.clone();
                tokio::spawn(async move { memo.ensure(fs.as_ref(), &target).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert!(target.is_dir());
        assert_eq!(fs.creates.load(Ordering::SeqCst), 1);
        assert!(memo.contains(&target));
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_directory_is_not_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let fs = CountingFs::default();
        let memo = CreatedDirs::new();

        memo.ensure(&fs, dir.path()).await.unwrap();
        assert_eq!(fs.creates.load(Ordering::SeqCst), 0);
        assert!(memo.contains(dir.path()));
    }

    #[tokio::test]
    async fn test_failed_create_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        // 父路径是一个文件，创建必然失败
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let target = blocker.join("child");

        let fs = CountingFs::default();
        let memo = CreatedDirs::new();
        assert!(memo.ensure(&fs, &target).await.is_err());
        assert!(!memo.contains(&target));

        std::fs::remove_file(&blocker).unwrap();
        memo.ensure(&fs, &target).await.unwrap();
        assert!(target.is_dir());
        assert_eq!(fs.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_path_is_noop() {
        let fs = CountingFs::default();
        let memo = CreatedDirs::new();
        memo.ensure(&fs, Path::new("")).await.unwrap();
        assert!(memo.is_empty());
    }
}
