use crate::core::hash::ContentHasher;
use crate::core::snapshot::{FileRecord, TreeSnapshot};
use crate::error::{Result, SyncError};
use crate::logging::EventLog;
use crate::storage::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// 文件扫描器
///
/// 列出 root 下所有文件并并发计算摘要。每次 `scan` 都是独立的，
/// 两次扫描之间没有共享的可变状态。
pub struct FileScanner {
    fs: Arc<dyn FileSystem>,
    hasher: Arc<dyn ContentHasher>,
    log: Arc<dyn EventLog>,
    max_concurrent: usize,
}

impl FileScanner {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        hasher: Arc<dyn ContentHasher>,
        log: Arc<dyn EventLog>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fs,
            hasher,
            log,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 扫描目录树并返回快照
    ///
    /// 单个文件读取失败只记录日志并跳过；列目录失败则整体返回错误。
    pub async fn scan(&self, root: &Path) -> Result<TreeSnapshot> {
        let files = self.fs.list_files(root).await?;
        debug!("扫描 {}: {} 个文件", root.display(), files.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(files.len());

        for full_path in files {
            // 信号量从不关闭
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let hasher = self.hasher.clone();
            let root = root.to_path_buf();

            let handle = tokio::task::spawn_blocking(move || {
                let result = hash_entry(hasher.as_ref(), &root, full_path);
                drop(permit);
                result
            });
            handles.push(handle);
        }

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await? {
                Ok(record) => records.push(record),
                Err((path, e)) => {
                    self.log
                        .log(&format!("Error reading {}: {}", path.display(), e));
                    self.log.log(&format!(
                        "File {} can not be sync to replica",
                        path.display()
                    ));
                }
            }
        }

        let snapshot = TreeSnapshot::from_records(records);
        for (kept, dropped) in snapshot.collisions() {
            self.log.log(&format!(
                "Path collision: {} shadows {}",
                kept.relative_path, dropped.relative_path
            ));
        }

        Ok(snapshot)
    }
}

fn hash_entry(
    hasher: &dyn ContentHasher,
    root: &Path,
    full_path: PathBuf,
) -> std::result::Result<FileRecord, (PathBuf, SyncError)> {
    let relative = match full_path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            let err = SyncError::OutsideRoot {
                path: full_path.clone(),
                root: root.to_path_buf(),
            };
            return Err((full_path, err));
        }
    };

    match hasher.digest(&full_path) {
        Ok(digest) => Ok(FileRecord::new(relative, full_path, digest)),
        Err(e) => Err((full_path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::{digest_bytes, Blake3Hasher};
    use crate::logging::MemoryLog;
    use crate::storage::LocalFileSystem;

    /// 对指定文件名返回读取失败的哈希器
    struct FailingHasher {
        fail_on: &'static str,
    }

    impl ContentHasher for FailingHasher {
        fn digest(&self, path: &Path) -> Result<String> {
            if path.ends_with(self.fail_on) {
                return Err(SyncError::read(
                    path,
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
            Blake3Hasher::new().digest(path)
        }
    }

    fn scanner(hasher: Arc<dyn ContentHasher>, log: Arc<MemoryLog>) -> FileScanner {
        FileScanner::new(Arc::new(LocalFileSystem::new()), hasher, log, 4)
    }

    #[tokio::test]
    async fn test_scan_builds_relative_records() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("a/nested")).unwrap();
        std::fs::write(root.join("a/b.txt"), "x").unwrap();
        std::fs::write(root.join("a/nested/c.txt"), "y").unwrap();
        std::fs::write(root.join("top.txt"), "z").unwrap();

        let log = Arc::new(MemoryLog::new());
        let snap = scanner(Arc::new(Blake3Hasher::new()), log.clone())
            .scan(root)
            .await
            .unwrap();

        assert_eq!(snap.len(), 3);
        let b = snap.get("a/b.txt").unwrap();
        assert_eq!(b.full_path, root.join("a/b.txt"));
        assert_eq!(b.digest, digest_bytes(b"x"));
        assert_eq!(snap.get("a/nested/c.txt").unwrap().digest, digest_bytes(b"y"));
        assert!(snap.contains("TOP.TXT"));
        assert!(log.lines().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_omitted_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.txt"), "ok").unwrap();
        std::fs::write(dir.path().join("locked.txt"), "no").unwrap();

        let log = Arc::new(MemoryLog::new());
        let snap = scanner(Arc::new(FailingHasher { fail_on: "locked.txt" }), log.clone())
            .scan(dir.path())
            .await
            .unwrap();

        assert_eq!(snap.len(), 1);
        assert!(snap.contains("ok.txt"));
        assert!(log.contains("Error reading"));
        assert!(log.contains("can not be sync to replica"));
    }

    #[tokio::test]
    async fn test_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemoryLog::new());
        let snap = scanner(Arc::new(Blake3Hasher::new()), log)
            .scan(dir.path())
            .await
            .unwrap();
        assert!(snap.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemoryLog::new());
        let result = scanner(Arc::new(Blake3Hasher::new()), log)
            .scan(&dir.path().join("missing"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_many_files_with_single_worker() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..64 {
            std::fs::write(dir.path().join(format!("f{i}.bin")), i.to_string()).unwrap();
        }
        let log = Arc::new(MemoryLog::new());
        let snap = FileScanner::new(
            Arc::new(LocalFileSystem::new()),
            Arc::new(Blake3Hasher::new()),
            log,
            1,
        )
        .scan(dir.path())
        .await
        .unwrap();
        assert_eq!(snap.len(), 64);
    }
}
