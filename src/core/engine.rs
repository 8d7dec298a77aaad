use crate::config::EngineConfig;
use crate::core::hash::ContentHasher;
use crate::core::memo::CreatedDirs;
use crate::core::scanner::FileScanner;
use crate::core::snapshot::{normalize_relative, FileRecord, TreeSnapshot};
use crate::error::Result;
use crate::logging::EventLog;
use crate::storage::FileSystem;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// 一轮同步的结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Completed,
    /// 源目录不存在，本轮没有改动副本
    SourceMissing,
}

/// 同步报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub status: PassStatus,
    pub source_files: usize,
    pub replica_files: usize,
    pub copied: usize,
    pub updated: usize,
    pub deleted_files: usize,
    pub deleted_dirs: usize,
    pub failed: usize,
}

impl PassReport {
    fn source_missing() -> Self {
        Self {
            status: PassStatus::SourceMissing,
            source_files: 0,
            replica_files: 0,
            copied: 0,
            updated: 0,
            deleted_files: 0,
            deleted_dirs: 0,
            failed: 0,
        }
    }

    /// 本轮对副本做出的改动数
    pub fn changes(&self) -> usize {
        self.copied + self.updated + self.deleted_files + self.deleted_dirs
    }
}

/// 传输统计
#[derive(Debug, Default)]
struct PassStats {
    copied: AtomicUsize,
    updated: AtomicUsize,
    deleted_files: AtomicUsize,
    deleted_dirs: AtomicUsize,
    failed: AtomicUsize,
}

/// 需要执行的复制动作
#[derive(Debug)]
struct CopyAction {
    relative_path: String,
    from: PathBuf,
    to: PathBuf,
    update: bool,
}

/// 同步引擎
///
/// 每次 `run_once` 都是一轮完整的单向镜像：目录结构、扫描、复制/更新、
/// 删除多余文件、删除多余的空目录。阶段之间严格串行，阶段内部并发。
pub struct SyncEngine {
    fs: Arc<dyn FileSystem>,
    hasher: Arc<dyn ContentHasher>,
    log: Arc<dyn EventLog>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        hasher: Arc<dyn ContentHasher>,
        log: Arc<dyn EventLog>,
    ) -> Self {
        Self::with_config(fs, hasher, log, EngineConfig::default())
    }

    pub fn with_config(
        fs: Arc<dyn FileSystem>,
        hasher: Arc<dyn ContentHasher>,
        log: Arc<dyn EventLog>,
        config: EngineConfig,
    ) -> Self {
        Self {
            fs,
            hasher,
            log,
            config,
        }
    }

    /// 执行一轮同步
    ///
    /// 单个文件或目录的失败只记录日志；返回 Err 表示本轮出现了无法继续的错误。
    pub async fn run_once(&self, source: &Path, replica: &Path) -> Result<PassReport> {
        self.log.log(&format!(
            "Start Sync: {} -> {}",
            source.display(),
            replica.display()
        ));

        if !self.fs.is_directory(source).await {
            self.log
                .log(&format!("ERROR: Source not found: {}", source.display()));
            return Ok(PassReport::source_missing());
        }

        // 每轮一个新的目录记录
        let created = Arc::new(CreatedDirs::new());
        created.ensure(self.fs.as_ref(), replica).await?;

        let stats = Arc::new(PassStats::default());
        self.mirror_directories(source, replica, &created, &stats)
            .await?;

        let scanner = FileScanner::new(
            self.fs.clone(),
            self.hasher.clone(),
            self.log.clone(),
            self.config.max_concurrent,
        );
        let (source_snapshot, replica_snapshot) =
            tokio::try_join!(scanner.scan(source), scanner.scan(replica))?;

        self.log.log(&format!(
            "Source files: {} | Replica files: {}",
            source_snapshot.len(),
            replica_snapshot.len()
        ));

        self.reconcile_files(&source_snapshot, &replica_snapshot, replica, &created, &stats)
            .await?;
        self.delete_stale_files(&source_snapshot, &replica_snapshot, &stats)
            .await?;
        self.delete_stale_directories(source, replica, &stats).await;

        self.log.log("<<<<<<< Sync completed >>>>>>>");

        let report = PassReport {
            status: PassStatus::Completed,
            source_files: source_snapshot.len(),
            replica_files: replica_snapshot.len(),
            copied: stats.copied.load(Ordering::Relaxed),
            updated: stats.updated.load(Ordering::Relaxed),
            deleted_files: stats.deleted_files.load(Ordering::Relaxed),
            deleted_dirs: stats.deleted_dirs.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
        };
        debug!("同步报告: {:?}", report);

        Ok(report)
    }

    /// 在副本中重建源目录结构（包括空目录）
    async fn mirror_directories(
        &self,
        source: &Path,
        replica: &Path,
        created: &Arc<CreatedDirs>,
        stats: &Arc<PassStats>,
    ) -> Result<()> {
        let directories = self.fs.list_directories(source).await?;
        debug!("源目录数: {}", directories.len());

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(directories.len());

        for dir in directories {
            let Ok(relative) = dir.strip_prefix(source) else {
                continue;
            };
            let target = replica.join(relative);
            let relative = normalize_relative(relative);

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let fs = self.fs.clone();
            let log = self.log.clone();
            let created = created.clone();
            let stats = stats.clone();

            handles.push(tokio::spawn(async move {
                if let Err(e) = created.ensure(fs.as_ref(), &target).await {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    log.log(&format!("Directory Error {}: {}", relative, e));
                }
                drop(permit);
            }));
        }

        join_stage(handles).await
    }

    /// 复制新文件、覆盖内容不同的文件
    async fn reconcile_files(
        &self,
        source_snapshot: &TreeSnapshot,
        replica_snapshot: &TreeSnapshot,
        replica: &Path,
        created: &Arc<CreatedDirs>,
        stats: &Arc<PassStats>,
    ) -> Result<()> {
        let actions = plan_copies(source_snapshot, replica_snapshot, replica);
        debug!("待复制: {} 个文件", actions.len());

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(actions.len());

        for action in actions {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let fs = self.fs.clone();
            let log = self.log.clone();
            let created = created.clone();
            let stats = stats.clone();

            handles.push(tokio::spawn(async move {
                let result = async {
                    if let Some(parent) = action.to.parent() {
                        created.ensure(fs.as_ref(), parent).await?;
                    }
                    fs.copy_file(&action.from, &action.to).await
                }
                .await;

                match result {
                    Ok(()) if action.update => {
                        stats.updated.fetch_add(1, Ordering::Relaxed);
                        log.log(&format!("[Updated] {}", action.relative_path));
                    }
                    Ok(()) => {
                        stats.copied.fetch_add(1, Ordering::Relaxed);
                        log.log(&format!("[Copied] {}", action.relative_path));
                    }
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        log.log(&format!("Copy Error {}: {}", action.relative_path, e));
                    }
                }
                drop(permit);
            }));
        }

        join_stage(handles).await
    }

    /// 删除副本中源已经没有的文件
    async fn delete_stale_files(
        &self,
        source_snapshot: &TreeSnapshot,
        replica_snapshot: &TreeSnapshot,
        stats: &Arc<PassStats>,
    ) -> Result<()> {
        // 大小写冲突中落选的副本文件也是多余的
        let stale: Vec<FileRecord> = replica_snapshot
            .records()
            .filter(|r| !source_snapshot.contains(&r.relative))
            .chain(replica_snapshot.shadowed())
            .cloned()
            .collect();
        debug!("待删除: {} 个文件", stale.len());

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(stale.len());

        for record in stale {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let fs = self.fs.clone();
            let log = self.log.clone();
            let stats = stats.clone();

            handles.push(tokio::spawn(async move {
                match fs.delete_file(&record.full_path).await {
                    Ok(()) => {
                        stats.deleted_files.fetch_add(1, Ordering::Relaxed);
                        log.log(&format!("Deleted file: {}", record.relative_path));
                    }
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        log.log(&format!("Delete Error {}: {}", record.relative_path, e));
                    }
                }
                drop(permit);
            }));
        }

        join_stage(handles).await
    }

    /// 删除源中不存在的空目录，子目录先于父目录
    async fn delete_stale_directories(&self, source: &Path, replica: &Path, stats: &PassStats) {
        let mut directories = match self.fs.list_directories(replica).await {
            Ok(dirs) => dirs,
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                self.log.log(&format!("Cleanup Error: {}", e));
                return;
            }
        };
        directories.sort_by_key(|d| Reverse(d.as_os_str().len()));

        for dir in directories {
            let Ok(relative) = dir.strip_prefix(replica) else {
                continue;
            };
            if self.fs.is_directory(&source.join(relative)).await {
                continue;
            }
            let relative = normalize_relative(relative);

            match self.fs.is_empty_directory(&dir).await {
                Ok(true) => match self.fs.delete_directory(&dir).await {
                    Ok(()) => {
                        stats.deleted_dirs.fetch_add(1, Ordering::Relaxed);
                        self.log.log(&format!("Deleted dir: {}", relative));
                    }
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        self.log.log(&format!("Delete Error {}: {}", relative, e));
                    }
                },
                Ok(false) => debug!("保留非空目录: {}", relative),
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    self.log.log(&format!("Delete Error {}: {}", relative, e));
                }
            }
        }
    }
}

/// 比较两个快照，得到需要复制的文件
fn plan_copies(
    source_snapshot: &TreeSnapshot,
    replica_snapshot: &TreeSnapshot,
    replica: &Path,
) -> Vec<CopyAction> {
    source_snapshot
        .records()
        .filter_map(|src| match replica_snapshot.get(&src.relative) {
            None => Some(CopyAction {
                relative_path: src.relative_path.clone(),
                from: src.full_path.clone(),
                to: replica.join(&src.relative),
                update: false,
            }),
            // 覆盖已有文件，保持副本中的文件名大小写
            Some(dst) if dst.digest != src.digest => Some(CopyAction {
                relative_path: src.relative_path.clone(),
                from: src.full_path.clone(),
                to: dst.full_path.clone(),
                update: true,
            }),
            Some(_) => None,
        })
        .collect()
}

/// 等待一个阶段的所有任务结束
///
/// 所有任务都结束后才返回；有任务 panic 时返回第一个错误。
async fn join_stage(handles: Vec<JoinHandle<()>>) -> Result<()> {
    let mut first_error = None;
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
