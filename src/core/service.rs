use crate::config::SyncOptions;
use crate::core::engine::SyncEngine;
use crate::logging::EventLog;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// 收到中断请求后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// 等当前一轮结束后停止
    Graceful,
    /// 已经请求过停止，立即退出
    Force,
}

/// 定时同步循环
///
/// 一轮结束后等待 interval 再开始下一轮，轮次之间从不重叠。
/// 停止请求只在两轮之间生效，正在进行的一轮不会被打断。
pub struct SyncService {
    engine: SyncEngine,
    options: SyncOptions,
    log: Arc<dyn EventLog>,
    cancel: CancellationToken,
    interrupts: AtomicUsize,
}

impl SyncService {
    pub fn new(engine: SyncEngine, options: SyncOptions, log: Arc<dyn EventLog>) -> Self {
        Self {
            engine,
            options,
            log,
            cancel: CancellationToken::new(),
            interrupts: AtomicUsize::new(0),
        }
    }

    /// 请求停止，可以在信号处理任务中调用
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
        }
    }

    /// 处理一次 Ctrl+C：第一次请求停止，之后的每一次都要求立即退出
    pub fn interrupt(&self) -> Interrupt {
        if self.interrupts.fetch_add(1, Ordering::SeqCst) == 0 {
            self.stop();
            Interrupt::Graceful
        } else {
            Interrupt::Force
        }
    }

    #[cfg(test)]
    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 运行同步循环直到 `stop` 被调用，返回执行的轮数
    pub async fn run(&self) -> usize {
        self.log.log("<<<<<<< Sync running >>>>>>>");
        self.log
            .log(&format!("Interval: {} seconds", self.options.interval_seconds));
        self.log.log("Press Ctrl+C for stopping and await...");

        let mut passes = 0;
        while !self.cancel.is_cancelled() {
            match self
                .engine
                .run_once(&self.options.source_path, &self.options.replica_path)
                .await
            {
                Ok(report) => debug!("第 {} 轮完成: {:?}", passes + 1, report),
                Err(e) => {
                    error!("同步失败: {:?}", e);
                    self.log.log(&format!("Critical error during sync: {}", e));
                }
            }
            passes += 1;

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.options.interval()) => {}
            }
        }

        self.log.log("<<<<<<< Sync stopped >>>>>>>");
        passes
    }
}
