use clap::error::ErrorKind;
use clap::Parser;
use foldersync_lib::config::usage;
use foldersync_lib::logging::init_tracing;
use foldersync_lib::{build_service, Cli, Interrupt, SyncOptions};
use std::process::ExitCode;
use std::sync::Arc;

/// 组装服务、注册 Ctrl+C 处理并运行同步循环
async fn run(options: SyncOptions) -> anyhow::Result<usize> {
    let service = Arc::new(build_service(options)?);

    // 第一次 Ctrl+C 等当前一轮结束后停止，第二次立即退出
    let signal_service = service.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("无法监听 Ctrl+C: {}", e);
                return;
            }
            if signal_service.interrupt() == Interrupt::Force {
                tracing::warn!("再次收到 Ctrl+C，立即退出");
                std::process::exit(130);
            }
        }
    });

    Ok(service.run().await)
}

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化诊断日志
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            println!("{}", usage());
            return ExitCode::from(2);
        }
    };

    let options = match SyncOptions::try_from(cli) {
        Ok(options) => options,
        Err(e) => {
            println!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    match run(options).await {
        Ok(passes) => {
            tracing::debug!("共执行 {} 轮同步", passes);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
