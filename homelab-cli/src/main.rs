use anyhow::Context;
use clap::Parser;
use homelab_cli::{
    Cli, CliApp, EXIT_INTERRUPTED, EXIT_OK, exit_code, log_file_path, parse_error_exit_code,
    run_menu, setup_logging, usage,
};
use homelab_core::config::default_home;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // 解析命令行参数，参数错误统一以 1 退出
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = parse_error_exit_code(&e);
            if code != EXIT_OK {
                eprintln!("\n{}", usage());
            }
            std::process::exit(code);
        }
    };

    // 设置日志记录
    let home = cli.home.clone().unwrap_or_else(default_home);
    let log_guard = setup_logging(cli.verbose, &log_file_path(&home));

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let result = run(cli, cancel.clone()).await;
    if let Err(e) = &result {
        if cancel.is_cancelled() {
            warn!("⚠️  操作已中断: {:#}", e);
        } else {
            error!("❌ 操作失败: {:#}", e);
        }
    }
    let code = exit_code(&result, cancel.is_cancelled());

    // process::exit 不会执行析构，先刷新日志文件
    drop(log_guard);
    std::process::exit(code);
}

async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut app = CliApp::new(&cli, cancel).context("加载配置失败")?;

    match cli.command {
        Some(command) => app.run_command(command).await?,
        None => run_menu(&mut app).await?,
    }
    Ok(())
}

/// 第一次 Ctrl-C 请求中断（当前步骤完成后回滚），第二次立即退出
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("⚠️  收到中断信号，正在停止当前操作（再按一次 Ctrl-C 立即退出）");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("❌ 再次收到中断信号，立即退出");
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
}
