use homelab_core::constants::env;
use homelab_core::prompt::{Confirm, is_affirmative};
use homelab_core::{HomelabError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;

/// # 日志
///
/// 库代码只使用 `tracing` 宏，日志配置只在入口处完成：
///
/// - 终端：简洁格式，不显示时间和模块路径
/// - 文件：追加写入，带时间戳、级别和模块路径，不含 ANSI 颜色，不自动轮转
///
/// 日志级别由 `RUST_LOG` 控制，未设置时默认 info，`-v` 时为 debug。
/// 文件路径取 `HOMELAB_LOG_FILE`，未设置时为主目录旁的 `<主目录名>-manager.log`。
///
/// ```bash
/// RUST_LOG=homelab_core::container=debug homelab-cli status
/// HOMELAB_LOG_FILE=/var/log/gitlab-manager.log homelab-cli backup
/// ```
///
/// 返回的 guard 必须持有到进程退出前，否则文件中的最后几行可能丢失。
pub fn setup_logging(verbose: bool, log_file: &Path) -> Option<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer()
        .with_target(false)
        .with_thread_names(false)
        .with_line_number(false)
        .without_time()
        .compact();

    match open_log_file(log_file) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .init();
            tracing::warn!(
                "⚠️  无法打开日志文件 {}: {}，日志只输出到终端",
                log_file.display(),
                e
            );
            None
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

/// 日志文件路径
pub fn log_file_path(home: &Path) -> PathBuf {
    if let Some(path) = std::env::var_os(env::LOG_FILE) {
        return PathBuf::from(path);
    }

    let home = std::path::absolute(home).unwrap_or_else(|_| home.to_path_buf());
    let name = home
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "homelab".to_string());
    let parent = home.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{name}-manager.log"))
}

/// 读取一行输入，等待期间响应中断；输入结束（EOF）时返回 `None`
pub fn prompt_line(prompt: &str, cancel: &CancellationToken) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    // 在线程中读取 stdin，主流程轮询中断信号
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let result = std::io::stdin().read_line(&mut line).map(|n| (n, line));
        let _ = tx.send(result);
    });

    loop {
        if cancel.is_cancelled() {
            println!();
            return Err(HomelabError::Interrupted);
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok((0, _))) => return Ok(None),
            Ok(Ok((_, line))) => return Ok(Some(line.trim().to_string())),
            Ok(Err(e)) => return Err(e.into()),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
        }
    }
}

/// 交互式确认，只有 y/yes 视为同意
pub struct StdinConfirm {
    cancel: CancellationToken,
}

impl StdinConfirm {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = prompt_line(&format!("⚠️  {question} [y/N]: "), &self.cancel)?;
        Ok(answer.as_deref().is_some_and(is_affirmative))
    }
}
