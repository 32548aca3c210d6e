use crate::app::CliApp;
use homelab_core::Result;
use homelab_core::backup::format_size;
use homelab_core::lifecycle::{StartOutcome, StopOutcome};
use tracing::{info, warn};

/// 启动服务
pub async fn run_start(app: &CliApp) -> Result<()> {
    let outcome = app.manager.start().await?;
    report_start(app, outcome);
    Ok(())
}

pub(crate) fn report_start(app: &CliApp, outcome: StartOutcome) {
    match outcome {
        StartOutcome::AlreadyRunning => {
            info!("💡 查看状态: homelab-cli status");
        }
        StartOutcome::Started { healthy: true } => {
            info!("🌐 访问地址: http://{}", app.config().service.hostname);
        }
        StartOutcome::Started { healthy: false } => {
            info!("💡 服务首次启动可能需要数分钟，可用以下命令跟踪进度:");
            info!("   homelab-cli status");
            info!("   homelab-cli logs");
        }
    }
}

/// 停止服务
pub async fn run_stop(app: &CliApp) -> Result<()> {
    if app.manager.stop().await? == StopOutcome::NotRunning {
        info!("💡 启动服务: homelab-cli start");
    }
    Ok(())
}

/// 重启服务
pub async fn run_restart(app: &CliApp) -> Result<()> {
    let outcome = app.manager.restart().await?;
    report_start(app, outcome);
    Ok(())
}

/// 显示服务状态，任何查询失败都只显示为警告
pub async fn run_status(app: &CliApp) -> Result<()> {
    let report = app.manager.status().await;

    info!("📊 服务状态");
    info!("==========");
    info!("服务: {}", report.service_name);
    info!(
        "主目录: {} ({})",
        report.home.display(),
        if report.home_exists { "存在" } else { "不存在" }
    );

    if report.containers.is_empty() {
        info!("🐳 容器: 无");
    } else {
        info!("🐳 容器:");
        for container in &report.containers {
            info!(
                "   - {} [{}] 健康: {} 镜像: {}",
                container.name,
                container.status.display_name(),
                container.health.display_name(),
                container.image
            );
            if !container.ports.is_empty() {
                info!("     端口: {}", container.ports.join(", "));
            }
        }
    }

    if let Some(supervisor) = &report.supervisor {
        info!("🔧 服务内部状态:");
        for line in supervisor.lines().filter(|l| !l.trim().is_empty()) {
            info!("   {}", line);
        }
    }

    if let Some(size) = report.disk_usage {
        info!("💾 磁盘占用: {}", format_size(size));
    }

    match report.address {
        Some(address) => info!(
            "🌐 访问地址: http://{} (本机地址 {})",
            report.hostname, address
        ),
        None => info!("🌐 访问地址: http://{}", report.hostname),
    }
    if let Some(entry) = &report.hosts_entry {
        info!("📇 hosts 条目: {}", entry);
    }

    for warning in &report.warnings {
        warn!("⚠️  {}", warning);
    }
    Ok(())
}

/// 输出最近的日志
pub async fn run_logs(app: &CliApp, lines: u32) -> Result<()> {
    info!("📜 最近 {} 行日志:", lines);
    let logs = app.manager.logs(lines).await?;
    // 日志内容直接输出到 stdout，便于管道处理
    print!("{logs}");
    Ok(())
}
