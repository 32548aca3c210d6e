use crate::app::CliApp;
use homelab_core::Result;
use homelab_core::lifecycle::Confirmation;
use tracing::{info, warn};

/// 更新镜像
pub async fn run_update(app: &CliApp) -> Result<()> {
    info!("⬆️  更新服务");
    info!("===========");

    let report = app.manager.update().await?;
    info!("💾 更新前备份: {}", report.backup.display());
    if !report.healthy {
        info!("💡 服务仍在启动，可用 homelab-cli status 跟踪");
    }
    info!(
        "💡 如需回退: homelab-cli restore {}",
        report.backup.display()
    );
    Ok(())
}

/// 清理容器和未使用的 Docker 资源
pub async fn run_cleanup(app: &CliApp) -> Result<()> {
    info!("🧹 清理 Docker 资源");
    info!("==================");

    let report = app.manager.cleanup().await?;
    if !report.warnings.is_empty() {
        warn!("⚠️  {} 项清理未成功（见上方警告）", report.warnings.len());
    }
    Ok(())
}

/// 卸载服务
pub async fn run_uninstall(app: &CliApp) -> Result<()> {
    info!("🗑️  卸载服务");
    info!("===========");

    match app.manager.uninstall(app.confirm.as_ref()).await? {
        Confirmation::Declined => {}
        Confirmation::Done(report) => {
            match &report.final_backup {
                Some(backup) => info!("💾 最终备份: {}", backup.display()),
                None => warn!("⚠️  未能创建最终备份"),
            }
            if !report.warnings.is_empty() {
                warn!("⚠️  {} 项需要手动处理（见上方警告）", report.warnings.len());
            }
        }
    }
    Ok(())
}
