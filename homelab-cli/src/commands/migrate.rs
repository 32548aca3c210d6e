use crate::app::CliApp;
use homelab_core::Result;
use std::path::PathBuf;
use tracing::info;

/// 生成迁移包
pub async fn run_migrate(app: &CliApp, output: Option<PathBuf>) -> Result<()> {
    info!("🚚 生成迁移包");
    info!("=============");

    let package = app.manager.migrate(output).await?;
    let installer_name = package
        .installer
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    info!("📦 归档: {}", package.archive.display());
    info!("📜 安装脚本: {}", package.installer.display());
    info!("💡 在新机器上:");
    info!("   1. 复制整个目录 {} 到新机器", package.output_dir.display());
    info!("   2. 执行 ./{} [目标主目录的上级目录]", installer_name);
    Ok(())
}
