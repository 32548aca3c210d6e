use crate::app::CliApp;
use homelab_core::Result;
use homelab_core::config::PortMapping;
use homelab_core::constants::network;
use homelab_core::lifecycle::SetupOptions;
use tracing::{info, warn};

/// 初始化主目录和配置
pub async fn run_setup(
    app: &mut CliApp,
    force: bool,
    image: Option<String>,
    ports: Vec<PortMapping>,
    memory_limit: Option<String>,
) -> Result<()> {
    info!("🛠️  初始化服务");
    info!("=============");

    let options = SetupOptions {
        force,
        image,
        ports,
        memory_limit,
    };
    let report = app.manager.setup(&options).await?;

    let config = app.config();
    info!("📁 主目录: {}", config.home.display());
    info!(
        "📝 配置文件: {} ({})",
        config.settings_file().display(),
        if report.settings_written { "已写入" } else { "未修改" }
    );
    info!(
        "🐳 Compose 文件: {} ({})",
        config.compose_file().display(),
        if report.compose_written { "已生成" } else { "未修改" }
    );
    info!("🖼️  镜像: {}", config.service.image);
    let ports: Vec<String> = config.service.ports.iter().map(|p| p.to_string()).collect();
    info!("🔌 端口: {}", ports.join(", "));
    if report.hosts_updated {
        info!(
            "🌐 hosts 条目: {} -> {}",
            config.service.hostname,
            network::LOCALHOST_IPV4
        );
    }
    if !report.warnings.is_empty() {
        warn!("⚠️  初始化完成，但有 {} 项需要手动处理（见上方警告）", report.warnings.len());
    }

    info!("💡 下一步: homelab-cli start");
    Ok(())
}
