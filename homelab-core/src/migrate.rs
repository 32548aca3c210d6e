use crate::config::AppConfig;
use crate::constants::{migration, network};
use crate::{HomelabError, Result};
use std::path::{Path, PathBuf};

/// 迁移包：归档 + 自包含安装脚本
#[derive(Debug, Clone)]
pub struct MigrationPackage {
    pub output_dir: PathBuf,
    pub archive: PathBuf,
    pub installer: PathBuf,
}

/// 安装脚本文件名
pub fn installer_file_name(service_name: &str) -> String {
    format!(
        "{}{}{}",
        migration::INSTALLER_PREFIX,
        service_name,
        migration::INSTALLER_EXTENSION
    )
}

/// 渲染安装脚本
pub fn render_installer(config: &AppConfig, archive_name: &str) -> String {
    const TEMPLATE: &str = include_str!("../templates/install.sh.template");

    let hosts_marker = format!("{}:{}", network::HOSTS_MARKER, config.service.name);
    TEMPLATE
        .replace("{service_name}", &config.service.name)
        .replace("{hostname}", &config.service.hostname)
        .replace("{archive_name}", archive_name)
        .replace("{home_name}", &config.home_name())
        .replace("{hosts_marker}", &hosts_marker)
        .replace(
            "{generated_at}",
            &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

/// 在归档旁写入可执行的安装脚本
pub fn write_installer(config: &AppConfig, archive: &Path) -> Result<PathBuf> {
    let archive_name = archive
        .file_name()
        .ok_or_else(|| HomelabError::migration("无法获取归档文件名"))?
        .to_string_lossy()
        .to_string();
    let output_dir = archive
        .parent()
        .ok_or_else(|| HomelabError::migration("无法获取归档所在目录"))?;

    let installer = output_dir.join(installer_file_name(&config.service.name));
    std::fs::write(&installer, render_installer(config, &archive_name))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&installer, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(installer)
}
