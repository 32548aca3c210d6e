use crate::app::CliApp;
use homelab_core::Result;
use homelab_core::backup::{ArchiveEntry, format_size};
use homelab_core::lifecycle::{Confirmation, StartOutcome};
use std::path::Path;
use tracing::info;

/// 创建备份
pub async fn run_backup(app: &CliApp) -> Result<()> {
    info!("💾 创建数据备份");
    info!("===============");

    let archive = app.manager.backup().await?;
    let size = std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
    info!("📦 备份文件: {}", archive.display());
    info!("📏 大小: {}", format_size(size));
    info!("💡 恢复: homelab-cli restore {}", archive.display());
    Ok(())
}

/// 从归档恢复
pub async fn run_restore(app: &CliApp, archive: &Path) -> Result<()> {
    info!("♻️  从备份恢复");
    info!("=============");

    match app.manager.restore(archive, app.confirm.as_ref()).await? {
        Confirmation::Declined => {}
        Confirmation::Done(report) => {
            if let Some(safety) = &report.safety_backup {
                info!("💾 恢复前的状态已保存到: {}", safety.display());
            }
            if report.start == (StartOutcome::Started { healthy: false }) {
                info!("💡 服务仍在启动，可用 homelab-cli status 跟踪");
            }
        }
    }
    Ok(())
}

/// 列出备份
pub fn run_list_backups(app: &CliApp) -> Result<()> {
    let entries = app.manager.list_backups()?;

    if entries.is_empty() {
        info!("📦 未找到任何备份，查找位置:");
        for location in app.manager.backup_locations() {
            info!("   {}", location.display());
        }
        info!("💡 创建备份: homelab-cli backup");
        return Ok(());
    }

    info!("📦 备份列表 ({} 个):", entries.len());
    for (index, entry) in entries.iter().enumerate() {
        info!("{}", describe_entry(index + 1, entry));
    }
    Ok(())
}

pub(crate) fn describe_entry(index: usize, entry: &ArchiveEntry) -> String {
    let created = entry
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "未知时间".to_string());
    format!(
        "  {:>2}. [{}] {} {} {}",
        index,
        entry.kind.display_name(),
        created,
        format_size(entry.size),
        entry.path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use homelab_core::backup::BackupKind;
    use std::path::PathBuf;

    #[test]
    fn test_describe_entry_includes_kind_time_and_path() {
        let entry = ArchiveEntry {
            path: PathBuf::from("/srv/gitlab-home-backups/gitlab-backup-20260301-101500.tar.gz"),
            kind: BackupKind::Manual,
            created_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                .and_then(|d| d.and_hms_opt(10, 15, 0)),
            size: 2048,
        };

        let line = describe_entry(3, &entry);
        assert!(line.contains(" 3."));
        assert!(line.contains("2026-03-01 10:15:00"));
        assert!(line.contains(BackupKind::Manual.display_name()));
        assert!(line.ends_with("gitlab-backup-20260301-101500.tar.gz"));
    }
}
