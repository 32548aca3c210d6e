use crate::constants::backup;
use crate::{HomelabError, Result};
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// 备份类型，决定文件名中的标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Manual,
    PreRestore,
    PreUpdate,
    PreUninstall,
    Migration,
}

impl BackupKind {
    pub const ALL: [BackupKind; 5] = [
        BackupKind::Manual,
        BackupKind::PreRestore,
        BackupKind::PreUpdate,
        BackupKind::PreUninstall,
        BackupKind::Migration,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BackupKind::Manual => "backup",
            BackupKind::PreRestore => "pre-restore",
            BackupKind::PreUpdate => "pre-update",
            BackupKind::PreUninstall => "pre-uninstall",
            BackupKind::Migration => "migration",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BackupKind::Manual => "手动",
            BackupKind::PreRestore => "恢复前",
            BackupKind::PreUpdate => "更新前",
            BackupKind::PreUninstall => "卸载前",
            BackupKind::Migration => "迁移",
        }
    }
}

/// 已发现的备份归档
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub kind: BackupKind,
    pub created_at: Option<NaiveDateTime>,
    pub size: u64,
}

/// 备份管理器：把整个主目录打包为 tar.gz，或从归档解出主目录
#[derive(Debug, Clone)]
pub struct BackupManager {
    service_name: String,
}

impl BackupManager {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// 归档文件名：`<服务名>-<类型>-<YYYYMMDD-HHMMSS>.tar.gz`
    pub fn archive_name(&self, kind: BackupKind, timestamp: &NaiveDateTime) -> String {
        format!(
            "{}-{}-{}{}",
            self.service_name,
            kind.label(),
            timestamp.format(backup::TIMESTAMP_FORMAT),
            backup::ARCHIVE_EXTENSION
        )
    }

    /// 在目标目录中选择一个不存在的归档路径，同一秒内重复时追加 `-N`
    pub fn unique_archive_path(&self, dest_dir: &Path, kind: BackupKind) -> PathBuf {
        let name = self.archive_name(kind, &Local::now().naive_local());
        let candidate = dest_dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }

        let stem = name.trim_end_matches(backup::ARCHIVE_EXTENSION);
        (1..)
            .map(|n| dest_dir.join(format!("{stem}-{n}{}", backup::ARCHIVE_EXTENSION)))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }

    /// 创建主目录的完整归档，返回归档路径
    pub async fn create_archive(
        &self,
        home: &Path,
        dest_dir: &Path,
        kind: BackupKind,
    ) -> Result<PathBuf> {
        if !home.is_dir() {
            return Err(HomelabError::NotFound(home.to_path_buf()));
        }
        if dest_dir.starts_with(home) {
            return Err(HomelabError::backup(format!(
                "备份目录不能位于主目录内: {}",
                dest_dir.display()
            )));
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let archive_path = self.unique_archive_path(dest_dir, kind);

        tracing::info!("开始创建备份: {}", archive_path.display());
        let source = home.to_path_buf();
        let target = archive_path.clone();
        tokio::task::spawn_blocking(move || archive_directory(&source, &target)).await??;
        tracing::info!("备份创建成功: {}", archive_path.display());

        Ok(archive_path)
    }

    /// 列出多个位置中属于本服务的归档，按时间倒序
    pub fn list_archives(&self, locations: &[PathBuf]) -> Result<Vec<ArchiveEntry>> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for location in locations {
            if !location.is_dir() {
                tracing::debug!("备份位置不存在，跳过: {}", location.display());
                continue;
            }
            for dir_entry in WalkDir::new(location).max_depth(2) {
                let dir_entry = match dir_entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("读取备份目录失败: {}", e);
                        continue;
                    }
                };
                if !dir_entry.file_type().is_file() {
                    continue;
                }
                let file_name = dir_entry.file_name().to_string_lossy().to_string();
                let Some((kind, created_at)) = self.parse_archive_name(&file_name) else {
                    continue;
                };
                let path = dir_entry.path().to_path_buf();
                if !seen.insert(path.clone()) {
                    continue;
                }
                let size = dir_entry.metadata().map(|m| m.len()).unwrap_or(0);
                entries.push(ArchiveEntry {
                    path,
                    kind,
                    created_at,
                    size,
                });
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// 从文件名解析备份类型和时间戳
    pub fn parse_archive_name(&self, file_name: &str) -> Option<(BackupKind, Option<NaiveDateTime>)> {
        let rest = file_name
            .strip_prefix(&self.service_name)?
            .strip_prefix('-')?
            .strip_suffix(backup::ARCHIVE_EXTENSION)?;

        BackupKind::ALL.iter().find_map(|kind| {
            let stamp = rest.strip_prefix(kind.label())?.strip_prefix('-')?;
            // 去掉同秒冲突时追加的 -N
            let stamp = stamp.get(..15).unwrap_or(stamp);
            let created_at = NaiveDateTime::parse_from_str(stamp, backup::TIMESTAMP_FORMAT).ok();
            Some((*kind, created_at))
        })
    }
}

/// 把目录打包为 `<目录名>/...` 结构的 tar.gz
///
/// 先写入临时文件再改名，失败时不会留下不完整的归档。
pub fn archive_directory(source: &Path, archive_path: &Path) -> Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::File;
    use tar::Builder;

    let top_name = source
        .file_name()
        .ok_or_else(|| HomelabError::backup("无法获取目录名"))?
        .to_string_lossy()
        .to_string();

    let partial_path = archive_path.with_extension("partial");
    let result = (|| -> Result<()> {
        let file = File::create(&partial_path)?;
        let encoder = GzEncoder::new(file, Compression::new(backup::COMPRESSION_LEVEL));
        let mut archive = Builder::new(encoder);
        archive.follow_symlinks(false);

        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry?;
            let relative = entry.path().strip_prefix(source)?;

            // 运行中的服务会在数据目录里留下 socket，tar 无法归档，跳过
            if is_socket(&entry) {
                tracing::debug!("跳过 socket 文件: {}", entry.path().display());
                continue;
            }

            // tar 归档内部使用 Unix 风格路径
            let archive_name = if relative.as_os_str().is_empty() {
                top_name.clone()
            } else {
                format!(
                    "{}/{}",
                    top_name,
                    relative.to_string_lossy().replace('\\', "/")
                )
            };

            if entry.file_type().is_dir() {
                archive
                    .append_dir(&archive_name, entry.path())
                    .map_err(|e| HomelabError::backup(format!("添加目录到归档失败: {e}")))?;
            } else {
                archive
                    .append_path_with_name(entry.path(), &archive_name)
                    .map_err(|e| HomelabError::backup(format!("添加文件到归档失败: {e}")))?;
            }
        }

        let encoder = archive
            .into_inner()
            .map_err(|e| HomelabError::backup(format!("完成归档失败: {e}")))?;
        encoder.finish()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            std::fs::rename(&partial_path, archive_path)?;
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&partial_path);
            Err(e)
        }
    }
}

#[cfg(unix)]
fn is_socket(entry: &walkdir::DirEntry) -> bool {
    use std::os::unix::fs::FileTypeExt;
    entry.file_type().is_socket()
}

#[cfg(not(unix))]
fn is_socket(_entry: &walkdir::DirEntry) -> bool {
    false
}

/// 校验归档可读，并返回唯一的顶层目录名
pub fn inspect_archive(archive_path: &Path) -> Result<String> {
    use flate2::read::GzDecoder;
    use std::fs::File;
    use tar::Archive;

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut top_level: Option<String> = None;

    for entry in archive
        .entries()
        .map_err(|e| HomelabError::backup(format!("读取归档失败: {e}")))?
    {
        let entry = entry.map_err(|e| HomelabError::backup(format!("归档已损坏: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| HomelabError::backup(format!("归档条目路径无效: {e}")))?
            .to_path_buf();

        let mut components = path.components();
        let first = match components.next() {
            Some(Component::Normal(name)) => name.to_string_lossy().to_string(),
            _ => {
                return Err(HomelabError::backup(format!(
                    "归档包含不安全的路径: {}",
                    path.display()
                )));
            }
        };
        if components.any(|c| matches!(c, Component::ParentDir)) {
            return Err(HomelabError::backup(format!(
                "归档包含不安全的路径: {}",
                path.display()
            )));
        }

        match &top_level {
            None => top_level = Some(first),
            Some(existing) if *existing != first => {
                return Err(HomelabError::backup(format!(
                    "归档包含多个顶层目录: {existing}, {first}"
                )));
            }
            Some(_) => {}
        }
    }

    top_level.ok_or_else(|| HomelabError::backup("归档为空"))
}

/// 把归档解压到暂存目录，返回解出的顶层目录路径
pub async fn unpack_archive(archive_path: &Path, staging_dir: &Path) -> Result<PathBuf> {
    let archive_path = archive_path.to_path_buf();
    let staging_dir = staging_dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        use flate2::read::GzDecoder;
        use std::fs::File;
        use tar::Archive;

        let top_level = inspect_archive(&archive_path)?;

        let file = File::open(&archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive.set_preserve_permissions(true);
        // 只有以 root 运行时才会真正恢复属主（与 GNU tar 一致）
        archive.set_preserve_ownerships(true);
        archive
            .unpack(&staging_dir)
            .map_err(|e| HomelabError::backup(format!("解压归档失败: {e}")))?;

        Ok::<PathBuf, HomelabError>(staging_dir.join(top_level))
    })
    .await?
}

/// 估算目录大小（字节）
pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// 人类可读的文件大小
pub fn format_size(size: u64) -> String {
    if size > 1024 * 1024 * 1024 {
        format!("{:.1}GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if size > 1024 * 1024 {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    } else if size > 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else {
        format!("{size}B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::test_support::snapshot_tree;
    use tempfile::tempdir;

    fn populate(home: &Path) {
        std::fs::create_dir_all(home.join("config")).unwrap();
        std::fs::create_dir_all(home.join("data/repos/a.git")).unwrap();
        std::fs::create_dir_all(home.join("logs")).unwrap();
        std::fs::write(home.join("config/gitlab.rb"), "external_url 'http://gitlab.local'").unwrap();
        std::fs::write(home.join("data/repos/a.git/HEAD"), "ref: refs/heads/main\n").unwrap();
    }

    #[test]
    fn test_archive_name_format() {
        let manager = BackupManager::new("gitlab");
        let ts = NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap();
        assert_eq!(
            manager.archive_name(BackupKind::Manual, &ts),
            "gitlab-backup-20260307-040506.tar.gz"
        );

        let (kind, parsed) = manager
            .parse_archive_name("gitlab-pre-restore-20260307-040506-2.tar.gz")
            .unwrap();
        assert_eq!(kind, BackupKind::PreRestore);
        assert_eq!(parsed, Some(ts));
        assert!(manager.parse_archive_name("jellyfin-backup-20260307-040506.tar.gz").is_none());
    }

    #[tokio::test]
    async fn test_archive_and_unpack_reproduce_tree() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("gitlab-home");
        populate(&home);
        let before = snapshot_tree(&home);

        let manager = BackupManager::new("gitlab");
        let archive = manager
            .create_archive(&home, &dir.path().join("backups"), BackupKind::Manual)
            .await
            .unwrap();
        assert!(archive.exists());
        assert_eq!(inspect_archive(&archive).unwrap(), "gitlab-home");

        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let restored = unpack_archive(&archive, &staging).await.unwrap();
        assert_eq!(snapshot_tree(&restored), before);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_archive_skips_sockets_of_running_service() {
        use std::os::unix::net::UnixListener;

        let dir = tempdir().unwrap();
        let home = dir.path().join("gitlab-home");
        populate(&home);
        std::fs::create_dir_all(home.join("data/redis")).unwrap();
        let socket = home.join("data/redis/redis.socket");
        let _listener = UnixListener::bind(&socket).unwrap();

        let manager = BackupManager::new("gitlab");
        let archive = manager
            .create_archive(&home, &dir.path().join("backups"), BackupKind::Manual)
            .await
            .unwrap();

        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let restored = unpack_archive(&archive, &staging).await.unwrap();
        assert!(restored.join("data/redis").is_dir());
        assert!(!restored.join("data/redis/redis.socket").exists());
        assert_eq!(
            std::fs::read_to_string(restored.join("config/gitlab.rb")).unwrap(),
            "external_url 'http://gitlab.local'"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unpack_restores_ownership_when_root() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempdir().unwrap();
        let home = dir.path().join("gitlab-home");
        populate(&home);
        let owned = home.join("config/gitlab.rb");
        // 非 root 无法修改属主，此时跳过
        if std::os::unix::fs::chown(&owned, Some(996), Some(996)).is_err() {
            return;
        }

        let manager = BackupManager::new("gitlab");
        let archive = manager
            .create_archive(&home, &dir.path().join("backups"), BackupKind::Manual)
            .await
            .unwrap();

        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let restored = unpack_archive(&archive, &staging).await.unwrap();
        let metadata = std::fs::metadata(restored.join("config/gitlab.rb")).unwrap();
        assert_eq!(metadata.uid(), 996);
        assert_eq!(metadata.gid(), 996);
    }

    #[tokio::test]
    async fn test_backup_dir_inside_home_is_rejected() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        populate(&home);

        let manager = BackupManager::new("gitlab");
        let result = manager
            .create_archive(&home, &home.join("backups"), BackupKind::Manual)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_archives_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("store");
        std::fs::create_dir_all(&store).unwrap();
        std::fs::write(store.join("gitlab-backup-20250101-000000.tar.gz"), b"x").unwrap();
        std::fs::write(store.join("gitlab-pre-update-20260101-000000.tar.gz"), b"xy").unwrap();
        std::fs::write(store.join("notes.txt"), b"ignored").unwrap();
        std::fs::write(store.join("other-backup-20260101-000000.tar.gz"), b"ignored").unwrap();

        let manager = BackupManager::new("gitlab");
        let entries = manager
            .list_archives(&[store.clone(), store.clone(), dir.path().join("missing")])
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, BackupKind::PreUpdate);
        assert_eq!(entries[0].size, 2);
        assert_eq!(entries[1].kind, BackupKind::Manual);
    }

    #[test]
    fn test_list_archives_empty() {
        let dir = tempdir().unwrap();
        let manager = BackupManager::new("gitlab");
        assert!(manager.list_archives(&[dir.path().to_path_buf()]).unwrap().is_empty());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
    }
}
