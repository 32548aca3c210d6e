use crate::constants::lock;
use crate::{HomelabError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 主目录的建议性排他锁
///
/// 锁文件位于主目录旁边（`.<主目录名>.lock`），restore 和 uninstall 会移动或删除
/// 主目录本身。锁随 guard 一起释放，包括出错和中断返回的路径。
#[derive(Debug)]
pub struct HomeLock {
    file: File,
    path: PathBuf,
}

impl HomeLock {
    /// 主目录对应的锁文件路径
    pub fn lock_path(home: &Path) -> PathBuf {
        let name = home
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "homelab".to_string());
        let parent = home.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!(".{name}{}", lock::LOCK_FILE_SUFFIX))
    }

    /// 非阻塞地获取排他锁，已被其他进程持有时返回 [`HomelabError::Locked`]
    pub fn acquire(home: &Path) -> Result<Self> {
        let path = Self::lock_path(home);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(e) = file.try_lock_exclusive() {
            let owner = std::fs::read_to_string(&path).unwrap_or_default();
            tracing::debug!("获取锁失败: {} (kind: {:?})", e, e.kind());
            return Err(HomelabError::Locked(format!(
                "另一个 homelab-cli 进程（PID {}）正在操作 {}",
                owner.trim(),
                home.display()
            )));
        }

        // 写入 PID 便于排查
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());
        tracing::debug!("已获取操作锁: {}", path.display());

        Ok(Self { file, path })
    }

    /// 删除锁文件后释放锁，用于主目录已被卸载的场景
    pub fn remove(self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        tracing::debug!("已删除锁文件: {}", self.path.display());
        Ok(())
    }
}

impl Drop for HomeLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("释放操作锁失败: {}", e);
        } else {
            tracing::debug!("已释放操作锁: {}", self.path.display());
        }
    }
}
