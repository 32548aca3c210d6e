use crate::constants::network;
use crate::Result;
use std::path::{Path, PathBuf};

/// hosts 文件中受管条目的维护
///
/// 每个服务最多一行，行尾带 `# managed-by-homelab:<服务名>` 标记，
/// 只增删带标记的行，其余内容保持原样。
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    service_name: String,
}

impl HostsFile {
    pub fn new<P: AsRef<Path>>(path: P, service_name: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            service_name: service_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn marker(&self) -> String {
        format!("{}:{}", network::HOSTS_MARKER, self.service_name)
    }

    fn is_managed_line(&self, line: &str) -> bool {
        let marker = self.marker();
        line.trim_end().ends_with(&marker)
    }

    /// 受管条目的完整文本
    pub fn entry_line(&self, address: &str, hostname: &str) -> String {
        format!("{address}\t{hostname}\t{}", self.marker())
    }

    /// 写入或更新受管条目，内容未变化时不写文件，返回是否修改
    pub fn apply(&self, address: &str, hostname: &str) -> Result<bool> {
        let content = self.read()?;
        let entry = self.entry_line(address, hostname);

        let mut lines: Vec<&str> = content
            .lines()
            .filter(|line| !self.is_managed_line(line))
            .collect();
        lines.push(&entry);
        let updated = join_lines(&lines);

        if updated == content {
            tracing::debug!("hosts 条目已是最新: {}", entry);
            return Ok(false);
        }

        std::fs::write(&self.path, updated)?;
        tracing::info!("已写入 hosts 条目: {} -> {}", hostname, address);
        Ok(true)
    }

    /// 移除受管条目，返回是否修改
    pub fn remove(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let content = self.read()?;
        let lines: Vec<&str> = content
            .lines()
            .filter(|line| !self.is_managed_line(line))
            .collect();
        let updated = join_lines(&lines);

        if updated == content {
            return Ok(false);
        }

        std::fs::write(&self.path, updated)?;
        tracing::info!("已移除 hosts 条目: {}", self.service_name);
        Ok(true)
    }

    /// 当前受管条目
    pub fn current_entry(&self) -> Result<Option<String>> {
        Ok(self
            .read()?
            .lines()
            .find(|line| self.is_managed_line(line))
            .map(str::to_string))
    }

    fn read(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn join_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut joined = lines.join("\n");
    joined.push('\n');
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_apply_is_idempotent_and_preserves_other_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "127.0.0.1\tlocalhost\n::1\tlocalhost\n").unwrap();

        let hosts = HostsFile::new(&path, "gitlab");
        assert!(hosts.apply("127.0.0.1", "gitlab.local").unwrap());
        assert!(!hosts.apply("127.0.0.1", "gitlab.local").unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("127.0.0.1\tlocalhost\n::1\tlocalhost\n"));
        assert_eq!(content.matches("gitlab.local").count(), 1);
    }

    #[test]
    fn test_apply_replaces_previous_address() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        let hosts = HostsFile::new(&path, "jellyfin");

        hosts.apply("127.0.0.1", "jellyfin.local").unwrap();
        hosts.apply("192.168.1.20", "jellyfin.local").unwrap();

        let entry = hosts.current_entry().unwrap().unwrap();
        assert!(entry.starts_with("192.168.1.20"));
    }

    #[test]
    fn test_remove_only_touches_own_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "127.0.0.1\tlocalhost\n").unwrap();

        let gitlab = HostsFile::new(&path, "gitlab");
        let jellyfin = HostsFile::new(&path, "jellyfin");
        gitlab.apply("127.0.0.1", "gitlab.local").unwrap();
        jellyfin.apply("127.0.0.1", "jellyfin.local").unwrap();

        assert!(gitlab.remove().unwrap());
        assert!(!gitlab.remove().unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("gitlab.local"));
        assert!(content.contains("jellyfin.local"));
        assert!(content.contains("localhost"));
    }
}
