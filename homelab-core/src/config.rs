use crate::constants::{backup, defaults, layout, timeout};
use crate::error::{HomelabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 应用配置结构
///
/// 进程启动时加载一次，之后以引用形式传给每个处理函数。
/// `home` 不写入配置文件，由所在目录决定，因此整个主目录可以被迁移。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(skip)]
    pub home: PathBuf,
    pub service: ServiceConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub hosts: HostsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// 被管理服务的定义，用于生成 docker-compose.yml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    /// 服务名，同时作为容器名
    pub name: String,
    pub hostname: String,
    pub image: String,
    pub restart: String,
    pub memory_limit: Option<String>,
    pub memory_reservation: Option<String>,
    pub shm_size: Option<String>,
    /// 容器内备份命令，例如 `gitlab-backup create`
    pub backup_command: Option<Vec<String>>,
    /// 容器内进程监管状态命令，例如 `gitlab-ctl status`
    pub status_command: Option<Vec<String>>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub healthcheck: Option<HealthCheckConfig>,
}

/// 端口映射
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

/// 卷挂载：主目录内相对路径 -> 容器内路径
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host: String,
    pub container: String,
}

/// 容器健康检查配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    pub start_period: Option<String>,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BackupConfig {
    /// 备份归档存放目录，未设置时为 `<主目录>-backups`
    pub storage_dir: Option<PathBuf>,
}

/// 主机网络配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HostsConfig {
    pub file: PathBuf,
    /// 是否写入 hosts 条目
    pub enabled: bool,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(defaults::HOSTS_FILE),
            enabled: true,
        }
    }
}

/// 超时配置（秒）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeoutConfig {
    pub health_check_interval: u64,
    pub start_timeout: u64,
    pub restart_delay: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            health_check_interval: timeout::HEALTH_CHECK_INTERVAL,
            start_timeout: timeout::SERVICE_START_TIMEOUT,
            restart_delay: timeout::RESTART_INTERVAL,
        }
    }
}

impl TimeoutConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay)
    }
}

/// 命令行/环境变量提供的覆盖项
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub home: Option<PathBuf>,
    pub hostname: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: defaults::SERVICE_NAME.to_string(),
            hostname: defaults::HOSTNAME.to_string(),
            image: defaults::IMAGE.to_string(),
            restart: defaults::RESTART_POLICY.to_string(),
            memory_limit: Some(defaults::MEMORY_LIMIT.to_string()),
            memory_reservation: Some(defaults::MEMORY_RESERVATION.to_string()),
            shm_size: Some(defaults::SHM_SIZE.to_string()),
            backup_command: Some(vec!["gitlab-backup".to_string(), "create".to_string()]),
            status_command: Some(vec!["gitlab-ctl".to_string(), "status".to_string()]),
            ports: vec![
                PortMapping::tcp(80, 80),
                PortMapping::tcp(443, 443),
                PortMapping::tcp(2222, 22),
            ],
            volumes: vec![
                VolumeMount::new(layout::CONFIG_DIR_NAME, "/etc/gitlab"),
                VolumeMount::new(layout::LOGS_DIR_NAME, "/var/log/gitlab"),
                VolumeMount::new(layout::DATA_DIR_NAME, "/var/opt/gitlab"),
                VolumeMount::new(layout::BACKUPS_DIR_NAME, "/var/opt/gitlab/backups"),
            ],
            environment: BTreeMap::new(),
            healthcheck: Some(HealthCheckConfig {
                test: vec![
                    "CMD".to_string(),
                    "/opt/gitlab/bin/gitlab-healthcheck".to_string(),
                    "--fail".to_string(),
                    "--max-time".to_string(),
                    "10".to_string(),
                ],
                interval: "60s".to_string(),
                timeout: "30s".to_string(),
                retries: 5,
                start_period: Some("600s".to_string()),
            }),
        }
    }
}

impl PortMapping {
    pub fn tcp(host: u16, container: u16) -> Self {
        Self {
            host,
            container,
            protocol: default_protocol(),
        }
    }

    /// compose 文件中的端口映射写法
    pub fn to_compose_string(&self) -> String {
        if self.protocol == "tcp" {
            format!("{}:{}", self.host, self.container)
        } else {
            format!("{}:{}/{}", self.host, self.container, self.protocol)
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.container, self.protocol)
    }
}

/// 解析 `8080:80`、`8080:80/udp` 形式的端口映射
impl FromStr for PortMapping {
    type Err = HomelabError;

    fn from_str(s: &str) -> Result<Self> {
        let (ports, protocol) = match s.split_once('/') {
            Some((ports, proto)) => (ports, proto.to_lowercase()),
            None => (s, default_protocol()),
        };
        if protocol != "tcp" && protocol != "udp" {
            return Err(HomelabError::custom(format!("不支持的端口协议: {protocol}")));
        }

        let (host, container) = ports
            .split_once(':')
            .ok_or_else(|| HomelabError::custom(format!("端口映射格式错误: {s}，应为 主机端口:容器端口")))?;
        let parse = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|e| HomelabError::custom(format!("无效端口 '{p}': {e}")))
        };

        Ok(Self {
            host: parse(host)?,
            container: parse(container)?,
            protocol,
        })
    }
}

impl VolumeMount {
    pub fn new(host: &str, container: &str) -> Self {
        Self {
            host: host.to_string(),
            container: container.to_string(),
        }
    }
}

/// 默认主目录：~/gitlab-home
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(defaults::HOME_DIR_NAME)
}

impl AppConfig {
    /// 为指定主目录创建默认配置
    pub fn default_for_home<P: AsRef<Path>>(home: P) -> Self {
        Self {
            home: home.as_ref().to_path_buf(),
            service: ServiceConfig::default(),
            backup: BackupConfig::default(),
            hosts: HostsConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// 加载配置：主目录来自覆盖项或默认值，其余字段来自主目录下的 homelab.toml
    ///
    /// 主机名覆盖项优先于配置文件中的值。
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let home = overrides.home.clone().unwrap_or_else(default_home);
        let home = std::path::absolute(&home)?;

        let settings_file = home.join(layout::SETTINGS_FILE_NAME);
        let mut config = if settings_file.exists() {
            tracing::debug!("找到配置文件: {}", settings_file.display());
            Self::load_from_file(&settings_file, &home)?
        } else {
            tracing::debug!("未找到配置文件，使用默认配置: {}", settings_file.display());
            Self::default_for_home(&home)
        };

        if let Some(hostname) = &overrides.hostname {
            config.service.hostname = hostname.clone();
        }

        Ok(config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P, home: &Path) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.home = home.to_path_buf();
        Ok(config)
    }

    /// 保存配置到主目录下的 homelab.toml
    pub fn save(&self) -> Result<()> {
        let content = format!(
            "# Homelab 服务配置，由 setup 生成\n# 修改后需重新执行 'homelab-cli setup --force' 以重新生成 docker-compose.yml\n\n{}",
            toml::to_string_pretty(self)?
        );
        fs::write(self.settings_file(), content)?;
        Ok(())
    }

    pub fn settings_file(&self) -> PathBuf {
        self.home.join(layout::SETTINGS_FILE_NAME)
    }

    pub fn compose_file(&self) -> PathBuf {
        self.home.join(layout::COMPOSE_FILE_NAME)
    }

    /// 主目录的上级目录
    pub fn home_parent(&self) -> PathBuf {
        self.home
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// 主目录名，用作归档内的顶层目录
    pub fn home_name(&self) -> String {
        self.home
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.service.name.clone())
    }

    /// 备份归档存放目录（位于主目录之外）
    pub fn backup_dir(&self) -> PathBuf {
        self.backup.storage_dir.clone().unwrap_or_else(|| {
            self.home_parent()
                .join(format!("{}{}", self.home_name(), backup::STORAGE_DIR_SUFFIX))
        })
    }

    /// 主目录内的备份工具输出目录
    pub fn home_backups_dir(&self) -> PathBuf {
        self.home.join(layout::BACKUPS_DIR_NAME)
    }

    /// 创建主目录及其子目录
    pub fn ensure_home_dirs(&self) -> Result<()> {
        for dir in layout::HOME_SUBDIRS {
            fs::create_dir_all(self.home.join(dir))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_port_mapping_parse() {
        let port: PortMapping = "8080:80".parse().unwrap();
        assert_eq!(port, PortMapping::tcp(8080, 80));
        assert_eq!(port.to_compose_string(), "8080:80");

        let udp: PortMapping = "53:53/UDP".parse().unwrap();
        assert_eq!(udp.protocol, "udp");
        assert_eq!(udp.to_compose_string(), "53:53/udp");

        assert!("8080".parse::<PortMapping>().is_err());
        assert!("8080:80/sctp".parse::<PortMapping>().is_err());
        assert!("99999:80".parse::<PortMapping>().is_err());
    }

    #[test]
    fn test_load_without_settings_uses_defaults_and_overrides() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("svc");

        let config = AppConfig::load(&ConfigOverrides {
            home: Some(home.clone()),
            hostname: Some("git.example.lan".to_string()),
        })
        .unwrap();

        assert_eq!(config.home, home);
        assert_eq!(config.service.hostname, "git.example.lan");
        assert_eq!(config.service.image, defaults::IMAGE);
        assert_eq!(config.backup_dir(), dir.path().join("svc-backups"));
    }

    #[test]
    fn test_save_and_load_keeps_service_definition() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("jellyfin");
        let mut config = AppConfig::default_for_home(&home);
        config.service.name = "jellyfin".to_string();
        config.service.ports = vec![PortMapping::tcp(8096, 8096)];
        config
            .service
            .environment
            .insert("TZ".to_string(), "UTC".to_string());
        config.ensure_home_dirs().unwrap();
        config.save().unwrap();

        let loaded = AppConfig::load(&ConfigOverrides {
            home: Some(home.clone()),
            hostname: None,
        })
        .unwrap();
        assert_eq!(loaded.service, config.service);
        assert_eq!(loaded.home, home);
    }

    #[test]
    fn test_ensure_home_dirs_creates_layout() {
        let dir = tempdir().unwrap();
        let config = AppConfig::default_for_home(dir.path().join("home"));
        config.ensure_home_dirs().unwrap();

        for sub in layout::HOME_SUBDIRS {
            assert!(config.home.join(sub).is_dir(), "缺少目录 {sub}");
        }
    }
}
