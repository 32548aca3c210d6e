use crate::config::{HealthCheckConfig, ServiceConfig};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// docker-compose.yml 的声明式结构（只包含本工具生成的字段）
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ComposeService {
    pub image: String,
    pub container_name: String,
    pub hostname: String,
    pub restart: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shm_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_reservation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthCheck>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ComposeHealthCheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_period: Option<String>,
}

impl From<&HealthCheckConfig> for ComposeHealthCheck {
    fn from(check: &HealthCheckConfig) -> Self {
        Self {
            test: check.test.clone(),
            interval: check.interval.clone(),
            timeout: check.timeout.clone(),
            retries: check.retries,
            start_period: check.start_period.clone(),
        }
    }
}

impl ComposeFile {
    /// 根据服务配置生成 compose 定义
    ///
    /// 卷使用相对于主目录的路径，整个主目录移动后 compose 文件仍然有效。
    pub fn from_service(service: &ServiceConfig) -> Self {
        let compose_service = ComposeService {
            image: service.image.clone(),
            container_name: service.name.clone(),
            hostname: service.hostname.clone(),
            restart: service.restart.clone(),
            shm_size: service.shm_size.clone(),
            mem_limit: service.memory_limit.clone(),
            mem_reservation: service.memory_reservation.clone(),
            ports: service
                .ports
                .iter()
                .map(|p| p.to_compose_string())
                .collect(),
            volumes: service
                .volumes
                .iter()
                .map(|v| format!("./{}:{}", v.host.trim_start_matches("./"), v.container))
                .collect(),
            environment: service.environment.clone(),
            healthcheck: service.healthcheck.as_ref().map(ComposeHealthCheck::from),
        };

        let mut services = BTreeMap::new();
        services.insert(service.name.clone(), compose_service);
        Self { services }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// 写入 compose 文件
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = format!(
            "# 由 homelab-cli setup 生成，请勿手动修改\n{}",
            self.to_yaml()?
        );
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortMapping;

    #[test]
    fn test_compose_generation_from_default_service() {
        let mut service = ServiceConfig::default();
        service.ports.push("1900:1900/udp".parse::<PortMapping>().unwrap());

        let yaml = ComposeFile::from_service(&service).to_yaml().unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let svc = &value["services"]["gitlab"];

        assert_eq!(svc["image"].as_str(), Some("gitlab/gitlab-ce:latest"));
        assert_eq!(svc["container_name"].as_str(), Some("gitlab"));
        assert_eq!(svc["mem_limit"].as_str(), Some("4g"));
        assert_eq!(svc["ports"][0].as_str(), Some("80:80"));
        assert_eq!(svc["ports"][3].as_str(), Some("1900:1900/udp"));
        assert_eq!(svc["volumes"][0].as_str(), Some("./config:/etc/gitlab"));
        assert_eq!(svc["healthcheck"]["retries"].as_u64(), Some(5));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let mut service = ServiceConfig::default();
        service.memory_limit = None;
        service.healthcheck = None;
        service.environment.clear();

        let yaml = ComposeFile::from_service(&service).to_yaml().unwrap();
        assert!(!yaml.contains("mem_limit"));
        assert!(!yaml.contains("healthcheck"));
        assert!(!yaml.contains("environment"));
    }
}
