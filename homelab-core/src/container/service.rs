use super::command::ensure_success;
use super::orchestrator::ContainerOrchestrator;
use super::types::{ComposeFlavor, DockerManager, ExecOutput, HealthState, PruneTarget, ServiceInfo, ServiceStatus};
use crate::{HomelabError, Result};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
impl ContainerOrchestrator for DockerManager {
    async fn check_prerequisites(&self) -> Result<()> {
        self.check_tooling().await
    }

    async fn up(&self) -> Result<()> {
        self.ensure_ready().await?;
        let output = self.run_compose_command(&["up", "-d"]).await?;
        ensure_success(&output, "启动服务")
    }

    async fn down(&self, remove_volumes: bool) -> Result<()> {
        self.ensure_ready().await?;
        let args: &[&str] = if remove_volumes {
            &["down", "--volumes", "--remove-orphans"]
        } else {
            &["down"]
        };
        let output = self.run_compose_command(args).await?;
        ensure_success(&output, "停止服务")
    }

    async fn services(&self) -> Result<Vec<ServiceInfo>> {
        self.ensure_ready().await?;
        let output = self
            .run_compose_command(&["ps", "--all", "--format", "json"])
            .await?;
        ensure_success(&output, "获取服务状态")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        self.parse_service_info(&stdout)
    }

    async fn exec(&self, service: &str, command: &[String]) -> Result<ExecOutput> {
        self.ensure_ready().await?;
        let mut args = vec!["exec", "-T", service];
        args.extend(command.iter().map(String::as_str));

        let output = self.run_compose_command(&args).await?;
        Ok(ExecOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn logs(&self, service: &str, lines: u32) -> Result<String> {
        self.ensure_ready().await?;
        let lines = lines.to_string();
        let output = self
            .run_compose_command(&["logs", "--no-color", "--tail", &lines, service])
            .await?;
        ensure_success(&output, "获取日志")?;

        // compose 会把部分日志写到 stderr
        let mut logs = String::from_utf8_lossy(&output.stdout).to_string();
        logs.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(logs)
    }

    async fn pull(&self) -> Result<()> {
        self.ensure_ready().await?;
        let output = self.run_compose_command(&["pull"]).await?;
        ensure_success(&output, "拉取镜像")
    }

    async fn prune(&self, target: PruneTarget) -> Result<()> {
        self.check_tooling().await?;
        let output = self
            .run_docker_command(&[target.docker_object(), "prune", "-f"])
            .await?;
        ensure_success(&output, &format!("清理 {} 资源", target.docker_object()))
    }
}

impl DockerManager {
    /// compose 文件存在且工具链可用
    async fn ensure_ready(&self) -> Result<()> {
        if !self.compose_file_exists() {
            return Err(HomelabError::NotFound(self.compose_file.clone()));
        }
        self.check_tooling().await
    }

    /// 解析 `docker compose ps --format json` 的输出
    ///
    /// 新版 compose 每行一个 JSON 对象，旧版输出一个 JSON 数组，两种都支持。
    pub(crate) fn parse_service_info(&self, json_output: &str) -> Result<Vec<ServiceInfo>> {
        let trimmed = json_output.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Value> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)?
        } else {
            trimmed
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match serde_json::from_str::<Value>(line) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!("解析服务 JSON 失败: {}, 内容: {}", e, line);
                        None
                    }
                })
                .collect()
        };

        Ok(values.iter().map(service_info_from_json).collect())
    }
}

fn service_info_from_json(service_json: &Value) -> ServiceInfo {
    let text = |key: &str| service_json[key].as_str().unwrap_or("").to_string();

    let name = text("Name");
    let service = match service_json["Service"].as_str() {
        Some(service) => service.to_string(),
        None => name.clone(),
    };

    // 新版输出 Publishers 数组，旧版输出 Ports 字符串
    let ports = match service_json["Publishers"].as_array() {
        Some(publishers) => publishers
            .iter()
            .filter(|p| p["PublishedPort"].as_u64().unwrap_or(0) > 0)
            .map(|p| {
                format!(
                    "{}:{}/{}",
                    p["PublishedPort"].as_u64().unwrap_or(0),
                    p["TargetPort"].as_u64().unwrap_or(0),
                    p["Protocol"].as_str().unwrap_or("tcp")
                )
            })
            .collect(),
        None => text("Ports")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    };

    ServiceInfo {
        name,
        service,
        status: ServiceStatus::from_state(&text("State")),
        health: HealthState::from_health(&text("Health")),
        image: text("Image"),
        ports,
    }
}
