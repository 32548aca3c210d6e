use super::types::{ComposeFlavor, DockerManager};
use crate::{HomelabError, Result};
use std::process::Stdio;
use tokio::process::Command;

impl DockerManager {
    /// 检查 Docker 状态
    pub async fn check_docker_status(&self) -> Result<()> {
        if which::which("docker").is_err() {
            return Err(HomelabError::missing_dependency(
                "Docker 未安装或不在 PATH 中",
            ));
        }

        let output = self.run_docker_command(&["info"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HomelabError::missing_dependency(format!(
                "Docker 服务未运行: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// 检查 Docker 和 Docker Compose 是否可用（不检查 compose 文件）
    pub async fn check_tooling(&self) -> Result<()> {
        self.check_docker_status().await?;
        self.compose_flavor().await?;
        Ok(())
    }

    /// 确定使用哪种 compose 命令，结果只探测一次
    pub(crate) async fn compose_flavor(&self) -> Result<ComposeFlavor> {
        if let Some(flavor) = self.compose_flavor.get() {
            return Ok(*flavor);
        }

        let plugin_available = self
            .run_docker_command(&["compose", "version"])
            .await
            .map(|output| output.status.success())
            .unwrap_or(false);
        let standalone_available = which::which("docker-compose").is_ok();

        let flavor = ComposeFlavor::select(plugin_available, standalone_available).ok_or_else(
            || HomelabError::missing_dependency("Docker Compose 未安装或不可用"),
        )?;
        tracing::debug!("使用 compose 实现: {:?}", flavor);
        Ok(*self.compose_flavor.get_or_init(|| flavor))
    }

    /// 执行 compose 命令
    pub(crate) async fn run_compose_command(&self, args: &[&str]) -> Result<std::process::Output> {
        match self.compose_flavor().await? {
            ComposeFlavor::Plugin => self.run_docker_compose_subcommand(args).await,
            ComposeFlavor::Standalone => self.run_docker_compose_standalone(args).await,
        }
    }

    /// 使用 docker compose 子命令
    async fn run_docker_compose_subcommand(&self, args: &[&str]) -> Result<std::process::Output> {
        let compose_path = self.compose_file.to_string_lossy().to_string();
        let mut cmd_args = vec!["compose", "-f", &compose_path];
        cmd_args.extend(args);

        self.run_docker_command(&cmd_args).await
    }

    /// 使用独立的 docker-compose 命令
    async fn run_docker_compose_standalone(&self, args: &[&str]) -> Result<std::process::Output> {
        let compose_path = self.compose_file.to_string_lossy().to_string();
        let mut cmd_args = vec!["-f", &compose_path];
        cmd_args.extend(args);

        tracing::debug!("执行: docker-compose {}", cmd_args.join(" "));
        let output = Command::new("docker-compose")
            .args(&cmd_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(output)
    }

    /// 执行 docker 命令
    pub(crate) async fn run_docker_command(&self, args: &[&str]) -> Result<std::process::Output> {
        tracing::debug!("执行: docker {}", args.join(" "));
        let output = Command::new("docker")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(output)
    }
}

/// 将失败的命令输出转换为错误
pub(crate) fn ensure_success(output: &std::process::Output, action: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(HomelabError::docker(format!("{action}失败: {}", stderr.trim())))
}
