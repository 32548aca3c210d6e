use super::types::{ExecOutput, PruneTarget, ServiceInfo};
use crate::Result;
use async_trait::async_trait;

/// 容器编排能力
///
/// 生命周期管理器只通过这个接口与容器运行时交互，
/// 生产环境由 [`DockerManager`](super::DockerManager) 实现，测试中使用假实现。
#[async_trait]
pub trait ContainerOrchestrator: Send + Sync {
    /// 检查运行时及 compose 工具是否可用
    async fn check_prerequisites(&self) -> Result<()>;

    /// 后台启动全部服务
    async fn up(&self) -> Result<()>;

    /// 停止并移除容器，`remove_volumes` 为 true 时同时移除卷
    async fn down(&self, remove_volumes: bool) -> Result<()>;

    /// 进程表
    async fn services(&self) -> Result<Vec<ServiceInfo>>;

    /// 在服务容器内执行命令
    async fn exec(&self, service: &str, command: &[String]) -> Result<ExecOutput>;

    /// 获取最近 `lines` 行日志
    async fn logs(&self, service: &str, lines: u32) -> Result<String>;

    /// 拉取最新镜像
    async fn pull(&self) -> Result<()>;

    /// 清理编排器级别的未使用资源
    async fn prune(&self, target: PruneTarget) -> Result<()>;

    /// 获取指定服务的进程表条目
    async fn service_info(&self, service: &str) -> Result<Option<ServiceInfo>> {
        Ok(self
            .services()
            .await?
            .into_iter()
            .find(|info| info.matches(service)))
    }

    /// 指定服务是否正在运行
    async fn is_running(&self, service: &str) -> Result<bool> {
        Ok(self
            .service_info(service)
            .await?
            .map(|info| info.is_running())
            .unwrap_or(false))
    }
}
