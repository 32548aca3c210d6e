use std::path::PathBuf;
use std::sync::OnceLock;

/// 容器运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    Unknown,
}

impl ServiceStatus {
    /// 从 compose 的 State 字段解析
    pub fn from_state(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "running" | "up" => ServiceStatus::Running,
            "exited" | "stopped" | "created" | "dead" | "paused" => ServiceStatus::Stopped,
            _ => ServiceStatus::Unknown,
        }
    }

    /// 获取状态的中文显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "运行中",
            ServiceStatus::Stopped => "已停止",
            ServiceStatus::Unknown => "未知",
        }
    }
}

/// 容器健康检查状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Starting,
    Unhealthy,
    /// 未配置健康检查
    None,
}

impl HealthState {
    pub fn from_health(health: &str) -> Self {
        match health.to_lowercase().as_str() {
            "healthy" => HealthState::Healthy,
            "starting" => HealthState::Starting,
            "unhealthy" => HealthState::Unhealthy,
            _ => HealthState::None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HealthState::Healthy => "健康",
            HealthState::Starting => "启动中",
            HealthState::Unhealthy => "不健康",
            HealthState::None => "无健康检查",
        }
    }
}

/// Docker 服务信息（进程表中的一行）
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    /// 容器名
    pub name: String,
    /// compose 服务名
    pub service: String,
    pub status: ServiceStatus,
    pub health: HealthState,
    pub image: String,
    pub ports: Vec<String>,
}

impl ServiceInfo {
    pub fn is_running(&self) -> bool {
        self.status == ServiceStatus::Running
    }

    /// 是否属于指定的 compose 服务
    pub fn matches(&self, service_name: &str) -> bool {
        self.service == service_name || self.name == service_name
    }
}

/// 容器内命令的执行结果
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// 可清理的编排器资源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneTarget {
    Images,
    Networks,
    Volumes,
}

impl PruneTarget {
    pub fn docker_object(&self) -> &'static str {
        match self {
            PruneTarget::Images => "image",
            PruneTarget::Networks => "network",
            PruneTarget::Volumes => "volume",
        }
    }
}

/// 可用的 compose 实现
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose` 插件
    Plugin,
    /// 独立的 `docker-compose` 命令
    Standalone,
}

impl ComposeFlavor {
    /// 优先使用插件，其次是独立命令
    pub fn select(plugin_available: bool, standalone_available: bool) -> Option<Self> {
        if plugin_available {
            Some(ComposeFlavor::Plugin)
        } else if standalone_available {
            Some(ComposeFlavor::Standalone)
        } else {
            None
        }
    }
}

/// Docker 服务管理器
#[derive(Debug, Clone)]
pub struct DockerManager {
    pub(crate) compose_file: PathBuf,
    /// 第一次检查工具链时确定
    pub(crate) compose_flavor: OnceLock<ComposeFlavor>,
}
