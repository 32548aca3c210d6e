// 模块声明
mod command;
#[cfg(test)]
pub(crate) mod fake;
mod manager;
mod orchestrator;
mod service;
mod types;

// 重新导出公共API
pub use orchestrator::ContainerOrchestrator;
pub use types::{ComposeFlavor, DockerManager, ExecOutput, HealthState, PruneTarget, ServiceInfo, ServiceStatus};
