//! 测试用的编排器假实现，记录每一次调用

use super::orchestrator::ContainerOrchestrator;
use super::types::{ExecOutput, HealthState, PruneTarget, ServiceInfo, ServiceStatus};
use crate::{HomelabError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct FakeState {
    running: bool,
    health: VecDeque<HealthState>,
    calls: Vec<String>,
    fail_exec: bool,
    fail_prune: bool,
    missing_dependency: bool,
}

#[derive(Debug)]
pub(crate) struct FakeOrchestrator {
    service: String,
    state: Mutex<FakeState>,
}

impl FakeOrchestrator {
    pub(crate) fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn running(self) -> Self {
        self.state.lock().unwrap().running = true;
        self
    }

    /// 依次返回的健康状态，耗尽后一直返回最后一个
    pub(crate) fn with_health(self, sequence: &[HealthState]) -> Self {
        self.state.lock().unwrap().health = sequence.iter().copied().collect();
        self
    }

    pub(crate) fn failing_exec(self) -> Self {
        self.state.lock().unwrap().fail_exec = true;
        self
    }

    pub(crate) fn failing_prune(self) -> Self {
        self.state.lock().unwrap().fail_prune = true;
        self
    }

    pub(crate) fn without_docker(self) -> Self {
        self.state.lock().unwrap().missing_dependency = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub(crate) fn is_up(&self) -> bool {
        self.state.lock().unwrap().running
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }

    fn next_health(&self) -> HealthState {
        let mut state = self.state.lock().unwrap();
        if state.health.len() > 1 {
            state.health.pop_front().unwrap_or(HealthState::Healthy)
        } else {
            state.health.front().copied().unwrap_or(HealthState::Healthy)
        }
    }
}

#[async_trait]
impl ContainerOrchestrator for FakeOrchestrator {
    async fn check_prerequisites(&self) -> Result<()> {
        if self.state.lock().unwrap().missing_dependency {
            return Err(HomelabError::missing_dependency("Docker 未安装或不在 PATH 中"));
        }
        Ok(())
    }

    async fn up(&self) -> Result<()> {
        self.record("up");
        self.state.lock().unwrap().running = true;
        Ok(())
    }

    async fn down(&self, remove_volumes: bool) -> Result<()> {
        self.record(if remove_volumes { "down -v" } else { "down" });
        self.state.lock().unwrap().running = false;
        Ok(())
    }

    async fn services(&self) -> Result<Vec<ServiceInfo>> {
        if !self.is_up() {
            return Ok(Vec::new());
        }
        Ok(vec![ServiceInfo {
            name: self.service.clone(),
            service: self.service.clone(),
            status: ServiceStatus::Running,
            health: self.next_health(),
            image: "example/image:latest".to_string(),
            ports: vec!["8080:80/tcp".to_string()],
        }])
    }

    async fn exec(&self, _service: &str, command: &[String]) -> Result<ExecOutput> {
        self.record(format!("exec {}", command.join(" ")));
        let success = !self.state.lock().unwrap().fail_exec;
        Ok(ExecOutput {
            success,
            stdout: "ok".to_string(),
            stderr: if success { String::new() } else { "boom".to_string() },
        })
    }

    async fn logs(&self, _service: &str, lines: u32) -> Result<String> {
        self.record(format!("logs {lines}"));
        Ok("log line\n".to_string())
    }

    async fn pull(&self) -> Result<()> {
        self.record("pull");
        Ok(())
    }

    async fn prune(&self, target: PruneTarget) -> Result<()> {
        self.record(format!("prune {}", target.docker_object()));
        if self.state.lock().unwrap().fail_prune {
            return Err(HomelabError::docker("prune failed"));
        }
        Ok(())
    }
}
