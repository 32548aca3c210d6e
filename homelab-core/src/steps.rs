use crate::{HomelabError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

type UndoAction = Box<dyn FnOnce() -> Result<()> + Send>;

struct RecordedStep {
    name: String,
    undo: Option<UndoAction>,
}

/// 破坏性多步骤操作的步骤日志
///
/// 每完成一步记录一次，可为该步骤挂上撤销动作。出错或被中断时调用
/// [`rollback`](Self::rollback) 按相反顺序撤销已完成的步骤；全部成功后调用
/// [`commit`](Self::commit) 丢弃撤销动作并执行提交清理。
pub struct StepJournal {
    operation: String,
    cancel: CancellationToken,
    steps: Vec<RecordedStep>,
    on_commit: Vec<UndoAction>,
    finished: bool,
}

impl StepJournal {
    pub fn new(operation: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            operation: operation.into(),
            cancel,
            steps: Vec::new(),
            on_commit: Vec::new(),
            finished: false,
        }
    }

    /// 执行一个步骤，成功后记录
    ///
    /// 步骤本身不会被中途打断（文件系统改名、解压等操作打断后状态不可预测），
    /// 中断请求在步骤开始前和结束后检查；结束后发现中断时，该步骤已记录，
    /// 回滚会把它一并撤销。
    pub async fn run<T, F>(&mut self, name: &str, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.ensure_not_cancelled()?;
        tracing::debug!("[{}] 执行步骤: {}", self.operation, name);

        let output = step.await?;
        self.record(name);
        self.ensure_not_cancelled()?;
        Ok(output)
    }

    /// 记录一个已完成的步骤
    fn record(&mut self, name: &str) {
        self.steps.push(RecordedStep {
            name: name.to_string(),
            undo: None,
        });
    }

    /// 为最近完成的步骤挂上撤销动作
    pub fn push_undo<F>(&mut self, undo: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if let Some(step) = self.steps.last_mut() {
            step.undo = Some(Box::new(undo));
        }
    }

    /// 提交成功后执行的清理动作
    pub fn on_commit<F>(&mut self, action: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.on_commit.push(Box::new(action));
    }

    pub fn completed_steps(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(HomelabError::Interrupted);
        }
        Ok(())
    }

    /// 全部步骤成功：丢弃撤销动作，执行提交清理（失败只记录警告）
    pub fn commit(mut self) {
        self.finished = true;
        self.steps.clear();
        for action in std::mem::take(&mut self.on_commit) {
            if let Err(e) = action() {
                tracing::warn!("⚠️  [{}] 提交清理失败: {}", self.operation, e);
            }
        }
    }

    /// 按相反顺序撤销已完成的步骤，返回撤销失败的信息
    pub fn rollback(mut self) -> Vec<String> {
        self.finished = true;
        self.on_commit.clear();

        let mut failures = Vec::new();
        while let Some(step) = self.steps.pop() {
            let Some(undo) = step.undo else {
                continue;
            };
            tracing::info!("↩️  [{}] 撤销步骤: {}", self.operation, step.name);
            if let Err(e) = undo() {
                tracing::error!("❌ [{}] 撤销步骤 {} 失败: {}", self.operation, step.name, e);
                failures.push(format!("{}: {}", step.name, e));
            }
        }
        failures
    }
}

impl Drop for StepJournal {
    fn drop(&mut self) {
        if !self.finished && !self.steps.is_empty() {
            tracing::warn!(
                "⚠️  [{}] 步骤日志既未提交也未回滚，已完成: {:?}",
                self.operation,
                self.completed_steps()
            );
        }
    }
}
