use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HomelabError>;

#[derive(Error, Debug)]
pub enum HomelabError {
    #[error("配置解析错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("配置序列化错误: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Compose 文件错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("目录遍历错误: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("路径错误: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("缺少依赖: {0}")]
    MissingDependency(String),

    #[error("服务未运行: {0}")]
    NotRunning(String),

    #[error("文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Docker 命令执行失败: {0}")]
    Docker(String),

    #[error("备份操作失败: {0}")]
    Backup(String),

    #[error("迁移操作失败: {0}")]
    Migration(String),

    #[error("无法获取操作锁: {0}")]
    Locked(String),

    #[error("操作被中断")]
    Interrupted,

    #[error("自定义错误: {0}")]
    Custom(String),
}

impl HomelabError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn docker(msg: impl Into<String>) -> Self {
        Self::Docker(msg.into())
    }

    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }

    pub fn migration(msg: impl Into<String>) -> Self {
        Self::Migration(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn not_running(msg: impl Into<String>) -> Self {
        Self::NotRunning(msg.into())
    }

    /// 是否由用户中断（Ctrl-C）引起
    pub fn is_interrupted(&self) -> bool {
        matches!(self, HomelabError::Interrupted)
    }
}
