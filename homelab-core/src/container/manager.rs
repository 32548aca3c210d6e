use super::types::DockerManager;
use std::path::Path;
use std::sync::OnceLock;

impl DockerManager {
    /// 创建新的 Docker 管理器
    ///
    /// 不在创建时检查文件存在性，setup 之前也可以构造。
    pub fn new<P: AsRef<Path>>(compose_file: P) -> Self {
        Self {
            compose_file: compose_file.as_ref().to_path_buf(),
            compose_flavor: OnceLock::new(),
        }
    }

    /// 检查 Docker Compose 文件是否存在
    pub fn compose_file_exists(&self) -> bool {
        self.compose_file.exists()
    }
}
