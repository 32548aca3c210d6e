pub mod backup;
pub mod compose;
pub mod config;
pub mod constants;
pub mod container;
pub mod error;
pub mod hosts;
pub mod lifecycle;
pub mod lock;
pub mod logging;
pub mod migrate;
pub mod prompt;
pub mod steps;

pub use error::{HomelabError, Result};

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;
    use std::path::Path;
    use walkdir::WalkDir;

    /// 收集目录树：相对路径 -> 文件内容（目录为 None）
    pub(crate) fn snapshot_tree(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
        WalkDir::new(root)
            .into_iter()
            .map(|entry| entry.unwrap())
            .map(|entry| {
                let relative = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .to_string();
                let content = if entry.file_type().is_file() {
                    Some(std::fs::read(entry.path()).unwrap())
                } else {
                    None
                };
                (relative, content)
            })
            .collect()
    }
}
