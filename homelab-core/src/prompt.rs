use crate::Result;

/// 破坏性操作前的确认
pub trait Confirm: Send + Sync {
    /// 返回 true 表示用户明确同意
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// `--yes` 模式：所有确认自动通过
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        tracing::info!("{} (--yes: 自动确认)", question);
        Ok(true)
    }
}

/// 只有 y / yes（不区分大小写）视为同意
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" YES \n"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
    }
}
