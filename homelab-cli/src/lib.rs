// 私有模块声明
mod app;
mod cli;
mod commands;
mod menu;
mod utils;

// 通过 pub use 精确控制对外暴露的接口
pub use app::CliApp;
pub use cli::{Cli, Commands, VERBS, usage};
pub use menu::run_menu;
pub use utils::{log_file_path, setup_logging};

use homelab_core::HomelabError;

/// 成功
pub const EXIT_OK: i32 = 0;
/// 任何致命错误
pub const EXIT_FAILURE: i32 = 1;
/// 被 Ctrl-C 中断
pub const EXIT_INTERRUPTED: i32 = 130;

/// 根据运行结果确定进程退出码
pub fn exit_code(result: &anyhow::Result<()>, interrupted: bool) -> i32 {
    match result {
        Err(e) if is_interrupted(e) => EXIT_INTERRUPTED,
        Err(_) => EXIT_FAILURE,
        Ok(()) if interrupted => EXIT_INTERRUPTED,
        Ok(()) => EXIT_OK,
    }
}

/// 参数解析失败时的退出码：帮助和版本信息为 0，其余为 1
pub fn parse_error_exit_code(error: &clap::Error) -> i32 {
    use clap::error::ErrorKind;
    match error.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => EXIT_OK,
        _ => EXIT_FAILURE,
    }
}

fn is_interrupted(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<HomelabError>(), Some(e) if e.is_interrupted()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Ok(()), false), EXIT_OK);
        assert_eq!(exit_code(&Ok(()), true), EXIT_INTERRUPTED);

        let fatal: anyhow::Result<()> = Err(HomelabError::not_running("gitlab").into());
        assert_eq!(exit_code(&fatal, false), EXIT_FAILURE);

        let interrupted: anyhow::Result<()> =
            Err(HomelabError::Interrupted).context("恢复失败");
        assert_eq!(exit_code(&interrupted, true), EXIT_INTERRUPTED);
    }

    fn parse_exit_code(args: &[&str]) -> i32 {
        use clap::Parser;
        match Cli::try_parse_from(args) {
            Ok(_) => EXIT_OK,
            Err(e) => parse_error_exit_code(&e),
        }
    }

    #[test]
    fn test_unknown_verb_exits_with_failure() {
        assert_eq!(parse_exit_code(&["homelab-cli", "explode"]), EXIT_FAILURE);
        assert_eq!(
            parse_exit_code(&["homelab-cli", "logs", "many"]),
            EXIT_FAILURE
        );
    }

    #[test]
    fn test_help_exits_with_success() {
        assert_eq!(parse_exit_code(&["homelab-cli", "--help"]), EXIT_OK);
        assert_eq!(parse_exit_code(&["homelab-cli", "help"]), EXIT_OK);
        assert_eq!(parse_exit_code(&["homelab-cli", "status"]), EXIT_OK);
    }
}
