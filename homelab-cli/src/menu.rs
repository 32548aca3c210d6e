use crate::app::CliApp;
use crate::cli::{Commands, usage};
use crate::commands;
use crate::utils::prompt_line;
use homelab_core::backup::ArchiveEntry;
use homelab_core::constants::defaults;
use homelab_core::{HomelabError, Result};
use std::path::PathBuf;
use tracing::{error, info};

/// 菜单项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Setup,
    Start,
    Stop,
    Restart,
    Status,
    Logs,
    Backup,
    Restore,
    ListBackups,
    Migrate,
    Update,
    Cleanup,
    Uninstall,
    Help,
    Exit,
}

const ENTRIES: &[(&str, MenuChoice, &str)] = &[
    ("1", MenuChoice::Setup, "初始化 (setup)"),
    ("2", MenuChoice::Start, "启动 (start)"),
    ("3", MenuChoice::Stop, "停止 (stop)"),
    ("4", MenuChoice::Restart, "重启 (restart)"),
    ("5", MenuChoice::Status, "状态 (status)"),
    ("6", MenuChoice::Logs, "日志 (logs)"),
    ("7", MenuChoice::Backup, "备份 (backup)"),
    ("8", MenuChoice::Restore, "恢复 (restore)"),
    ("9", MenuChoice::ListBackups, "备份列表 (list-backups)"),
    ("10", MenuChoice::Migrate, "生成迁移包 (migrate)"),
    ("11", MenuChoice::Update, "更新 (update)"),
    ("12", MenuChoice::Cleanup, "清理 (cleanup)"),
    ("13", MenuChoice::Uninstall, "卸载 (uninstall)"),
    ("14", MenuChoice::Help, "帮助 (help)"),
    ("0", MenuChoice::Exit, "退出"),
];

/// 解析菜单输入：编号或子命令名，`q` 退出
pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    let input = input.trim().to_lowercase();
    if input == "q" || input == "quit" || input == "exit" {
        return Some(MenuChoice::Exit);
    }
    ENTRIES.iter().find_map(|(key, choice, label)| {
        let verb = label
            .split_once('(')
            .and_then(|(_, rest)| rest.strip_suffix(')'));
        (input == *key || verb == Some(input.as_str())).then_some(*choice)
    })
}

/// 恢复时的归档选择：列表编号或文件路径
pub fn resolve_archive(input: &str, entries: &[ArchiveEntry]) -> Option<PathBuf> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.parse::<usize>() {
        Ok(index) if index >= 1 => entries.get(index - 1).map(|e| e.path.clone()),
        Ok(_) => None,
        Err(_) => Some(PathBuf::from(input)),
    }
}

fn print_menu(app: &CliApp) {
    println!();
    println!(
        "==== {} 服务管理 ({}) ====",
        app.config().service.name,
        app.config().home.display()
    );
    for (key, _, label) in ENTRIES {
        println!("  {key:>2}) {label}");
    }
}

/// 交互式菜单，直到用户选择退出
///
/// 单个操作失败只报告错误，菜单继续；中断会结束菜单。
pub async fn run_menu(app: &mut CliApp) -> Result<()> {
    loop {
        print_menu(app);
        let Some(input) = prompt_line("请选择操作: ", &app.cancel)? else {
            // stdin 已关闭
            return Ok(());
        };

        let Some(choice) = parse_choice(&input) else {
            println!("无效选择: {input}");
            continue;
        };
        if choice == MenuChoice::Exit {
            info!("👋 再见");
            return Ok(());
        }

        match run_choice(app, choice).await {
            Ok(()) => {}
            Err(HomelabError::Interrupted) => return Err(HomelabError::Interrupted),
            Err(e) => error!("❌ 操作失败: {}", e),
        }
    }
}

async fn run_choice(app: &mut CliApp, choice: MenuChoice) -> Result<()> {
    let command = match choice {
        MenuChoice::Setup => Commands::Setup {
            force: false,
            image: None,
            ports: Vec::new(),
            memory: None,
        },
        MenuChoice::Start => Commands::Start,
        MenuChoice::Stop => Commands::Stop,
        MenuChoice::Restart => Commands::Restart,
        MenuChoice::Status => Commands::Status,
        MenuChoice::Logs => {
            let answer = prompt_line(
                &format!("显示行数 [{}]: ", defaults::LOG_LINES),
                &app.cancel,
            )?
            .unwrap_or_default();
            let lines = answer.parse().unwrap_or(defaults::LOG_LINES);
            Commands::Logs { lines }
        }
        MenuChoice::Backup => Commands::Backup,
        MenuChoice::Restore => {
            let entries = app.manager.list_backups()?;
            commands::run_list_backups(app)?;
            let answer = prompt_line("输入备份编号或归档路径（留空取消）: ", &app.cancel)?
                .unwrap_or_default();
            let Some(archive) = resolve_archive(&answer, &entries) else {
                info!("已取消");
                return Ok(());
            };
            Commands::Restore { archive }
        }
        MenuChoice::ListBackups => Commands::ListBackups,
        MenuChoice::Migrate => Commands::Migrate { output: None },
        MenuChoice::Update => Commands::Update,
        MenuChoice::Cleanup => Commands::Cleanup,
        MenuChoice::Uninstall => Commands::Uninstall,
        MenuChoice::Help => {
            println!("{}", usage());
            return Ok(());
        }
        MenuChoice::Exit => return Ok(()),
    };

    app.run_command(command).await
}
