use clap::{Parser, Subcommand};
use homelab_core::config::{ConfigOverrides, PortMapping};
use homelab_core::constants::{defaults, env};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "homelab-cli")]
#[command(about = "单个容器化服务的生命周期管理工具")]
#[command(version)]
#[command(
    long_about = "管理一个由 docker compose 编排的服务：初始化、启停、状态、日志、备份与恢复、迁移、更新、清理和卸载。\n不带子命令运行时进入交互式菜单。"
)]
pub struct Cli {
    /// 服务主目录
    #[arg(long, global = true, env = env::HOME)]
    pub home: Option<PathBuf>,

    /// 服务主机名（覆盖配置文件中的值）
    #[arg(long, global = true, env = env::HOSTNAME)]
    pub hostname: Option<String>,

    /// 所有确认提示自动回答 yes
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            home: self.home.clone(),
            hostname: self.hostname.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// 创建主目录、配置文件和 docker-compose.yml
    Setup {
        /// 覆盖已存在的配置文件和 compose 文件
        #[arg(long)]
        force: bool,
        /// 容器镜像
        #[arg(long)]
        image: Option<String>,
        /// 端口映射，格式 主机端口:容器端口[/协议]，可重复
        #[arg(long = "port", value_name = "HOST:CONTAINER[/PROTO]")]
        ports: Vec<PortMapping>,
        /// 内存上限，例如 4g
        #[arg(long)]
        memory: Option<String>,
    },
    /// 启动服务并等待就绪
    Start,
    /// 停止服务
    Stop,
    /// 重启服务
    Restart,
    /// 显示服务状态
    Status,
    /// 显示最近的服务日志
    Logs {
        /// 行数
        #[arg(default_value_t = defaults::LOG_LINES)]
        lines: u32,
    },
    /// 备份整个主目录（服务需在运行）
    Backup,
    /// 从归档恢复主目录
    Restore {
        /// 归档文件路径
        archive: PathBuf,
    },
    /// 列出所有已知位置中的备份
    ListBackups,
    /// 生成迁移包（归档 + 安装脚本）
    Migrate {
        /// 输出目录，默认在备份目录下新建 migration-<时间戳>
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 备份后拉取最新镜像并重建服务
    Update,
    /// 移除容器和卷，清理未使用的 Docker 资源
    Cleanup,
    /// 卸载服务并删除主目录
    Uninstall,
}

/// 支持的子命令，用于用法提示
pub const VERBS: &[&str] = &[
    "setup",
    "start",
    "stop",
    "restart",
    "status",
    "logs",
    "backup",
    "restore",
    "list-backups",
    "migrate",
    "update",
    "cleanup",
    "uninstall",
    "help",
];

/// 简短用法说明，参数错误时输出
pub fn usage() -> String {
    format!(
        "用法: homelab-cli [--home <PATH>] [--hostname <NAME>] [-y] [-v] <命令> [参数]\n\n可用命令: {}\n\n不带命令运行进入交互式菜单，使用 'homelab-cli help <命令>' 查看详细说明。",
        VERBS.join(" | ")
    )
}
