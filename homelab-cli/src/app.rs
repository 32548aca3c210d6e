use crate::cli::{Cli, Commands};
use crate::commands;
use crate::utils::StdinConfirm;
use homelab_core::config::AppConfig;
use homelab_core::container::DockerManager;
use homelab_core::lifecycle::ServiceManager;
use homelab_core::prompt::{AssumeYes, Confirm};
use homelab_core::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct CliApp {
    pub manager: ServiceManager<DockerManager>,
    pub confirm: Box<dyn Confirm>,
    pub cancel: CancellationToken,
}

impl CliApp {
    /// 加载配置（只加载一次）并创建各管理器
    pub fn new(cli: &Cli, cancel: CancellationToken) -> Result<Self> {
        let config = AppConfig::load(&cli.overrides())?;
        debug!(
            "服务 {}，主目录 {}",
            config.service.name,
            config.home.display()
        );

        let docker_manager = DockerManager::new(config.compose_file());
        let manager = ServiceManager::new(config, docker_manager, cancel.clone());
        let confirm: Box<dyn Confirm> = if cli.yes {
            Box::new(AssumeYes)
        } else {
            Box::new(StdinConfirm::new(cancel.clone()))
        };

        Ok(Self {
            manager,
            confirm,
            cancel,
        })
    }

    pub fn config(&self) -> &AppConfig {
        self.manager.config()
    }

    /// 运行应用命令
    pub async fn run_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Setup {
                force,
                image,
                ports,
                memory,
            } => commands::run_setup(self, force, image, ports, memory).await,
            Commands::Start => commands::run_start(self).await,
            Commands::Stop => commands::run_stop(self).await,
            Commands::Restart => commands::run_restart(self).await,
            Commands::Status => commands::run_status(self).await,
            Commands::Logs { lines } => commands::run_logs(self, lines).await,
            Commands::Backup => commands::run_backup(self).await,
            Commands::Restore { archive } => commands::run_restore(self, &archive).await,
            Commands::ListBackups => commands::run_list_backups(self),
            Commands::Migrate { output } => commands::run_migrate(self, output).await,
            Commands::Update => commands::run_update(self).await,
            Commands::Cleanup => commands::run_cleanup(self).await,
            Commands::Uninstall => commands::run_uninstall(self).await,
        }
    }
}
