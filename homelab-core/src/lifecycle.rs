use crate::backup::{self, ArchiveEntry, BackupKind, BackupManager};
use crate::compose::ComposeFile;
use crate::config::{AppConfig, PortMapping};
use crate::constants::{backup as backup_consts, migration, network};
use crate::container::{ContainerOrchestrator, HealthState, PruneTarget, ServiceInfo};
use crate::hosts::HostsFile;
use crate::lock::HomeLock;
use crate::migrate::{self, MigrationPackage};
use crate::prompt::Confirm;
use crate::steps::StepJournal;
use crate::{success, HomelabError, Result};
use chrono::Local;
use std::net::{IpAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// setup 的可选参数，只在生成新配置（或 `--force`）时生效
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub force: bool,
    pub image: Option<String>,
    pub ports: Vec<PortMapping>,
    pub memory_limit: Option<String>,
}

impl SetupOptions {
    fn has_overrides(&self) -> bool {
        self.image.is_some() || !self.ports.is_empty() || self.memory_limit.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub settings_written: bool,
    pub compose_written: bool,
    pub hosts_updated: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyRunning,
    /// `healthy` 为 false 表示超时仍未就绪（服务仍在启动中）
    Started { healthy: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped,
}

/// 需要确认的操作结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation<T> {
    Done(T),
    Declined,
}

/// 状态报告，各项查询失败只降级为警告
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub service_name: String,
    pub hostname: String,
    pub home: PathBuf,
    pub home_exists: bool,
    pub containers: Vec<ServiceInfo>,
    pub supervisor: Option<String>,
    pub disk_usage: Option<u64>,
    pub address: Option<IpAddr>,
    pub hosts_entry: Option<String>,
    pub warnings: Vec<String>,
}

impl StatusReport {
    pub fn is_running(&self) -> bool {
        self.containers
            .iter()
            .any(|c| c.matches(&self.service_name) && c.is_running())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub archive: PathBuf,
    pub safety_backup: Option<PathBuf>,
    pub start: StartOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub backup: PathBuf,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub final_backup: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// 单个容器化服务的生命周期管理器
pub struct ServiceManager<O: ContainerOrchestrator> {
    config: AppConfig,
    orchestrator: O,
    backup_manager: BackupManager,
    hosts: HostsFile,
    cancel: CancellationToken,
}

impl<O: ContainerOrchestrator> ServiceManager<O> {
    pub fn new(config: AppConfig, orchestrator: O, cancel: CancellationToken) -> Self {
        let backup_manager = BackupManager::new(&config.service.name);
        let hosts = HostsFile::new(&config.hosts.file, &config.service.name);
        Self {
            config,
            orchestrator,
            backup_manager,
            hosts,
            cancel,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &O {
        &self.orchestrator
    }

    fn service_name(&self) -> &str {
        &self.config.service.name
    }

    fn lock(&self) -> Result<HomeLock> {
        HomeLock::acquire(&self.config.home)
    }

    /// 可被中断的等待
    async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(HomelabError::Interrupted),
        }
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(HomelabError::Interrupted);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // setup
    // ---------------------------------------------------------------

    /// 初始化主目录、配置文件和 compose 文件
    ///
    /// 已存在的文件只有在 `force` 时才会重写，重复执行不会改变已有配置。
    pub async fn setup(&mut self, options: &SetupOptions) -> Result<SetupReport> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;
        let mut report = SetupReport::default();

        info!("📁 初始化主目录: {}", self.config.home.display());
        self.config.ensure_home_dirs()?;

        let settings_exists = self.config.settings_file().exists();
        if !settings_exists || options.force {
            if let Some(image) = &options.image {
                self.config.service.image = image.clone();
            }
            if !options.ports.is_empty() {
                self.config.service.ports = options.ports.clone();
            }
            if let Some(memory) = &options.memory_limit {
                self.config.service.memory_limit = Some(memory.clone());
            }
            self.config.save()?;
            report.settings_written = true;
            info!("📝 已写入配置文件: {}", self.config.settings_file().display());
        } else {
            if options.has_overrides() {
                let warning = "配置文件已存在，--image/--port/--memory 参数被忽略（使用 --force 重新生成）";
                warn!("⚠️  {}", warning);
                report.warnings.push(warning.to_string());
            }
            info!("配置文件已存在，保持不变: {}", self.config.settings_file().display());
        }

        let compose_file = self.config.compose_file();
        if !compose_file.exists() || options.force {
            ComposeFile::from_service(&self.config.service).write_to(&compose_file)?;
            report.compose_written = true;
            info!("📝 已生成 compose 文件: {}", compose_file.display());
        } else {
            info!("compose 文件已存在，保持不变: {}", compose_file.display());
        }

        match self.apply_hosts_entry() {
            Ok(updated) => report.hosts_updated = updated,
            Err(warning) => report.warnings.push(warning),
        }

        success!("初始化完成: {}", self.config.home.display());
        Ok(report)
    }

    /// 写入 hosts 条目（尽力而为），失败时返回警告文本
    fn apply_hosts_entry(&self) -> std::result::Result<bool, String> {
        if !self.config.hosts.enabled {
            debug!("hosts 条目管理已禁用");
            return Ok(false);
        }
        self.hosts
            .apply(network::LOCALHOST_IPV4, &self.config.service.hostname)
            .map_err(|e| {
                let warning = format!(
                    "无法写入 hosts 条目 {}（{}），请手动添加: {}",
                    self.hosts.path().display(),
                    e,
                    self.hosts
                        .entry_line(network::LOCALHOST_IPV4, &self.config.service.hostname)
                );
                warn!("⚠️  {}", warning);
                warning
            })
    }

    // ---------------------------------------------------------------
    // start / stop / restart
    // ---------------------------------------------------------------

    pub async fn start(&self) -> Result<StartOutcome> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;
        self.start_unlocked().await
    }

    async fn start_unlocked(&self) -> Result<StartOutcome> {
        if self.orchestrator.is_running(self.service_name()).await? {
            warn!("⚠️  服务 {} 已在运行，无需启动", self.service_name());
            return Ok(StartOutcome::AlreadyRunning);
        }

        info!("🚀 启动服务 {}...", self.service_name());
        self.orchestrator.up().await?;
        let healthy = self.wait_for_healthy().await?;
        if healthy {
            success!("服务 {} 已启动并就绪", self.service_name());
        }
        Ok(StartOutcome::Started { healthy })
    }

    /// 按固定间隔轮询健康状态，超时只告警不报错
    async fn wait_for_healthy(&self) -> Result<bool> {
        let timeouts = &self.config.timeouts;
        let deadline = Instant::now() + timeouts.start_timeout();
        let mut attempt = 0u32;

        info!(
            "⏳ 等待服务就绪（超时 {} 秒）...",
            timeouts.start_timeout().as_secs()
        );

        loop {
            attempt += 1;
            match self.orchestrator.service_info(self.service_name()).await {
                Ok(Some(info)) if info.is_running() => match info.health {
                    HealthState::Healthy | HealthState::None => {
                        debug!("第 {} 次检查: 服务已就绪", attempt);
                        return Ok(true);
                    }
                    health => debug!("第 {} 次检查: {}", attempt, health.display_name()),
                },
                Ok(_) => debug!("第 {} 次检查: 容器尚未运行", attempt),
                Err(e) => debug!("第 {} 次检查失败: {}", attempt, e),
            }

            if Instant::now() >= deadline {
                warn!(
                    "⚠️  等待 {} 秒后服务仍未就绪，服务可能仍在启动，请稍后用 status 查看",
                    timeouts.start_timeout().as_secs()
                );
                return Ok(false);
            }
            self.pause(timeouts.health_check_interval()).await?;
        }
    }

    pub async fn stop(&self) -> Result<StopOutcome> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;
        self.stop_unlocked().await
    }

    async fn stop_unlocked(&self) -> Result<StopOutcome> {
        if !self.orchestrator.is_running(self.service_name()).await? {
            warn!("⚠️  服务 {} 未运行，无需停止", self.service_name());
            return Ok(StopOutcome::NotRunning);
        }

        info!("🛑 停止服务 {}...", self.service_name());
        self.orchestrator.down(false).await?;
        success!("服务 {} 已停止", self.service_name());
        Ok(StopOutcome::Stopped)
    }

    pub async fn restart(&self) -> Result<StartOutcome> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;

        info!("🔄 重启服务 {}...", self.service_name());
        self.stop_unlocked().await?;
        self.pause(self.config.timeouts.restart_delay()).await?;
        self.start_unlocked().await
    }

    // ---------------------------------------------------------------
    // status / logs
    // ---------------------------------------------------------------

    /// 收集状态报告，任何一项失败都只记录警告
    pub async fn status(&self) -> StatusReport {
        let mut report = StatusReport {
            service_name: self.service_name().to_string(),
            hostname: self.config.service.hostname.clone(),
            home: self.config.home.clone(),
            home_exists: self.config.home.is_dir(),
            ..Default::default()
        };

        if let Err(e) = self.orchestrator.check_prerequisites().await {
            report.warnings.push(e.to_string());
        } else {
            match self.orchestrator.services().await {
                Ok(services) => report.containers = services,
                Err(e) => report.warnings.push(format!("无法获取容器状态: {e}")),
            }
        }

        if report.is_running() {
            if let Some(command) = &self.config.service.status_command {
                match self.orchestrator.exec(self.service_name(), command).await {
                    Ok(output) if output.success => report.supervisor = Some(output.stdout),
                    Ok(output) => report.warnings.push(format!(
                        "服务内部状态查询失败: {}",
                        output.stderr.trim()
                    )),
                    Err(e) => report.warnings.push(format!("服务内部状态查询失败: {e}")),
                }
            }
        } else {
            report
                .warnings
                .push(format!("服务 {} 未运行", self.service_name()));
        }

        if report.home_exists {
            let home = self.config.home.clone();
            match tokio::task::spawn_blocking(move || backup::directory_size(&home)).await {
                Ok(size) => report.disk_usage = Some(size),
                Err(e) => report.warnings.push(format!("无法统计磁盘占用: {e}")),
            }
        } else {
            report.warnings.push(format!(
                "主目录不存在: {}（请先执行 setup）",
                self.config.home.display()
            ));
        }

        report.address = local_address();
        if report.address.is_none() {
            report.warnings.push("无法确定本机网络地址".to_string());
        }

        match self.hosts.current_entry() {
            Ok(entry) => report.hosts_entry = entry,
            Err(e) => report.warnings.push(format!("无法读取 hosts 文件: {e}")),
        }

        report
    }

    pub async fn logs(&self, lines: u32) -> Result<String> {
        self.orchestrator.check_prerequisites().await?;
        self.orchestrator.logs(self.service_name(), lines).await
    }

    // ---------------------------------------------------------------
    // backup / restore
    // ---------------------------------------------------------------

    /// 手动备份：服务必须在运行
    pub async fn backup(&self) -> Result<PathBuf> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;
        self.backup_running(BackupKind::Manual).await
    }

    /// 先触发容器内备份工具，再归档整个主目录
    async fn backup_running(&self, kind: BackupKind) -> Result<PathBuf> {
        if !self.orchestrator.is_running(self.service_name()).await? {
            return Err(HomelabError::not_running(format!(
                "{}，无法创建{}",
                self.service_name(),
                kind.display_name()
            )));
        }

        self.run_backup_tool().await?;
        self.ensure_not_cancelled()?;

        let archive = self
            .backup_manager
            .create_archive(&self.config.home, &self.config.backup_dir(), kind)
            .await?;
        success!("{}已创建: {}", kind.display_name(), archive.display());
        Ok(archive)
    }

    async fn run_backup_tool(&self) -> Result<()> {
        let Some(command) = &self.config.service.backup_command else {
            return Ok(());
        };

        info!("📦 执行容器内备份工具: {}", command.join(" "));
        let output = self.orchestrator.exec(self.service_name(), command).await?;
        if !output.success {
            return Err(HomelabError::backup(format!(
                "容器内备份工具执行失败: {}",
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    /// 尽力而为的安全备份：运行中则先调用备份工具，失败只告警
    async fn safety_backup(&self, kind: BackupKind) -> Option<PathBuf> {
        if !self.config.home.is_dir() {
            debug!("主目录不存在，跳过{}", kind.display_name());
            return None;
        }

        match self.orchestrator.is_running(self.service_name()).await {
            Ok(true) => {
                if let Err(e) = self.run_backup_tool().await {
                    warn!("⚠️  {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => debug!("查询运行状态失败: {}", e),
        }

        match self
            .backup_manager
            .create_archive(&self.config.home, &self.config.backup_dir(), kind)
            .await
        {
            Ok(archive) => {
                info!("💾 {}: {}", kind.display_name(), archive.display());
                Some(archive)
            }
            Err(e) => {
                warn!("⚠️  {}失败，继续执行: {}", kind.display_name(), e);
                None
            }
        }
    }

    /// 用归档替换主目录
    ///
    /// 归档在任何修改之前校验；原主目录先移到一旁，解压成功后才删除，
    /// 中途失败或中断时按相反顺序恢复。
    pub async fn restore(
        &self,
        archive: &Path,
        confirm: &dyn Confirm,
    ) -> Result<Confirmation<RestoreReport>> {
        if !archive.is_file() {
            return Err(HomelabError::NotFound(archive.to_path_buf()));
        }
        let archive = std::path::absolute(archive)?;

        let inspect_path = archive.clone();
        let top_level =
            tokio::task::spawn_blocking(move || backup::inspect_archive(&inspect_path)).await??;
        debug!("归档校验通过，顶层目录: {}", top_level);

        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;

        let question = format!(
            "将用 {} 替换 {} 的全部内容，确认恢复吗？",
            archive.display(),
            self.config.home.display()
        );
        if !confirm.confirm(&question)? {
            info!("已取消恢复，未做任何修改");
            return Ok(Confirmation::Declined);
        }

        let safety_backup = self.safety_backup(BackupKind::PreRestore).await;

        let was_running = match self.orchestrator.is_running(self.service_name()).await {
            Ok(running) => running,
            Err(e) => {
                debug!("查询运行状态失败，按未运行处理: {}", e);
                false
            }
        };

        let mut journal = StepJournal::new("restore", self.cancel.clone());
        if let Err(e) = self.restore_steps(&mut journal, &archive, was_running).await {
            let stopped = journal.completed_steps().contains(&"stop");
            let failures = journal.rollback();
            if !failures.is_empty() {
                error!("❌ 回滚未完全成功: {}", failures.join("; "));
            }
            if stopped {
                info!("↩️  重新启动原服务...");
                if let Err(up_err) = self.orchestrator.up().await {
                    warn!("⚠️  重新启动原服务失败: {}", up_err);
                }
            }
            return Err(e);
        }
        journal.commit();
        info!("📂 已从归档恢复主目录: {}", self.config.home.display());

        if let Err(warning) = self.apply_hosts_entry() {
            debug!("hosts 条目未更新: {}", warning);
        }

        let start = self.start_unlocked().await?;
        success!("恢复完成: {}", archive.display());
        Ok(Confirmation::Done(RestoreReport {
            archive,
            safety_backup,
            start,
        }))
    }

    async fn restore_steps(
        &self,
        journal: &mut StepJournal,
        archive: &Path,
        was_running: bool,
    ) -> Result<()> {
        let home = self.config.home.clone();
        let parent = self.config.home_parent();

        tokio::fs::create_dir_all(&parent).await?;
        let staging = tempfile::Builder::new()
            .prefix(".homelab-restore-")
            .tempdir_in(&parent)?;

        // 主目录内的归档会随主目录一起被移开，先复制到暂存目录
        let archive = if archive.starts_with(std::path::absolute(&home)?) {
            let file_name = archive
                .file_name()
                .ok_or_else(|| HomelabError::NotFound(archive.to_path_buf()))?;
            let staged = staging.path().join(file_name);
            journal
                .run("stage-archive", copy_file(archive.to_path_buf(), staged.clone()))
                .await?;
            debug!("归档位于主目录内，已复制到: {}", staged.display());
            staged
        } else {
            archive.to_path_buf()
        };

        if was_running {
            journal.run("stop", self.orchestrator.down(false)).await?;
        }

        if home.exists() {
            let aside = self.aside_path("restore");
            journal
                .run("move-aside", rename(home.clone(), aside.clone()))
                .await?;
            let (undo_home, undo_aside) = (home.clone(), aside.clone());
            journal.push_undo(move || {
                if undo_home.exists() {
                    std::fs::remove_dir_all(&undo_home)?;
                }
                std::fs::rename(&undo_aside, &undo_home)?;
                Ok(())
            });
            journal.on_commit(move || {
                std::fs::remove_dir_all(&aside)?;
                Ok(())
            });
        }

        let extracted = journal
            .run("extract", backup::unpack_archive(&archive, staging.path()))
            .await?;
        journal.run("install", rename(extracted, home.clone())).await?;
        let installed = home;
        journal.push_undo(move || {
            if installed.exists() {
                std::fs::remove_dir_all(&installed)?;
            }
            Ok(())
        });

        Ok(())
    }

    /// 主目录旁的临时位置，用于移开当前主目录
    fn aside_path(&self, operation: &str) -> PathBuf {
        let stamp = Local::now().format(backup_consts::TIMESTAMP_FORMAT);
        self.config.home_parent().join(format!(
            ".{}.{}-{}",
            self.config.home_name(),
            operation,
            stamp
        ))
    }

    /// 列出所有已知位置中的归档
    pub fn list_backups(&self) -> Result<Vec<ArchiveEntry>> {
        self.backup_manager.list_archives(&self.backup_locations())
    }

    pub fn backup_locations(&self) -> Vec<PathBuf> {
        vec![
            self.config.backup_dir(),
            self.config.home_parent(),
            self.config.home_backups_dir(),
        ]
    }

    // ---------------------------------------------------------------
    // migrate
    // ---------------------------------------------------------------

    /// 生成迁移包：归档 + 安装脚本，输出目录中只有这两个文件
    pub async fn migrate(&self, output: Option<PathBuf>) -> Result<MigrationPackage> {
        let _lock = self.lock()?;
        let home = &self.config.home;
        if !home.is_dir() {
            return Err(HomelabError::NotFound(home.clone()));
        }

        let output_dir = match output {
            Some(dir) => std::path::absolute(dir)?,
            None => self.config.backup_dir().join(format!(
                "{}{}",
                migration::OUTPUT_DIR_PREFIX,
                Local::now().format(backup_consts::TIMESTAMP_FORMAT)
            )),
        };
        if output_dir.starts_with(home) {
            return Err(HomelabError::migration(format!(
                "输出目录不能位于主目录内: {}",
                output_dir.display()
            )));
        }
        if output_dir.exists() && std::fs::read_dir(&output_dir)?.next().is_some() {
            return Err(HomelabError::migration(format!(
                "输出目录非空: {}",
                output_dir.display()
            )));
        }

        match self.orchestrator.is_running(self.service_name()).await {
            Ok(true) => {
                warn!("⚠️  服务正在运行，归档期间的写入可能不会包含在迁移包中");
                if let Err(e) = self.run_backup_tool().await {
                    warn!("⚠️  {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => debug!("查询运行状态失败: {}", e),
        }
        self.ensure_not_cancelled()?;

        info!("📦 生成迁移包: {}", output_dir.display());
        let archive = self
            .backup_manager
            .create_archive(home, &output_dir, BackupKind::Migration)
            .await?;

        let installer = match migrate::write_installer(&self.config, &archive) {
            Ok(path) => path,
            Err(e) => {
                // 不留下只有一半的迁移包
                let _ = std::fs::remove_file(&archive);
                return Err(e);
            }
        };

        success!("迁移包已生成: {}", output_dir.display());
        Ok(MigrationPackage {
            output_dir,
            archive,
            installer,
        })
    }

    // ---------------------------------------------------------------
    // update / cleanup / uninstall
    // ---------------------------------------------------------------

    /// 更新镜像：先强制备份，再拉取、重建、等待就绪
    pub async fn update(&self) -> Result<UpdateReport> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;

        info!("💾 更新前备份...");
        let backup = self.backup_running(BackupKind::PreUpdate).await?;

        info!("⬇️  拉取最新镜像...");
        self.orchestrator.pull().await?;
        self.ensure_not_cancelled()?;

        info!("🔄 重建服务...");
        self.orchestrator.down(false).await?;
        self.orchestrator.up().await?;
        let healthy = self.wait_for_healthy().await?;

        success!("更新完成，更新前备份: {}", backup.display());
        Ok(UpdateReport { backup, healthy })
    }

    /// 移除容器和卷并清理未使用的镜像、网络和卷，单项失败只告警
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        self.orchestrator.check_prerequisites().await?;
        let _lock = self.lock()?;
        let report = self.cleanup_unlocked().await;
        success!("清理完成");
        Ok(report)
    }

    async fn cleanup_unlocked(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        info!("🧹 移除容器和卷...");
        if let Err(e) = self.orchestrator.down(true).await {
            let warning = format!("移除容器失败: {e}");
            warn!("⚠️  {}", warning);
            report.warnings.push(warning);
        }

        for target in [
            PruneTarget::Images,
            PruneTarget::Networks,
            PruneTarget::Volumes,
        ] {
            info!("🧹 清理未使用的 {} 资源...", target.docker_object());
            if let Err(e) = self.orchestrator.prune(target).await {
                let warning = format!("清理 {} 失败: {e}", target.docker_object());
                warn!("⚠️  {}", warning);
                report.warnings.push(warning);
            }
        }

        report
    }

    /// 卸载：最终备份、清理容器、删除主目录、移除 hosts 条目
    pub async fn uninstall(
        &self,
        confirm: &dyn Confirm,
    ) -> Result<Confirmation<UninstallReport>> {
        self.orchestrator.check_prerequisites().await?;
        let lock = self.lock()?;

        let question = format!(
            "将删除服务 {} 的容器、卷以及主目录 {}，确认卸载吗？",
            self.service_name(),
            self.config.home.display()
        );
        if !confirm.confirm(&question)? {
            info!("已取消卸载，未做任何修改");
            return Ok(Confirmation::Declined);
        }

        let mut report = UninstallReport {
            final_backup: self.safety_backup(BackupKind::PreUninstall).await,
            ..Default::default()
        };
        self.ensure_not_cancelled()?;

        let cleanup = self.cleanup_unlocked().await;
        report.warnings.extend(cleanup.warnings);

        let mut journal = StepJournal::new("uninstall", self.cancel.clone());
        if let Err(e) = self.uninstall_steps(&mut journal, &mut report).await {
            let failures = journal.rollback();
            if !failures.is_empty() {
                error!("❌ 回滚未完全成功: {}", failures.join("; "));
            }
            return Err(e);
        }
        journal.commit();
        if let Err(e) = lock.remove() {
            warn!("⚠️  删除锁文件失败: {}", e);
        }

        success!("服务 {} 已卸载", self.service_name());
        Ok(Confirmation::Done(report))
    }

    async fn uninstall_steps(
        &self,
        journal: &mut StepJournal,
        report: &mut UninstallReport,
    ) -> Result<()> {
        let home = self.config.home.clone();
        if home.exists() {
            let aside = self.aside_path("uninstall");
            journal
                .run("move-aside", rename(home.clone(), aside.clone()))
                .await?;
            let undo_aside = aside.clone();
            journal.push_undo(move || {
                std::fs::rename(&undo_aside, &home)?;
                Ok(())
            });
            journal.on_commit(move || {
                std::fs::remove_dir_all(&aside)?;
                Ok(())
            });
        } else {
            debug!("主目录不存在，跳过删除");
        }

        if self.config.hosts.enabled {
            let hosts = self.hosts.clone();
            let removed = journal
                .run("remove-hosts-entry", async move { Ok(hosts.remove()) })
                .await?;
            match removed {
                Ok(true) => {
                    let hosts = self.hosts.clone();
                    let hostname = self.config.service.hostname.clone();
                    journal.push_undo(move || {
                        hosts.apply(network::LOCALHOST_IPV4, &hostname)?;
                        Ok(())
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    let warning = format!(
                        "无法移除 hosts 条目（{}），请手动删除带 {}:{} 标记的行",
                        e,
                        network::HOSTS_MARKER,
                        self.service_name()
                    );
                    warn!("⚠️  {}", warning);
                    report.warnings.push(warning);
                }
            }
        }

        Ok(())
    }
}

async fn rename(from: PathBuf, to: PathBuf) -> Result<()> {
    tokio::fs::rename(&from, &to).await?;
    Ok(())
}

async fn copy_file(from: PathBuf, to: PathBuf) -> Result<()> {
    tokio::fs::copy(&from, &to).await?;
    Ok(())
}

/// 本机对外网络地址（通过 UDP connect 选路，不发送数据）
pub fn local_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(network::PROBE_ADDR).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
