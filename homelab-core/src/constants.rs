/// 服务主目录布局常量
pub mod layout {
    /// 应用配置目录名
    pub const CONFIG_DIR_NAME: &str = "config";

    /// 日志目录名
    pub const LOGS_DIR_NAME: &str = "logs";

    /// 数据目录名
    pub const DATA_DIR_NAME: &str = "data";

    /// 容器内备份工具的输出目录名
    pub const BACKUPS_DIR_NAME: &str = "backups";

    /// setup 时创建的全部子目录
    pub const HOME_SUBDIRS: [&str; 4] = [
        CONFIG_DIR_NAME,
        LOGS_DIR_NAME,
        DATA_DIR_NAME,
        BACKUPS_DIR_NAME,
    ];

    /// 管理器自身的配置文件名
    pub const SETTINGS_FILE_NAME: &str = "homelab.toml";

    /// docker-compose.yml文件名
    pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";
}

/// 默认服务定义
pub mod defaults {
    /// 默认服务名（同时作为容器名和 compose 服务名）
    pub const SERVICE_NAME: &str = "gitlab";

    /// 默认主机名
    pub const HOSTNAME: &str = "gitlab.local";

    /// 默认镜像
    pub const IMAGE: &str = "gitlab/gitlab-ce:latest";

    /// 默认主目录名（位于用户 home 下）
    pub const HOME_DIR_NAME: &str = "gitlab-home";

    /// 默认内存上限
    pub const MEMORY_LIMIT: &str = "4g";

    /// 默认内存预留
    pub const MEMORY_RESERVATION: &str = "2g";

    /// 默认共享内存大小
    pub const SHM_SIZE: &str = "256m";

    /// 默认重启策略
    pub const RESTART_POLICY: &str = "unless-stopped";

    /// 默认 hosts 文件路径
    pub const HOSTS_FILE: &str = "/etc/hosts";

    /// 默认日志查看行数
    pub const LOG_LINES: u32 = 100;
}

/// 环境变量名
pub mod env {
    /// 覆盖服务主目录
    pub const HOME: &str = "HOMELAB_HOME";

    /// 覆盖服务主机名
    pub const HOSTNAME: &str = "HOMELAB_HOSTNAME";

    /// 日志文件路径
    pub const LOG_FILE: &str = "HOMELAB_LOG_FILE";
}

/// 备份相关常量
pub mod backup {
    /// 备份文件扩展名
    pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

    /// 文件名中嵌入的时间戳格式
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

    /// 备份存储目录后缀（位于主目录旁边）
    pub const STORAGE_DIR_SUFFIX: &str = "-backups";

    /// 默认压缩级别
    pub const COMPRESSION_LEVEL: u32 = 6;
}

/// 迁移包相关常量
pub mod migration {
    /// 迁移输出目录前缀
    pub const OUTPUT_DIR_PREFIX: &str = "migration-";

    /// 安装脚本文件名前缀
    pub const INSTALLER_PREFIX: &str = "install-";

    /// 安装脚本扩展名
    pub const INSTALLER_EXTENSION: &str = ".sh";
}

/// 超时时间常量（秒）
pub mod timeout {
    /// Docker服务启动等待超时时间
    pub const SERVICE_START_TIMEOUT: u64 = 300;

    /// 健康检查轮询间隔
    pub const HEALTH_CHECK_INTERVAL: u64 = 10;

    /// 服务重启间隔等待时间
    pub const RESTART_INTERVAL: u64 = 5;
}

/// 网络相关常量
pub mod network {
    /// 本地回环地址
    pub const LOCALHOST_IPV4: &str = "127.0.0.1";

    /// 用于探测本机出口地址的外部地址（不会真正发送数据）
    pub const PROBE_ADDR: &str = "8.8.8.8:80";

    /// hosts 文件中受管条目的标记
    pub const HOSTS_MARKER: &str = "# managed-by-homelab";
}

/// 并发控制相关常量
pub mod lock {
    /// 锁文件后缀（位于主目录旁边：.<主目录名>.lock）
    pub const LOCK_FILE_SUFFIX: &str = ".lock";
}
