mod backup;
mod lifecycle;
mod maintenance;
mod migrate;
mod setup;

// Setup
pub use setup::run_setup;

// Lifecycle commands
pub use lifecycle::{run_logs, run_restart, run_start, run_status, run_stop};

// Backup commands
pub use backup::{run_backup, run_list_backups, run_restore};

// Migration
pub use migrate::run_migrate;

// Maintenance commands
pub use maintenance::{run_cleanup, run_uninstall, run_update};
