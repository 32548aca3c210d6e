//! 日志记录约定
//!
//! 库代码只使用 `tracing` 宏，输出目标（终端、追加写入的日志文件）由
//! homelab-cli 在入口处配置。日志级别对应 INFO/WARN/ERROR，成功结果使用
//! [`success!`](crate::success) 记录：它是带 `success = true` 字段的 INFO 事件，
//! 在日志文件中可以据此筛选出 SUCCESS 记录。

/// 记录一条 SUCCESS 级别的日志
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        ::tracing::info!(success = true, $($arg)+)
    };
}
