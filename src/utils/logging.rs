use std::str::FromStr;

use anyhow::Context;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self},
    layer::SubscriberExt,
};

/// 按天分割的日志文件：`<folder>/<prefix>.<yyyy-mm-dd>.log`
pub fn file_appender(log_folder: &str, file_prefix: &str) -> anyhow::Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(log_folder)
        .with_context(|| format!("failed to create log file in {log_folder}"))
}

/// 初始化 Logger
///
/// 从配置文件中读取 log 级别，同时读取日志文件存储路径与文件名前缀。
/// 日志同时输出到控制台与日志文件。
pub fn init_logger(
    log_level: &str,
    log_folder: &str,
    file_prefix: &str,
) -> anyhow::Result<WorkerGuard> {
    let (non_blocking, guard) =
        tracing_appender::non_blocking(file_appender(log_folder, file_prefix)?);

    let file_subscriber = fmt::layer()
        .compact()
        .with_target(false)
        .with_thread_ids(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    let formatting_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    let env_layer = EnvFilter::from_str(log_level).unwrap_or_else(|_| "info".into());

    let collector = tracing_subscriber::registry()
        .with(env_layer)
        .with(formatting_layer)
        .with(file_subscriber);
    tracing::subscriber::set_global_default(collector)
        .with_context(|| "to set a global collector")?;
    Ok(guard)
}
