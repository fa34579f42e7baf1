use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::info;

use swcache::{
    application::{handle_config_change, initialize_logger, shutdown_application, start},
    cli::Cli,
    config::Settings,
    utils::start_config_watcher,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = Settings::new(&args.config).with_context(|| "init config failed")?;
    let _guard = initialize_logger(&settings)?;

    let (registration, handles) = start(settings).await?;

    // 启动配置文件监听，回调在监听线程中执行
    let runtime = tokio::runtime::Handle::current();
    let (registration_clone, handles_clone) = (registration.clone(), handles.clone());
    let stop_tx = start_config_watcher(&args.config, move |result| {
        runtime.spawn(handle_config_change(
            result,
            registration_clone.clone(),
            handles_clone.clone(),
        ));
    })
    .with_context(|| "start config watcher failed")?;

    info!("Server started");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    shutdown_application(handles, stop_tx).await;

    Ok(())
}
