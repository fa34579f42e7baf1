use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::{SettingWorker, Settings};
use crate::consts::{ARCH, COMMIT, COMPILER, NAME, OS, VERSION};
use crate::fetch::Origin;
use crate::http::{AppState, shutdown_servers, start_servers};
use crate::network::{Network, ReqwestNetwork};
use crate::storage;
use crate::utils::init_logger;
use crate::worker::Registration;

pub type ServerHandles = Arc<Mutex<Vec<Handle<SocketAddr>>>>;

/// 初始化日志系统
///
/// 返回的 guard 需要一直持有，否则文件日志会丢失。
pub fn initialize_logger(settings: &Settings) -> Result<WorkerGuard> {
    let guard = init_logger(
        &settings.log_level,
        &settings.log_folder,
        &settings.log_file_prefix,
    )
    .with_context(|| "Failed to initialize logger")?;
    info!("{} v{} ({})", NAME, VERSION, COMMIT);
    info!("Compiler: {}", COMPILER);
    info!("OS: {} {}", OS, ARCH);
    debug!("Configuration: {:?}", settings);
    Ok(guard)
}

/// 按 worker 配置创建网络客户端
pub fn build_network(worker: &SettingWorker) -> Result<Arc<dyn Network>> {
    let timeout = worker.fetch_timeout.map(Duration::from_secs);
    let network = ReqwestNetwork::new(timeout).with_context(|| "Failed to build http client")?;
    Ok(Arc::new(network))
}

/// 注册配置中的 worker 版本，失败只记录日志，当前 worker 继续工作
async fn register_worker(registration: &Registration, worker: SettingWorker) {
    let cache_name = worker.cache_name();
    let network = match build_network(&worker) {
        Ok(network) => network,
        Err(e) => {
            error!("Failed to register worker {}: {:?}", cache_name, e);
            return;
        }
    };
    if let Err(e) = registration.register(worker, network).await {
        error!("Failed to register worker {}: {:?}", cache_name, e);
    }
}

/// 当前 worker 的源，没有 worker 时使用配置中的源
fn current_origin(registration: &Registration, worker: &SettingWorker) -> Result<Origin> {
    if let Some(active) = registration.active() {
        return Ok(active.origin().clone());
    }
    Origin::parse(&worker.origin).ok_or_else(|| anyhow!("invalid worker origin {}", worker.origin))
}

/// 启动应用：打开缓存存储，注册 worker，启动所有服务器
pub async fn start(settings: Settings) -> Result<(Arc<Registration>, ServerHandles)> {
    let storage = storage::from_settings(&settings.storage);
    let network = build_network(&settings.worker)?;
    let registration = Arc::new(Registration::new(storage, network));

    register_worker(&registration, settings.worker.clone()).await;

    let origin = current_origin(&registration, &settings.worker)?;
    let state = AppState::new(registration.clone(), origin);
    let handles = start_servers(settings.host, state).await;
    if handles.is_empty() {
        warn!("No server instance started");
    }
    Ok((registration, Arc::new(Mutex::new(handles))))
}

/// 处理配置文件变更的回调函数
///
/// 新配置会注册为新版本的 worker（安装、激活并清理旧缓存），
/// 随后重启服务器以应用新的监听地址。存储配置只在启动时生效。
pub async fn handle_config_change(
    result: crate::error::Result<Settings>,
    registration: Arc<Registration>,
    handles: ServerHandles,
) {
    let new_settings = match result {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to reload config file: {:?}", e);
            return;
        }
    };
    info!("Config file reloaded successfully");

    register_worker(&registration, new_settings.worker.clone()).await;

    let origin = match current_origin(&registration, &new_settings.worker) {
        Ok(origin) => origin,
        Err(e) => {
            error!("Failed to apply new config: {:?}", e);
            return;
        }
    };

    info!("Config file changed, restarting servers to apply new config...");
    let mut current_handles = handles.lock().await;
    shutdown_servers(&mut current_handles).await;
    let state = AppState::new(registration, origin);
    *current_handles = start_servers(new_settings.host, state).await;
    info!("All servers have been restarted successfully");
}

/// 优雅关闭服务器和配置监听器
pub async fn shutdown_application(handles: ServerHandles, stop_tx: oneshot::Sender<()>) {
    info!("Received shutdown signal, closing servers...");

    let mut current_handles = handles.lock().await;
    shutdown_servers(&mut current_handles).await;

    // 停止配置监听
    if let Err(err) = stop_tx.send(()) {
        error!("Failed to send stop signal to config watcher: {:?}", err);
    }

    info!("Application shutdown complete");
}
