use notify::{EventKind, RecursiveMode, Watcher};
use std::{
    path::Path,
    sync::mpsc,
    time::{Duration, Instant},
};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::{config::Settings, error::Result};

/// 两次回调之间的最短间隔
const DEBOUNCE: Duration = Duration::from_millis(500);

/// 启动配置文件监听
///
/// 配置文件发生变化时重新读取并校验配置，把结果交给 `callback`。
/// 回调在监听线程中执行，需要异步处理时应自行 spawn 到运行时上。
///
/// 返回一个发送器，用于发送停止信号
pub fn start_config_watcher(
    config_path: impl AsRef<Path>,
    callback: impl Fn(Result<Settings>) + Send + 'static,
) -> Result<oneshot::Sender<()>, notify::Error> {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let config_path = config_path.as_ref().to_owned();

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
    info!("Watching config file: {:?}", config_path);

    std::thread::spawn(move || {
        let mut last_event_time: Option<Instant> = None;

        loop {
            if stop_rx.try_recv().is_ok() {
                info!("Stopping config watcher");
                break;
            }

            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(Ok(event)) => {
                    if !matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        continue;
                    }
                    let now = Instant::now();
                    if last_event_time.is_some_and(|last| now.duration_since(last) < DEBOUNCE) {
                        continue;
                    }
                    last_event_time = Some(now);
                    info!("Config file event: {:?}", event.kind);

                    // 编辑器保存时可能先删除再写入，需要重新 watch
                    if matches!(
                        event.kind,
                        EventKind::Remove(_)
                            | EventKind::Modify(notify::event::ModifyKind::Name(_))
                    ) {
                        if let Err(e) = watcher.unwatch(&config_path) {
                            error!("Failed to unwatch config file (ignored): {:?}", e);
                        }
                        // 等待新文件写入
                        std::thread::sleep(Duration::from_millis(100));
                        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
                            error!("Failed to re-watch config file: {:?}", e);
                        } else {
                            info!("Re-watching config file: {:?}", config_path);
                        }
                    }

                    callback(Settings::new(&config_path.to_string_lossy()));
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
            }
        }

        if let Err(e) = watcher.unwatch(&config_path) {
            error!("Failed to unwatch config file: {:?}", e);
        }
    });

    Ok(stop_tx)
}
