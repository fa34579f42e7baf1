use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::info;

use super::{FetchOutcome, Worker};
use crate::{
    config::SettingWorker,
    error::Result,
    fetch::{FetchMode, FetchRequest},
    network::{Network, NetworkError},
    storage::CacheStorage,
};

/// Worker 注册表
///
/// 持有当前控制所有请求的 worker。注册新版本时先安装，
/// 安装成功后立即替换当前 worker（跳过等待并接管所有客户端），再激活；
/// 激活完成前的请求直接访问网络。安装失败时旧 worker 继续工作。
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    /// 没有激活的 worker 时直接使用的网络
    network: RwLock<Arc<dyn Network>>,
    active: RwLock<Option<Arc<Worker>>>,
    /// 串行化版本更新
    updating: Mutex<()>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            storage,
            network: RwLock::new(network),
            active: RwLock::new(None),
            updating: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// 当前控制请求的 worker
    pub fn active(&self) -> Option<Arc<Worker>> {
        self.active.read().clone()
    }

    /// 注册一个版本的 worker
    ///
    /// 配置与当前 worker 完全相同时不做任何事。
    pub async fn register(
        &self,
        settings: SettingWorker,
        network: Arc<dyn Network>,
    ) -> Result<Arc<Worker>> {
        let _updating = self.updating.lock().await;

        if let Some(active) = self.active()
            && active.settings() == &settings
        {
            info!("Worker {} unchanged, skip update", active.cache_name());
            return Ok(active);
        }

        let worker = Arc::new(Worker::new(settings, self.storage.clone(), network.clone())?);
        worker.on_install().await?;

        // skip waiting, claim clients
        // 旧 worker 必须在清理旧缓存之前失效，否则它的请求会重新创建被删除的缓存
        let previous = self.active.write().replace(worker.clone());
        *self.network.write() = network;
        if let Some(previous) = previous {
            previous.mark_redundant();
        }
        worker.on_activate().await?;
        info!("Worker {} now controls all clients", worker.cache_name());
        Ok(worker)
    }

    /// 将请求交给当前 worker，没有 worker 时直接请求网络
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome, NetworkError> {
        match self.active() {
            Some(worker) => worker.on_fetch(request).await,
            None => {
                let network = self.network.read().clone();
                let res = network.fetch(&request, FetchMode::Default).await?;
                Ok(FetchOutcome::Passthrough(res))
            }
        }
    }
}
