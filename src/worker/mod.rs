//! Fetch interceptor / cache manager
//!
//! 一个 [`Worker`] 对应一个版本的缓存配置。它拥有一个带版本号的具名缓存，
//! 在安装时预取静态资源，在激活时清理旧版本缓存，
//! 并对每个同源请求选择网络优先（数据）或缓存优先（静态资源）策略。

use std::sync::Arc;

use futures::future::join_all;
use http::StatusCode;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    config::{InstallPolicy, SettingWorker},
    error::{Error, Result},
    fetch::{CachedResponse, FetchMode, FetchRequest, Origin, RequestKey},
    network::{Network, NetworkError},
    storage::{Cache, CacheStorage},
};

pub mod classify;
pub mod lifecycle;
pub mod push;
pub mod registration;
mod strategy;

pub use classify::{RequestKind, classify};
pub use lifecycle::WorkerState;
pub use push::{Notification, NotificationCenter, PushPayload};
pub use registration::Registration;

/// `on_fetch` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 由缓存提供
    Cache(CachedResponse),
    /// 由网络提供（可能已写入缓存）
    Network(CachedResponse),
    /// 未拦截的请求，直接来自网络
    Passthrough(CachedResponse),
    /// 网络失败且缓存中没有对应条目
    Empty,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            FetchOutcome::Cache(res)
            | FetchOutcome::Network(res)
            | FetchOutcome::Passthrough(res) => Some(res),
            FetchOutcome::Empty => None,
        }
    }
}

/// 安装结果
#[derive(Debug, Default, Serialize)]
pub struct InstallReport {
    /// 写入缓存的资源数量
    pub cached: usize,
    /// 预取失败的资源
    pub failed: Vec<String>,
}

/// 后台同步结果
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SyncReport {
    pub refreshed: usize,
    pub failed: usize,
}

/// Worker 状态快照，供控制接口展示
#[derive(Debug, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub cache_name: String,
    pub version: String,
    pub origin: String,
}

pub struct Worker {
    settings: SettingWorker,
    origin: Origin,
    cache_name: String,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    notifications: NotificationCenter,
}

impl Worker {
    pub fn new(
        settings: SettingWorker,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Result<Self> {
        let origin = Origin::parse(&settings.origin).ok_or_else(|| {
            Error::InvalidConfig(format!("invalid worker origin {}", settings.origin))
        })?;
        let cache_name = settings.cache_name();
        Ok(Self {
            settings,
            origin,
            cache_name,
            storage,
            network,
            state: RwLock::new(WorkerState::Parsed),
            notifications: NotificationCenter::new(),
        })
    }

    pub fn settings(&self) -> &SettingWorker {
        &self.settings
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state(),
            cache_name: self.cache_name.clone(),
            version: self.settings.version.clone(),
            origin: self.origin.to_string(),
        }
    }

    fn transition(&self, next: WorkerState) -> Result<()> {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "worker {} cannot move from {} to {}",
                self.cache_name, *state, next
            )));
        }
        debug!("Worker {} {} -> {}", self.cache_name, *state, next);
        *state = next;
        Ok(())
    }

    /// 被新版本替换或安装失败后调用
    pub fn mark_redundant(&self) {
        let mut state = self.state.write();
        if *state != WorkerState::Redundant {
            info!("Worker {} is now redundant", self.cache_name);
            *state = WorkerState::Redundant;
        }
    }

    /// 安装：打开（或创建）当前版本的缓存并预取 manifest 中的全部资源
    ///
    /// 预取使用绕过缓存的请求，只接受状态 200 的响应。失败的处理取决于 `install_policy`：
    /// `atomic` 时任意失败都会导致不写入任何条目并返回错误，
    /// `tolerant` 时仅记录失败并写入其余资源。
    /// 安装失败后 worker 进入 `redundant` 状态。
    pub async fn on_install(&self) -> Result<InstallReport> {
        self.transition(WorkerState::Installing)?;
        match self.install().await {
            Ok(report) => {
                self.transition(WorkerState::Installed)?;
                info!(
                    "Worker {} installed, {} assets cached, {} failed",
                    self.cache_name,
                    report.cached,
                    report.failed.len()
                );
                Ok(report)
            }
            Err(err) => {
                error!("Worker {} install failed: {}", self.cache_name, err);
                self.mark_redundant();
                Err(err)
            }
        }
    }

    async fn install(&self) -> Result<InstallReport> {
        let cache = self.storage.open(&self.cache_name).await?;

        let fetches = self.settings.manifest.iter().map(|url| async move {
            let result = match self.origin.resolve(url) {
                Ok(uri) => {
                    let request = FetchRequest::get(uri);
                    let key = request.key();
                    match self.network.fetch(&request, FetchMode::Reload).await {
                        Ok(res) if res.status == StatusCode::OK => Ok((key, res)),
                        Ok(res) => Err(format!("status {}", res.status)),
                        Err(err) => Err(err.to_string()),
                    }
                }
                Err(err) => Err(err.to_string()),
            };
            (url.as_str(), result)
        });

        let mut entries = vec![];
        let mut report = InstallReport::default();
        for (url, result) in join_all(fetches).await {
            match result {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!("Failed to prefetch {}: {}", url, err);
                    report.failed.push(url.to_string());
                }
            }
        }

        if !report.failed.is_empty() && self.settings.install_policy == InstallPolicy::Atomic {
            return Err(Error::InstallFailed(format!(
                "{} of {} manifest urls failed: {}",
                report.failed.len(),
                self.settings.manifest.len(),
                report.failed.join(", ")
            )));
        }

        report.cached = entries.len();
        cache.add_all(entries).await?;
        Ok(report)
    }

    /// 激活：删除所有名称与当前版本不同的缓存，返回被删除的缓存名称
    ///
    /// 清理失败只记录日志，不影响激活。
    pub async fn on_activate(&self) -> Result<Vec<String>> {
        self.transition(WorkerState::Activating)?;

        let mut deleted = vec![];
        match self.storage.keys().await {
            Ok(names) => {
                for name in names.into_iter().filter(|name| name != &self.cache_name) {
                    match self.storage.delete(&name).await {
                        Ok(_) => {
                            info!("Deleted stale cache {}", name);
                            deleted.push(name);
                        }
                        Err(err) => error!("Failed to delete stale cache {}: {}", name, err),
                    }
                }
            }
            Err(err) => error!("Failed to list caches: {}", err),
        }

        self.transition(WorkerState::Activated)?;
        info!("Worker {} activated", self.cache_name);
        Ok(deleted)
    }

    /// 处理一个请求
    ///
    /// 未激活的 worker、跨源请求以及非 GET 请求都不拦截，直接请求网络。
    /// 被拦截的请求去掉客户端的条件请求头，保证缓存的总是完整响应。
    pub async fn on_fetch(&self, request: FetchRequest) -> Result<FetchOutcome, NetworkError> {
        if self.state() != WorkerState::Activated {
            debug!("Worker {} not active, passthrough", self.cache_name);
            return self.passthrough(&request).await;
        }
        match classify(&request, &self.origin) {
            RequestKind::Data => Ok(self.network_first(&request.without_validators()).await),
            RequestKind::Static => self.cache_first(&request.without_validators()).await,
            RequestKind::Passthrough => self.passthrough(&request).await,
        }
    }

    async fn passthrough(&self, request: &FetchRequest) -> Result<FetchOutcome, NetworkError> {
        let res = self.network.fetch(request, FetchMode::Default).await?;
        Ok(FetchOutcome::Passthrough(res))
    }

    /// 后台同步
    ///
    /// 对配置的同步标签，重新从网络获取当前缓存中所有数据条目；
    /// 其他标签只记录日志。
    pub async fn on_sync(&self, tag: &str) -> SyncReport {
        let mut report = SyncReport::default();
        if tag != self.settings.sync_tag {
            info!("Ignore sync event with unknown tag {}", tag);
            return report;
        }

        let Some(cache) = self.open_cache().await else {
            return report;
        };
        let keys = match cache.keys().await {
            Ok(keys) => keys,
            Err(err) => {
                error!("Failed to list entries of cache {}: {}", self.cache_name, err);
                return report;
            }
        };

        for key in keys {
            let Ok(uri) = key.url.parse() else {
                continue;
            };
            let request = FetchRequest::get(uri);
            if classify(&request, &self.origin) != RequestKind::Data {
                continue;
            }
            match self.network.fetch(&request, FetchMode::Reload).await {
                Ok(res) => match cache.put(key.clone(), res).await {
                    Ok(()) => report.refreshed += 1,
                    Err(err) => {
                        error!("Failed to store {}: {}", key, err);
                        report.failed += 1;
                    }
                },
                Err(err) => {
                    warn!("Failed to refresh {}: {}", key, err);
                    report.failed += 1;
                }
            }
        }
        info!(
            "Sync {} finished, {} refreshed, {} failed",
            tag, report.refreshed, report.failed
        );
        report
    }

    /// 推送：解析 JSON 消息并展示通知
    pub fn on_push(&self, payload: &[u8]) -> Result<Notification> {
        let payload: PushPayload = serde_json::from_slice(payload)?;
        let notification = self.notifications.show(payload);
        info!(
            "Show notification {} {:?}",
            notification.id, notification.title
        );
        Ok(notification)
    }

    /// 点击通知：关闭通知并返回需要打开的窗口地址
    pub fn on_notification_click(&self, id: u64) -> Option<String> {
        let notification = self.notifications.close(id)?;
        debug!("Notification {} clicked", notification.id);
        Some(self.settings.notification_url.clone())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.list()
    }

    /// 打开当前版本的缓存，只有激活状态的 worker 可以读写缓存
    async fn open_cache(&self) -> Option<Arc<dyn Cache>> {
        if self.state() != WorkerState::Activated {
            debug!("Worker {} not active, skip cache access", self.cache_name);
            return None;
        }
        match self.storage.open(&self.cache_name).await {
            Ok(cache) => Some(cache),
            Err(err) => {
                error!("Failed to open cache {}: {}", self.cache_name, err);
                None
            }
        }
    }

    /// 查找缓存，任何存储错误都按未命中处理
    async fn lookup(&self, key: &RequestKey) -> Option<CachedResponse> {
        // 只读时不创建缓存
        match self.storage.has(&self.cache_name).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                error!("Failed to check cache {}: {}", self.cache_name, err);
                return None;
            }
        }
        let cache = self.open_cache().await?;
        match cache.match_request(key).await {
            Ok(res) => res,
            Err(err) => {
                error!("Failed to read {} from cache: {}", key, err);
                None
            }
        }
    }

    /// 写入缓存，失败只记录日志
    async fn store(&self, key: RequestKey, response: CachedResponse) {
        let Some(cache) = self.open_cache().await else {
            return;
        };
        if let Err(err) = cache.put(key, response).await {
            error!("Failed to write cache {}: {}", self.cache_name, err);
        }
    }
}
