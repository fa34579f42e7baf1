use tracing::{debug, warn};

use super::{FetchOutcome, Worker};
use crate::{
    fetch::{FetchMode, FetchRequest},
    network::NetworkError,
};

impl Worker {
    /// 网络优先
    ///
    /// 网络请求成功时写入缓存并返回网络响应；
    /// 网络请求失败时回退到缓存，缓存中也没有则返回 `Empty`。
    pub(super) async fn network_first(&self, request: &FetchRequest) -> FetchOutcome {
        let key = request.key();
        match self.network.fetch(request, FetchMode::Default).await {
            Ok(res) => {
                self.store(key, res.clone()).await;
                FetchOutcome::Network(res)
            }
            Err(err) => {
                warn!("Network failed for {}, falling back to cache: {}", key, err);
                match self.lookup(&key).await {
                    Some(res) => FetchOutcome::Cache(res),
                    None => {
                        debug!("No cached entry for {}", key);
                        FetchOutcome::Empty
                    }
                }
            }
        }
    }

    /// 缓存优先
    ///
    /// 命中缓存时不访问网络。未命中时请求网络，网络错误直接返回给调用方；
    /// 只有状态 200 的同源响应会被写入缓存，其余响应原样返回。
    pub(super) async fn cache_first(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchOutcome, NetworkError> {
        let key = request.key();
        if let Some(res) = self.lookup(&key).await {
            debug!("Cache hit {}", key);
            return Ok(FetchOutcome::Cache(res));
        }

        let res = self.network.fetch(request, FetchMode::Default).await?;
        if !res.is_cacheable() {
            debug!(
                "Not caching {} (status {}, {:?})",
                key, res.status, res.kind
            );
            return Ok(FetchOutcome::Network(res));
        }
        self.store(key, res.clone()).await;
        Ok(FetchOutcome::Network(res))
    }
}
