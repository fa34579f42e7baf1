//! 网络层：worker 通过 [`Network`] 访问源站

use std::time::Duration;

use async_trait::async_trait;
use http::{
    HeaderMap, HeaderName, HeaderValue,
    header::{CACHE_CONTROL, PRAGMA},
};
use reqwest::Client;
use tracing::debug;

use crate::fetch::{CachedResponse, FetchMode, FetchRequest, Origin, ResponseKind};

#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {0} timed out")]
    Timeout(String),
    /// 无法建立连接，通常意味着离线
    #[error("network unavailable: {0}")]
    Unavailable(String),
}

/// 对源站发起请求并读取完整响应
///
/// 请求被拒绝（连接失败、超时等）返回 `Err`；
/// 任何状态码的响应都视为成功返回。
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        mode: FetchMode,
    ) -> Result<CachedResponse, NetworkError>;
}

/// 基于 reqwest 的网络实现，内部复用连接池
#[derive(Clone)]
pub struct ReqwestNetwork {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestNetwork {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client, timeout })
    }
}

/// 不转发给源站的请求头
pub fn is_exclude_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "host"
            | "connection"
            | "proxy-connection"
            | "keep-alive"
            | "transfer-encoding"
            | "te"
            | "trailer"
            | "upgrade"
            | "content-length"
            | "accept-encoding"
    )
}

/// 不写回客户端的响应头（响应体已被完整读取并解压）
fn is_exclude_response_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "transfer-encoding"
            | "trailer"
            | "content-length"
            | "content-encoding"
    )
}

#[async_trait]
impl Network for ReqwestNetwork {
    async fn fetch(
        &self,
        request: &FetchRequest,
        mode: FetchMode,
    ) -> Result<CachedResponse, NetworkError> {
        let url = request.uri.to_string();
        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        for (name, value) in request.headers.iter() {
            if is_exclude_header(name) {
                continue;
            }
            builder = builder.header(name.clone(), value.clone());
        }
        if mode == FetchMode::Reload {
            builder = builder
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .header(PRAGMA, HeaderValue::from_static("no-cache"));
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let map_err = |source: reqwest::Error| {
            if source.is_timeout() {
                NetworkError::Timeout(url.clone())
            } else if source.is_connect() {
                NetworkError::Unavailable(url.clone())
            } else {
                NetworkError::Request {
                    url: url.clone(),
                    source,
                }
            }
        };

        let res = builder.send().await.map_err(map_err)?;
        let status = res.status();
        let final_url = res.url().to_string();
        let mut headers = HeaderMap::new();
        for (name, value) in res.headers().iter() {
            if !is_exclude_response_header(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        let body = res.bytes().await.map_err(map_err)?;

        let kind = match (Origin::parse(&final_url), request.origin()) {
            (Some(final_origin), Some(origin)) if final_origin == origin => ResponseKind::Basic,
            _ => ResponseKind::Cors,
        };
        debug!("fetched {} {} {:?}", status, final_url, kind);

        Ok(CachedResponse {
            url: final_url,
            status,
            headers,
            body,
            kind,
        })
    }
}
