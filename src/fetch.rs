//! 请求、响应快照以及缓存键等 worker 与存储、网络层共用的类型

use std::fmt::{self, Display};

use bytes::Bytes;
use http::{
    HeaderMap, Method, StatusCode, Uri,
    header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, IF_UNMODIFIED_SINCE},
};
use serde::{Deserialize, Serialize};

/// 源（scheme + host + port），用于判断请求是否同源
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    /// 从绝对 URI 中解析源，相对 URI 返回 `None`
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        let scheme = uri.scheme_str()?.to_ascii_lowercase();
        let host = uri.host()?.to_ascii_lowercase();
        let port = match uri.port_u16() {
            Some(port) => port,
            None => match scheme.as_str() {
                "http" => 80,
                "https" => 443,
                _ => return None,
            },
        };
        Some(Self { scheme, host, port })
    }

    pub fn parse(origin: &str) -> Option<Self> {
        let uri: Uri = origin.parse().ok()?;
        Self::from_uri(&uri)
    }

    /// 将路径（或绝对 URL）解析为该源下的绝对 URI
    pub fn resolve(&self, url: &str) -> Result<Uri, http::uri::InvalidUri> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.parse();
        }
        let path = if url.starts_with('/') {
            url.to_string()
        } else {
            format!("/{url}")
        };
        format!("{self}{path}").parse()
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_port = matches!(
            (self.scheme.as_str(), self.port),
            ("http", 80) | ("https", 443)
        );
        if default_port {
            write!(f, "{}://{}", self.scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// 拦截到的请求
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub method: Method,
    /// 绝对 URI
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn get(uri: Uri) -> Self {
        Self {
            method: Method::GET,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn origin(&self) -> Option<Origin> {
        Origin::from_uri(&self.uri)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// 去掉条件请求头，源站不会再返回没有响应体的 304
    pub fn without_validators(mut self) -> Self {
        for name in [
            IF_NONE_MATCH,
            IF_MODIFIED_SINCE,
            IF_MATCH,
            IF_UNMODIFIED_SINCE,
            IF_RANGE,
        ] {
            self.headers.remove(name);
        }
        self
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), self.uri.to_string())
    }
}

/// 缓存键：请求方法 + 绝对 URL
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

impl Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// 网络请求的模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// 普通请求
    Default,
    /// 绕过中间缓存，强制从源站获取（安装阶段使用）
    Reload,
}

/// 响应类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// 同源响应
    Basic,
    /// 跨源响应（例如被重定向到其他源）
    Cors,
}

/// 响应快照：状态、响应头、完整响应体
#[derive(Clone, Debug, PartialEq)]
pub struct CachedResponse {
    /// 最终响应的 URL（跟随重定向后）
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl CachedResponse {
    /// 是否可以写入静态资源缓存：状态 200 且为同源响应
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.kind == ResponseKind::Basic
    }
}
