//! 集成测试的公共辅助函数和工具

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::Result;
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_server::Handle;
use dashmap::DashMap;
use tempfile::TempDir;

use swcache::{
    application::{ServerHandles, start},
    config::Settings,
    worker::Registration,
};

/// 模拟的源站
///
/// 路径到响应体的映射，未配置的路径返回 404。
#[derive(Default)]
pub struct OriginState {
    pub routes: DashMap<String, String>,
    pub hits: DashMap<String, usize>,
    pub total: AtomicUsize,
}

impl OriginState {
    pub fn hits(&self, path: &str) -> usize {
        self.hits.get(path).map(|v| *v).unwrap_or(0)
    }
}

pub struct FakeOrigin {
    pub addr: SocketAddr,
    pub state: Arc<OriginState>,
    handle: Handle<SocketAddr>,
}

impl FakeOrigin {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set(&self, path: &str, body: &str) {
        self.state.routes.insert(path.to_string(), body.to_string());
    }

    /// 关闭源站，之后的请求都会连接失败
    pub async fn shutdown(&self) {
        self.handle.shutdown();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

async fn origin_handler(State(state): State<Arc<OriginState>>, req: Request) -> impl IntoResponse {
    let path = req.uri().path().to_string();
    state.total.fetch_add(1, Ordering::SeqCst);
    *state.hits.entry(path.clone()).or_insert(0) += 1;
    // 客户端带了验证器时按未修改处理
    if req.headers().contains_key("if-none-match") && state.routes.contains_key(&path) {
        return (StatusCode::NOT_MODIFIED, String::new());
    }
    match state.routes.get(&path) {
        Some(body) => (StatusCode::OK, body.clone()),
        None => (StatusCode::NOT_FOUND, "not found".to_string()),
    }
}

/// 在随机端口上启动模拟源站
pub async fn start_origin(routes: &[(&str, &str)]) -> Result<FakeOrigin> {
    let state = Arc::new(OriginState::default());
    for (path, body) in routes {
        state.routes.insert(path.to_string(), body.to_string());
    }

    let router = Router::new()
        .fallback(origin_handler)
        .with_state(state.clone());
    let handle = Handle::new();
    let server_handle = handle.clone();
    tokio::spawn(async move {
        axum_server::bind("127.0.0.1:0".parse().unwrap())
            .handle(server_handle)
            .serve(router.into_make_service())
            .await
    });
    let addr = handle
        .listening()
        .await
        .ok_or_else(|| anyhow::anyhow!("origin not listening"))?;

    Ok(FakeOrigin {
        addr,
        state,
        handle,
    })
}

/// 生成配置内容，缓存存储在临时目录中
pub fn config_content(origin: &str, version: &str, manifest: &[&str], cache_dir: &str) -> String {
    format!(
        r#"
log_level = "debug"

[storage]
backend = "disk"
path = "{cache_dir}"

[worker]
origin = "{origin}"
version = "{version}"
manifest = {manifest:?}
fetch_timeout = 5

[[host]]
ip = "127.0.0.1"
port = 0
timeout = 10
"#
    )
}

/// 创建临时配置文件用于测试
pub fn create_temp_config(
    origin: &str,
    version: &str,
    manifest: &[&str],
) -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let cache_dir = temp_dir.path().join("cache");
    let config_path = temp_dir.path().join("config.toml");
    let content = config_content(origin, version, manifest, &cache_dir.to_string_lossy());
    std::fs::write(&config_path, content)?;
    Ok((temp_dir, config_path))
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub registration: Arc<Registration>,
    pub handles: ServerHandles,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// 按配置文件启动完整的应用
pub async fn start_test_server(config_path: &PathBuf) -> Result<TestServer> {
    let settings = Settings::new(&config_path.to_string_lossy())?;
    let (registration, handles) = start(settings).await?;
    let addr = get_server_addr(&handles).await?;
    Ok(TestServer {
        addr,
        registration,
        handles,
    })
}

pub async fn get_server_addr(handles: &ServerHandles) -> Result<SocketAddr> {
    let handle = handles
        .lock()
        .await
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no server started"))?;
    handle
        .listening()
        .await
        .ok_or_else(|| anyhow::anyhow!("server not listening"))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build client")
}

pub fn x_cache(res: &reqwest::Response) -> String {
    res.headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
