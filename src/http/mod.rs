use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use http::StatusCode;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info};

use crate::{
    config::SettingHost,
    fetch::Origin,
    middlewares::{add_version, logging_route},
    worker::Registration,
};

pub mod control;
pub mod error;
// 拦截所有非控制接口的请求
pub mod intercept;

/// 所有 handler 共享的状态
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<Registration>,
    /// 普通请求补全为绝对地址时使用的源
    pub origin: Origin,
}

impl AppState {
    pub fn new(registration: Arc<Registration>, origin: Origin) -> Self {
        Self {
            registration,
            origin,
        }
    }
}

/// 优雅关闭所有服务器
///
/// 服务器将在 30 秒内完成正在处理的请求后停止。
pub async fn shutdown_servers(handles: &mut Vec<Handle<SocketAddr>>) {
    for handle in handles.iter() {
        handle.graceful_shutdown(Some(Duration::from_secs(30)));
    }
    handles.clear();
    info!("All servers have been signaled to shut down");
}

/// 启动所有服务器
///
/// 单个服务器启动失败只记录错误日志，不影响其他服务器的启动。
pub async fn start_servers(hosts: Vec<SettingHost>, state: AppState) -> Vec<Handle<SocketAddr>> {
    let mut handles = Vec::new();
    for host in hosts {
        let server_addr = format!("{}:{}", host.ip, host.port);
        match make_server(host, state.clone()).await {
            Ok(handle) => {
                handles.push(handle);
                info!("Server instance started on {}", server_addr);
            }
            Err(e) => {
                error!(
                    "Failed to start server instance on {}: {:?}",
                    server_addr, e
                );
            }
        }
    }
    handles
}

/// 控制接口路由
fn control_router(prefix: &str) -> Router<AppState> {
    let routes = Router::new()
        .route("/status", get(control::status))
        .route("/push", post(control::push))
        .route("/notifications", get(control::notifications))
        .route(
            "/notifications/{id}/click",
            post(control::notification_click),
        )
        .route("/sync/{tag}", post(control::sync));
    Router::new().nest(prefix, routes)
}

/// 构建完整的路由：控制接口 + 拦截其余所有请求
pub fn make_router(host: &SettingHost, state: AppState) -> Router {
    let router = control_router(&host.control_prefix)
        .fallback(intercept::intercept)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(add_version))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::SERVICE_UNAVAILABLE,
                    Duration::from_secs(host.timeout.into()),
                )),
        );
    logging_route(router)
}

pub async fn make_server(
    host: SettingHost,
    state: AppState,
) -> anyhow::Result<Handle<SocketAddr>> {
    debug!("make_server start with host: {:?}", host);
    let router = make_router(&host, state);

    let (ssl, certificate, certificate_key) =
        (host.ssl, host.certificate.clone(), host.certificate_key.clone());
    let addr: SocketAddr = format!("{}:{}", host.ip, host.port).parse()?;

    let handle = Handle::new();
    let handle_clone = handle.clone();

    // 生成一个任务来运行服务器
    tokio::spawn(async move {
        let res = if ssl {
            match (certificate, certificate_key) {
                (Some(cert), Some(key)) => {
                    debug!("Certificate: {} Certificate key: {}", cert, key);
                    match RustlsConfig::from_pem_file(&cert, &key).await {
                        Ok(rustls_config) => {
                            info!("Listening on https://{}", addr);
                            axum_server::bind_rustls(addr, rustls_config)
                                .handle(handle_clone)
                                .serve(router.into_make_service())
                                .await
                                .map_err(anyhow::Error::from)
                        }
                        Err(e) => Err(anyhow::Error::from(e)),
                    }
                }
                _ => Err(anyhow!("SSL enabled but certificate or key missing")),
            }
        } else {
            info!("Listening on http://{}", addr);
            axum_server::bind(addr)
                .handle(handle_clone)
                .serve(router.into_make_service())
                .await
                .map_err(anyhow::Error::from)
        };
        if let Err(e) = res {
            error!("Server on {} stopped: {:?}", addr, e);
        }
    });

    Ok(handle)
}
