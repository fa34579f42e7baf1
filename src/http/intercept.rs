use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    response::Response,
};
use http::{HeaderName, HeaderValue};
use tracing::debug;

use super::{
    AppState,
    error::{RouteError, RouteResult},
};
use crate::{
    fetch::{CachedResponse, FetchRequest},
    worker::FetchOutcome,
};

/// 请求体上限
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// 将入站请求转换为 [`FetchRequest`] 并交给当前 worker
///
/// 普通请求（origin-form）按 worker 的源补全为绝对地址；
/// 代理形式的绝对地址（absolute-form）保留原来的源，跨源时不会被拦截。
pub async fn intercept(State(state): State<AppState>, req: Request<Body>) -> RouteResult<Response> {
    let (parts, body) = req.into_parts();

    let uri = if parts.uri.scheme().is_some() {
        parts.uri
    } else {
        let path_query = parts
            .uri
            .path_and_query()
            .map(|v| v.as_str())
            .unwrap_or("/");
        state
            .origin
            .resolve(path_query)
            .map_err(|err| RouteError::BadRequest(err.to_string()))?
    };
    debug!("intercept {} {}", parts.method, uri);

    let body = to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|err| RouteError::BadRequest(err.to_string()))?;

    let request = FetchRequest {
        method: parts.method,
        uri,
        headers: parts.headers,
        body,
    };
    let url = request.uri.to_string();

    match state.registration.fetch(request).await? {
        FetchOutcome::Cache(res) => Ok(into_response(res, "HIT")),
        FetchOutcome::Network(res) => Ok(into_response(res, "MISS")),
        FetchOutcome::Passthrough(res) => Ok(into_response(res, "BYPASS")),
        FetchOutcome::Empty => Err(RouteError::Offline(url)),
    }
}

fn into_response(res: CachedResponse, cache_status: &'static str) -> Response {
    let mut response = Response::new(Body::from(res.body));
    *response.status_mut() = res.status;
    *response.headers_mut() = res.headers;
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(cache_status));
    response
}
