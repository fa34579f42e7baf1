use std::fmt::Display;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use serde_repr::*;
use tracing::{error, warn};

use crate::network::NetworkError;

#[derive(thiserror::Error, Debug)]
pub enum RouteError {
    #[error("{0}")]
    Any(#[from] anyhow::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no active worker")]
    NoWorker,
    /// 网络不可用且缓存中没有对应条目
    #[error("offline and not cached: {0}")]
    Offline(String),
    #[error("{0}")]
    BadGateway(#[from] NetworkError),
}

#[derive(Serialize_repr, Deserialize_repr, PartialEq, Debug)]
#[repr(u16)]
pub enum ErrorCode {
    Normal = 200,
    InternalError = 1000,
    BadRequest = 1001,
    NotFound = 1002,
    NoWorker = 1003,
    Offline = 1004,
    BadGateway = 1005,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorCode::*;

        let res = match self {
            Normal => "",
            InternalError => "服务器内部错误",
            BadRequest => "请求参数错误",
            NotFound => "资源不存在",
            NoWorker => "没有激活的 worker",
            Offline => "网络不可用且没有缓存",
            BadGateway => "源站请求失败",
        };
        f.write_str(res)?;
        Ok(())
    }
}

/// Log and return INTERNAL_SERVER_ERROR
fn log_internal_error<T: Display>(err: T) -> (StatusCode, ErrorCode, String) {
    use ErrorCode::*;

    error!("{err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        InternalError,
        "internal server error".to_string(),
    )
}

// Tell axum how to convert `RouteError` into a response.
impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        use RouteError::*;

        let (status_code, code, err_message) = match self {
            Any(err) => log_internal_error(err),
            BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest, msg),
            NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg),
            NoWorker => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::NoWorker,
                "no active worker".to_string(),
            ),
            Offline(url) => {
                warn!("Offline and not cached: {url}");
                (StatusCode::GATEWAY_TIMEOUT, ErrorCode::Offline, url)
            }
            BadGateway(err) => {
                warn!("{err}");
                (StatusCode::BAD_GATEWAY, ErrorCode::BadGateway, err.to_string())
            }
        };
        let body = Json(json!({
            "code": code,
            "message": code.to_string(),
            "error": err_message
        }));
        (status_code, body).into_response()
    }
}

pub type RouteResult<T, E = RouteError> = Result<T, E>;
