//! 控制接口：把 push / sync / notificationclick 事件转交给当前 worker

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{debug, info};

use super::{
    AppState,
    error::{RouteError, RouteResult},
};
use crate::{error::Error, worker::Worker};

fn active_worker(state: &AppState) -> RouteResult<Arc<Worker>> {
    state.registration.active().ok_or(RouteError::NoWorker)
}

/// 当前 worker 状态
pub async fn status(State(state): State<AppState>) -> RouteResult<impl IntoResponse> {
    let worker = active_worker(&state)?;
    Ok(Json(worker.status()))
}

/// 推送消息，请求体为 `{ "title": "...", "body": "...", "icon": "..." }`
pub async fn push(State(state): State<AppState>, body: Bytes) -> RouteResult<impl IntoResponse> {
    let worker = active_worker(&state)?;
    let notification = worker.on_push(&body).map_err(|err| match err {
        Error::Json(err) => RouteError::BadRequest(format!("invalid push payload: {err}")),
        err => RouteError::Any(err.into()),
    })?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn notifications(State(state): State<AppState>) -> RouteResult<impl IntoResponse> {
    let worker = active_worker(&state)?;
    Ok(Json(worker.notifications()))
}

/// 点击通知，返回需要打开的窗口地址
pub async fn notification_click(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> RouteResult<impl IntoResponse> {
    let worker = active_worker(&state)?;
    let url = worker
        .on_notification_click(id)
        .ok_or_else(|| RouteError::NotFound(format!("notification {id}")))?;
    debug!("notification {} opens {}", id, url);
    Ok(Json(json!({ "open_window": url })))
}

/// 后台同步，在后台任务中执行，立即返回 202
pub async fn sync(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> RouteResult<impl IntoResponse> {
    let worker = active_worker(&state)?;
    info!("Sync event {}", tag);
    tokio::spawn(async move {
        worker.on_sync(&tag).await;
    });
    Ok(StatusCode::ACCEPTED)
}
