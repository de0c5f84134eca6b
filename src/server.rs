//! 状态和指标的 HTTP 接口
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/status` | 最慢请求和最近错误（JSON） |
//! | GET | `/metrics` | Prometheus exposition |

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;

use crate::metrics::{MetricsRegistry, render_prometheus};
use crate::status::StatusAggregator;

/// 处理函数共享的状态
#[derive(Clone)]
pub struct AppState {
    pub status: StatusAggregator,
    pub metrics: Arc<MetricsRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_snapshot))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
}

/// GET /status
pub async fn status_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.status.snapshot().await)
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus(&state.metrics);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
