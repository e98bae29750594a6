//! Pull-style counter snapshot. The flow and router record events
//! synchronously at each decision point; this endpoint only reads.

use axum::{
    extract::Extension,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::Gateway;
use crate::observe::CounterSnapshot;

#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsResponse {
    pub counters: CounterSnapshot,
    pub active_sessions: usize,
    pub pending_second_factor: usize,
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Current counters and gauges", body = MetricsResponse)
    ),
    tag = "observability"
)]
pub async fn metrics(gateway: Extension<Arc<Gateway>>) -> impl IntoResponse {
    Json(MetricsResponse {
        counters: gateway.counters.snapshot(),
        active_sessions: gateway.store.session_count().await,
        pending_second_factor: gateway.store.pending_count().await,
    })
}
