use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use exam_seating::allocation::{
    seating_router, NotificationDispatcher, SeatAllocationService, SeatingStore,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_seating_routes<S, N>(service: Arc<SeatAllocationService<S, N>>) -> axum::Router
where
    S: SeatingStore + 'static,
    N: NotificationDispatcher + 'static,
{
    seating_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::LoggingNotifier;
    use exam_seating::allocation::{InMemorySeatingStore, SeatingPolicy};

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn seating_routes_build_on_the_memory_store() {
        let service = Arc::new(SeatAllocationService::new(
            Arc::new(InMemorySeatingStore::new()),
            Arc::new(LoggingNotifier::default()),
            SeatingPolicy::default(),
        ));
        let _router = with_seating_routes(service);
    }
}
