use crate::cli::ServeArgs;
use crate::infra::{seed_sample_campus, AppState, LoggingNotifier};
use crate::routes::with_seating_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use exam_seating::allocation::{InMemorySeatingStore, SeatAllocationService};
use exam_seating::config::AppConfig;
use exam_seating::error::AppError;
use exam_seating::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemorySeatingStore::new());
    if args.seed_sample {
        seed_sample_campus(&store).map_err(exam_seating::allocation::SeatingError::from)?;
    }
    let policy = config.seating.policy()?;
    info!(
        columns = ?policy.grid.columns(),
        rows = policy.grid.rows(),
        stage = %policy.stage_label,
        "seating policy loaded"
    );
    let service = Arc::new(SeatAllocationService::new(
        store,
        Arc::new(LoggingNotifier::default()),
        policy,
    ));

    let app = with_seating_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "exam seating service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
