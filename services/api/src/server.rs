use crate::cli::ServeArgs;
use crate::infra::{build_workflow, AppState, LogEvents};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tradelink::config::AppConfig;
use tradelink::error::AppError;
use tradelink::telemetry;
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

    let policy = config.acceptance;
    let (workflow, _store) = build_workflow(policy, LogEvents);

    let app = with_marketplace_routes(workflow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        start_job_on_accept = policy.start_job_on_accept,
        reject_shortlisted_on_accept = policy.reject_shortlisted_on_accept,
        "tradelink marketplace service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
