use crate::cli::ServeArgs;
use crate::infra::{
    load_rate_schedule, AppState, InMemoryLoanApplicationRepository,
    InMemoryNotificationPublisher,
};
use crate::routes::with_lending_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loanflow::config::AppConfig;
use loanflow::error::AppError;
use loanflow::telemetry;
use loanflow::workflows::lending::applications::LoanApplicationService;
use loanflow::workflows::lending::QuoteEngine;
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

    let schedule = load_rate_schedule(&config.rates)?;
    let rate_version = schedule.version.clone();
    let repository = Arc::new(InMemoryLoanApplicationRepository::default());
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let application_service = Arc::new(LoanApplicationService::new(
        repository,
        notifications,
        QuoteEngine::new(schedule),
    ));

    let app = with_lending_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, rate_table = %rate_version, "loan origination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
