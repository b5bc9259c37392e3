use crate::cli::ServeArgs;
use crate::infra::{load_config, open_repository, AppState};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use job_tracker::applications::JobApplicationService;
use job_tracker::error::AppError;
use job_tracker::telemetry::{self, LogOutput};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs, data_file: Option<PathBuf>) -> Result<(), AppError> {
    let mut config = load_config(data_file)?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, LogOutput::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(open_repository(&config.storage)?);
    match repository.snapshot_path() {
        Some(path) => info!(path = %path.display(), "persisting applications to snapshot file"),
        None => info!("no APP_DATA_FILE configured; applications are kept in memory only"),
    }
    let application_service = Arc::new(JobApplicationService::new(repository, config.listing));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job application tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
