use crate::cli::ServeArgs;
use crate::infra::{build_services, AppState, TesseractOcrEngine};
use crate::routes::with_onboarding_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kyc_onboarding::config::AppConfig;
use kyc_onboarding::error::AppError;
use kyc_onboarding::telemetry;
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

    tokio::fs::create_dir_all(config.onboarding.drafts_dir()).await?;
    tokio::fs::create_dir_all(config.onboarding.artifacts_dir()).await?;
    tokio::fs::create_dir_all(config.onboarding.records_dir()).await?;

    let ocr = Arc::new(TesseractOcrEngine::new(config.onboarding.ocr_binary.clone()));
    let (onboarding, notifications) = build_services(&config.onboarding, ocr);

    let app = with_onboarding_routes(onboarding, notifications)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.onboarding.data_dir.display(),
        threshold = config.onboarding.corroboration.verified_threshold,
        "kyc onboarding service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
