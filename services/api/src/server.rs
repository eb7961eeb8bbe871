use crate::cli::ServeArgs;
use crate::infra::{demo_register, seed_repository, AppState};
use crate::routes::with_identity_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use contractor_registry::config::AppConfig;
use contractor_registry::error::AppError;
use contractor_registry::identity::{EmployerIdentityService, InMemoryIdentityRepository};
use contractor_registry::telemetry;
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

    let repository = Arc::new(InMemoryIdentityRepository::default());
    if args.seed_demo {
        seed_repository(&repository, demo_register())?;
        info!("demo register loaded");
    }
    let identity_service = Arc::new(EmployerIdentityService::new(
        repository,
        config.resolution.clone(),
    ));

    let app = with_identity_routes(identity_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cluster_threshold = config.resolution.cluster_threshold,
        "employer identity service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
