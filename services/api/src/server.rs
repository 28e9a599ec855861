use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, AppState};
use crate::routes::with_allocation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use seat_allot::config::AppConfig;
use seat_allot::error::AppError;
use seat_allot::telemetry;
use seat_allot::workflows::intake::{AllocationDataset, DatasetImporter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let dataset = match &config.intake.seed {
        Some(seed) => {
            let dataset =
                DatasetImporter::from_paths(&seed.students, &seed.entrance, &seed.vacancies)?;
            info!(
                students = dataset.students.len(),
                entrance_records = dataset.entrance_records.len(),
                vacancies = dataset.vacancies.len(),
                "allocation store seeded"
            );
            dataset
        }
        None => {
            warn!("no seed files configured; allocation store starts empty");
            AllocationDataset::default()
        }
    };

    let (allocation_service, _, _) = in_memory_service(dataset);

    let app = with_allocation_routes(Arc::new(allocation_service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "seat allocation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
