use actix_web::{App, HttpServer};
use crop_advisor_service::{handlers, AppState, Config, CropPredictor, SoilClassifier};
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;

    info!(
        "Starting {} on HTTP:{}",
        config.service.service_name, config.service.http_port
    );

    let predictor = Arc::new(CropPredictor::new(config.predictor_config()));
    let soil = Arc::new(SoilClassifier::new(&config.models.soil_model_path));

    let state = AppState {
        predictor,
        soil,
        max_image_bytes: config.service.max_image_bytes,
    };

    let addr = format!("0.0.0.0:{}", config.service.http_port);
    info!("HTTP server listening on {}", addr);

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(TracingLogger::default())
            .configure(move |cfg| handlers::configure(cfg, &state))
    })
    .bind(&addr)?
    .run()
    .await
    .map_err(|e| {
        error!("HTTP server error: {}", e);
        e
    })?;

    Ok(())
}
