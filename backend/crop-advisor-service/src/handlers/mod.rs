/// HTTP handlers for crop-advisor-service
///
/// - Health: liveness and backend readiness
/// - Predictions: crop recommendations from soil and climate measurements
/// - Classifications: soil type from an uploaded photo
pub mod health;
pub mod predictions;
pub mod soil;

pub use health::{health, ready};
pub use predictions::{crop_labels, predict_crop, CropPredictionRequest, CropPredictionResponse};
pub use soil::classify_soil;

use crate::error::PredictionError;
use crate::services::{CropPredictor, SoilClassifier};
use actix_web::{error::BlockingError, web};
use std::sync::Arc;

/// Shared services injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<CropPredictor>,
    pub soil: Arc<SoilClassifier>,
    pub max_image_bytes: usize,
}

/// Register routes and extractor limits
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.clone()))
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            PredictionError::InvalidInput(err.to_string()).into()
        }))
        .app_data(web::PayloadConfig::new(state.max_image_bytes))
        .route("/health", web::get().to(health))
        .route("/ready", web::get().to(ready))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/predictions/crop")
                        .route("", web::post().to(predict_crop))
                        .route("/labels", web::get().to(crop_labels)),
                )
                .route("/classifications/soil", web::post().to(classify_soil)),
        );
}

/// Run model work off the async workers
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, PredictionError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e: BlockingError| PredictionError::InferenceError(e.to_string()))
}
