use super::{run_blocking, AppState};
use crate::error::Result;
use actix_web::{web, HttpResponse};
use tracing::info;

/// Classify the soil in a raw image body
pub async fn classify_soil(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse> {
    let classifier = state.soil.clone();
    let size = body.len();
    let classification = run_blocking(move || classifier.classify(&body)).await??;

    info!(
        soil_type = classification.soil_type.as_str(),
        confidence = classification.confidence_score,
        bytes = size,
        "Soil classification served"
    );

    Ok(HttpResponse::Ok().json(classification))
}
