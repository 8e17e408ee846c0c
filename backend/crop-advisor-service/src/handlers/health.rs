use super::{run_blocking, AppState};
use crate::error::Result;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Reports the configured crop backend and whether its artifacts loaded
pub async fn ready(state: web::Data<AppState>) -> Result<HttpResponse> {
    let predictor = state.predictor.clone();
    let trained = run_blocking(move || predictor.is_trained()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "backend": state.predictor.backend_kind(),
        "trained": trained,
    })))
}
