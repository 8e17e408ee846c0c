/// Crop prediction handlers
use super::{run_blocking, AppState};
use crate::error::Result;
use crate::models::{BackendKind, FeatureVector, PredictionResult, RankedCandidate};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

/// Soil and climate measurements submitted for a recommendation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CropPredictionRequest {
    #[validate(range(min = 0.0))]
    pub nitrogen: f32,
    #[validate(range(min = 0.0))]
    pub phosphorus: f32,
    #[validate(range(min = 0.0))]
    pub potassium: f32,
    #[validate(range(min = -50.0, max = 70.0))]
    pub temperature: f32,
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity: f32,
    #[validate(range(min = 0.0, max = 14.0))]
    pub ph_value: f32,
    #[validate(range(min = 0.0))]
    pub rainfall: f32,
    #[validate(length(max = 200))]
    pub location: Option<String>,
}

impl From<&CropPredictionRequest> for FeatureVector {
    fn from(req: &CropPredictionRequest) -> Self {
        Self {
            nitrogen: req.nitrogen,
            phosphorus: req.phosphorus,
            potassium: req.potassium,
            temperature: req.temperature,
            humidity: req.humidity,
            ph_value: req.ph_value,
            rainfall: req.rainfall,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CropPredictionResponse {
    pub predicted_crop: String,
    pub confidence_score: f32,
    pub confidence_percent: f32,
    pub top_3: Vec<RankedCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_candidate_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_candidate_labels: Option<Vec<String>>,
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CropPredictionResponse {
    fn new(result: PredictionResult, location: Option<String>) -> Self {
        Self {
            top_3: result.top_3_candidates(),
            predicted_crop: result.predicted_label,
            confidence_score: result.confidence_score,
            confidence_percent: result.confidence_percent,
            total_candidate_count: result.total_candidate_count,
            all_candidate_labels: result.all_candidate_labels,
            backend: result.backend,
            location,
        }
    }
}

/// Recommend crops for the submitted measurements
pub async fn predict_crop(
    state: web::Data<AppState>,
    req: web::Json<CropPredictionRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    req.validate()?;

    let features = FeatureVector::from(&req);
    let predictor = state.predictor.clone();
    let result = run_blocking(move || predictor.predict(&features)).await?;

    info!(
        predicted = %result.predicted_label,
        confidence = result.confidence_score,
        backend = %result.backend,
        "Crop prediction served"
    );

    Ok(HttpResponse::Ok().json(CropPredictionResponse::new(result, req.location)))
}

/// Labels the active crop backend can predict
pub async fn crop_labels(state: web::Data<AppState>) -> Result<HttpResponse> {
    let predictor = state.predictor.clone();
    let labels = run_blocking(move || predictor.known_labels()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "total": labels.len(),
        "labels": labels,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CropPredictionRequest {
        CropPredictionRequest {
            nitrogen: 90.0,
            phosphorus: 42.0,
            potassium: 43.0,
            temperature: 21.0,
            humidity: 82.0,
            ph_value: 6.5,
            rainfall: 203.0,
            location: Some("Punjab".to_string()),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_range_checks() {
        let mut req = request();
        req.humidity = 120.0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.ph_value = -1.0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.temperature = -60.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_feature_vector_conversion() {
        let features = FeatureVector::from(&request());
        assert_eq!(features.rainfall, 203.0);
        assert_eq!(features.ph_value, 6.5);
    }
}
