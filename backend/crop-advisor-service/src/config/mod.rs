use crate::services::{BackendPreference, PredictorConfig};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub models: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub service_name: String,
    /// Upper bound on uploaded soil image bodies
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub artifact_dir: String,
    /// `auto`, `rule_based`, `classifier` or `deep`
    pub crop_backend: String,
    pub rule_rng_seed: Option<u64>,
    pub soil_model_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                http_port: env::var("HTTP_PORT")
                    .unwrap_or_else(|_| "8012".to_string())
                    .parse()
                    .unwrap_or(8012),
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "crop-advisor-service".to_string()),
                max_image_bytes: env::var("MAX_IMAGE_BYTES")
                    .unwrap_or_else(|_| "10485760".to_string())
                    .parse()
                    .unwrap_or(10 * 1024 * 1024),
            },
            models: ModelConfig {
                artifact_dir: env::var("ARTIFACT_DIR").unwrap_or_else(|_| "ml_models".to_string()),
                crop_backend: env::var("CROP_BACKEND").unwrap_or_else(|_| "auto".to_string()),
                rule_rng_seed: env::var("RULE_RNG_SEED").ok().and_then(|s| s.parse().ok()),
                soil_model_path: env::var("SOIL_MODEL_PATH")
                    .unwrap_or_else(|_| "ml_models/soil/model.onnx".to_string()),
            },
        })
    }

    /// Settings for the crop predictor; an unknown backend name means `auto`
    pub fn predictor_config(&self) -> PredictorConfig {
        let backend = self
            .models
            .crop_backend
            .parse()
            .unwrap_or_else(|e| {
                warn!("{}, using auto backend selection", e);
                BackendPreference::Auto
            });

        PredictorConfig {
            artifact_dir: PathBuf::from(&self.models.artifact_dir),
            backend,
            rng_seed: self.models.rule_rng_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackendKind;
    use serial_test::serial;

    const KEYS: [&str; 7] = [
        "HTTP_PORT",
        "SERVICE_NAME",
        "MAX_IMAGE_BYTES",
        "ARTIFACT_DIR",
        "CROP_BACKEND",
        "RULE_RNG_SEED",
        "SOIL_MODEL_PATH",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert_eq!(config.service.http_port, 8012);
        assert_eq!(config.service.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.models.artifact_dir, "ml_models");
        assert_eq!(config.models.rule_rng_seed, None);
        assert_eq!(config.predictor_config().backend, BackendPreference::Auto);
    }

    #[test]
    #[serial]
    fn test_overrides_and_invalid_values() {
        clear_env();
        env::set_var("HTTP_PORT", "not-a-port");
        env::set_var("CROP_BACKEND", "deep");
        env::set_var("RULE_RNG_SEED", "42");
        env::set_var("ARTIFACT_DIR", "/srv/models");

        let config = Config::from_env().unwrap();
        let predictor = config.predictor_config();

        assert_eq!(config.service.http_port, 8012);
        assert_eq!(
            predictor.backend,
            BackendPreference::Fixed(BackendKind::DeepModel)
        );
        assert_eq!(predictor.rng_seed, Some(42));
        assert_eq!(predictor.artifact_dir, PathBuf::from("/srv/models"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_backend_means_auto() {
        clear_env();
        env::set_var("CROP_BACKEND", "xgboost");

        let config = Config::from_env().unwrap();
        assert_eq!(config.predictor_config().backend, BackendPreference::Auto);
        clear_env();
    }
}
