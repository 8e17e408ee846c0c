// Shared fixtures: on-disk artifact sets and feature samples
#![allow(dead_code)]

use crop_advisor_service::models::FeatureVector;
use serde_json::json;
use std::fs;
use std::path::Path;

pub const DEEP_LABELS: [&str; 3] = ["rice", "maize", "chickpea"];
pub const CLASSIFIER_LABELS: [&str; 2] = ["jute", "lentil"];

pub fn rice_sample() -> FeatureVector {
    FeatureVector {
        nitrogen: 90.0,
        phosphorus: 42.0,
        potassium: 43.0,
        temperature: 21.0,
        humidity: 82.0,
        ph_value: 6.5,
        rainfall: 203.0,
    }
}

fn write_json(path: &Path, value: serde_json::Value) {
    fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn write_preprocessing(dir: &Path, n_features: usize, labels: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    write_json(
        &dir.join("scaler.json"),
        json!({ "mean": vec![0.0; n_features], "scale": vec![1.0; n_features] }),
    );
    write_json(&dir.join("label_encoder.json"), json!({ "classes": labels }));
}

/// Single softmax layer over the 15 engineered features; rainfall drives "rice"
pub fn write_deep_artifacts(root: &Path) {
    let dir = root.join("deep");
    write_preprocessing(&dir, 15, &DEEP_LABELS);

    let mut weights = vec![vec![0.0f32; 3]; 15];
    weights[6] = vec![0.05, 0.0, 0.0];
    weights[0] = vec![0.0, 0.01, 0.0];
    write_json(
        &dir.join("model.json"),
        json!({
            "layers": [
                { "weights": weights, "bias": [0.0, 0.0, 0.0], "activation": "softmax" }
            ]
        }),
    );
    write_json(
        &dir.join("metadata.json"),
        json!({
            "model_type": "MLP",
            "model_version": "test",
            "num_features": 15,
            "num_classes": 3,
            "class_names": DEEP_LABELS,
        }),
    );
}

/// One-stump forest over the raw features: rainfall <= 100 -> lentil, else jute
pub fn write_classifier_artifacts(root: &Path) {
    let dir = root.join("classifier");
    write_preprocessing(&dir, 7, &CLASSIFIER_LABELS);
    write_json(
        &dir.join("model.json"),
        json!({
            "n_features": 7,
            "n_classes": 2,
            "trees": [{ "nodes": [
                { "feature": 6, "threshold": 100.0, "left": 1, "right": 2 },
                { "value": [1.0, 3.0] },
                { "value": [7.0, 3.0] }
            ]}]
        }),
    );
}
