/// Feature Engineering Module
///
/// Expands the 7 raw soil/climate measurements into the 15-value vector the
/// deep model was trained on.
///
/// # Layout
/// - [0..7]: raw N, P, K, temperature, humidity, ph, rainfall
/// - [7]: NPK sum
/// - [8..11]: N/P, N/K, P/K ratios (denominator offset by `RATIO_EPSILON`)
/// - [11..13]: temperature x humidity, rainfall x humidity (both / 100)
/// - [13..15]: temperature and rainfall buckets
use crate::models::{EngineeredVector, FeatureVector, ENGINEERED_FEATURE_COUNT};

/// Offset added to ratio denominators
pub const RATIO_EPSILON: f32 = 0.01;

/// Temperature bucket edges: cold < 15 <= cool < 25 <= warm < 35 <= hot
pub const TEMPERATURE_BINS: [f32; 3] = [15.0, 25.0, 35.0];

/// Rainfall bucket edges: low < 100 <= medium < 200 <= high < 300 <= very high
pub const RAINFALL_BINS: [f32; 3] = [100.0, 200.0, 300.0];

/// Build the engineered vector. Pure: same input, same output.
pub fn engineer(features: &FeatureVector) -> EngineeredVector {
    let [n, p, k, temp, humidity, ph, rainfall] = features.to_array();

    let values: [f32; ENGINEERED_FEATURE_COUNT] = [
        n,
        p,
        k,
        temp,
        humidity,
        ph,
        rainfall,
        n + p + k,
        n / (p + RATIO_EPSILON),
        n / (k + RATIO_EPSILON),
        p / (k + RATIO_EPSILON),
        temp * humidity / 100.0,
        rainfall * humidity / 100.0,
        temperature_category(temp) as f32,
        rainfall_category(rainfall) as f32,
    ];

    EngineeredVector(values)
}

/// 0 = cold, 1 = cool, 2 = warm, 3 = hot
pub fn temperature_category(temperature: f32) -> u8 {
    digitize(temperature, &TEMPERATURE_BINS)
}

/// 0 = low, 1 = medium, 2 = high, 3 = very high
pub fn rainfall_category(rainfall: f32) -> u8 {
    digitize(rainfall, &RAINFALL_BINS)
}

/// Index of the first bin edge strictly greater than `value`
fn digitize(value: f32, bins: &[f32]) -> u8 {
    bins.iter().take_while(|&&edge| value >= edge).count() as u8
}
