// Utility functions for crop-advisor-service

/// Round a score to two decimals, the precision shown to users
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Clamp a score to the [0, 1] range
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
