//! Conversions for the board format's native length unit.
//!
//! One native unit is 0.1 mil (1/10,000 inch).

pub fn to_inch(native: f64) -> f64 {
    native / 10_000.0
}

pub fn to_mm(native: f64) -> f64 {
    to_inch(native) * 25.4
}

pub fn to_mil(native: f64) -> f64 {
    native / 10.0
}

pub fn mil_to_native(mil: f64) -> i64 {
    (mil * 10.0).round() as i64
}
