//! Relative power to sound-pressure-level conversion

/// Reference level for 0 dB SPL
pub const REFERENCE_DB: f64 = 94.0;

/// Lowest relative power a meter reports (silence or underflow)
pub const SILENCE_FLOOR_DB: f32 = -160.0;

/// Width of the relative metering range
const METERING_RANGE_DB: f64 = 160.0;

/// Map a relative power in dBFS onto an SPL estimate
///
/// Linear over the metering range: `94 + (power + 160) * 94 / 160`.
pub fn to_spl(power: f32) -> f64 {
    let power = f64::from(power);
    REFERENCE_DB + (power + METERING_RANGE_DB) * (REFERENCE_DB / METERING_RANGE_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    #[test]
    fn follows_linear_mapping_across_metering_range() {
        for step in 0..=1600 {
            let power = -160.0 + step as f32 * 0.1;
            let expected = 94.0 + (f64::from(power) + 160.0) * (94.0 / 160.0);
            assert!((to_spl(power) - expected).abs() < EPSILON, "power {power}");
        }
    }

    #[test]
    fn silence_floor_maps_to_reference() {
        assert!((to_spl(SILENCE_FLOOR_DB) - 94.0).abs() < EPSILON);
    }

    #[test]
    fn full_scale_maps_to_twice_reference() {
        assert!((to_spl(0.0) - 188.0).abs() < EPSILON);
    }

    #[test]
    fn minus_forty_dbfs_is_164_5() {
        assert!((to_spl(-40.0) - 164.5).abs() < EPSILON);
    }
}
