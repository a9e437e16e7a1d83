//! dB/linear conversions and small numeric helpers used on both sides of the
//! loop.

/// Convert a power ratio in dB to a linear ratio.
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Convert a linear power ratio to dB.
///
/// Returns negative infinity for non-positive inputs rather than NaN.
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        10.0 * linear.log10()
    }
}

/// Convert a transmit power in dBm to milliwatts.
pub fn dbm_to_milliwatts(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Convert a clamped power reduction in dB to the matching amplitude factor.
///
/// The Range-Doppler map stores magnitudes, so a power-domain reduction of
/// `db` corresponds to multiplying every cell by `10^(-db/20)`.
pub fn db_reduction_to_amplitude_factor(db: f64) -> f64 {
    10f64.powf(-db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        for db in [-30.0, -3.0, 0.0, 3.0, 10.0, 60.0] {
            let lin = db_to_linear(db);
            assert!((linear_to_db(lin) - db).abs() < 1e-9);
        }
    }

    #[test]
    fn dbm_reference_points() {
        assert!((dbm_to_milliwatts(0.0) - 1.0).abs() < 1e-12);
        assert!((dbm_to_milliwatts(30.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn linear_to_db_handles_zero() {
        assert_eq!(linear_to_db(0.0), f64::NEG_INFINITY);
        assert_eq!(linear_to_db(-1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn amplitude_factor_matches_power_factor() {
        // A 6 dB power reduction is a factor ~3.981 in power, ~1.995 in amplitude.
        let amp = db_reduction_to_amplitude_factor(6.0);
        assert!((amp * amp - 1.0 / db_to_linear(6.0)).abs() < 1e-12);
    }
}
