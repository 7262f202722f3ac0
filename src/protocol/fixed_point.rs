//! Two's-complement fixed-point (Q-format) conversion.
//!
//! The data plane computes on W-bit integers interpreted as `raw / 2^P`.
//! A raw value in `[0, 2^(W-1))` is non-negative; a value in
//! `[2^(W-1), 2^W)` wraps to `(raw - 2^W) / 2^P`. The conversion must be
//! bit-exact, so all intermediate arithmetic is done on `i128` before the
//! final (exact, power-of-two) division.

use serde::Deserialize;

/// Convert a raw W-bit fixed-point value into engineering units.
///
/// # Example
///
/// ```
/// use annwire::protocol::q_to_f64;
///
/// // Q16.16: 0x0001_8000 = 1.5
/// assert_eq!(q_to_f64(0x0001_8000, 32, 16), 1.5);
/// // Most negative 32-bit value.
/// assert_eq!(q_to_f64(1 << 31, 32, 16), -32768.0);
/// ```
pub fn q_to_f64(raw: u64, word_size: u32, precision: u32) -> f64 {
    debug_assert!(word_size >= 1 && word_size <= 64);

    let raw = raw as i128;
    let signed = if raw < (1i128 << (word_size - 1)) {
        raw
    } else {
        raw - (1i128 << word_size)
    };

    signed as f64 / (1i128 << precision) as f64
}

/// Unit-conversion strategy attached to an output binding.
///
/// The original harness stored an arbitrary function per output; the set it
/// ever used is closed, so this is an enumerated strategy selected at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// Report the raw integer unchanged (e.g. a class label).
    #[default]
    Identity,
    /// Two's-complement Q-format decode using the configured word size and
    /// precision.
    FixedPoint,
}

impl Conversion {
    /// Apply the conversion to a raw data-field value.
    pub fn apply(self, raw: u64, word_size: u32, precision: u32) -> f64 {
        match self {
            Conversion::Identity => raw as f64,
            Conversion::FixedPoint => q_to_f64(raw, word_size, precision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(q_to_f64(0, 32, 16), 0.0);
    }

    #[test]
    fn test_max_positive() {
        let raw = (1u64 << 31) - 1;
        assert_eq!(q_to_f64(raw, 32, 16), raw as f64 / 65536.0);
    }

    #[test]
    fn test_most_negative() {
        assert_eq!(q_to_f64(1u64 << 31, 32, 16), -(2f64.powi(31)) / 65536.0);
        assert_eq!(q_to_f64(1u64 << 31, 32, 16), -32768.0);
    }

    #[test]
    fn test_minus_epsilon() {
        // 2^W - 1 is -1 in two's complement, i.e. -1/2^P.
        assert_eq!(q_to_f64(u32::MAX as u64, 32, 16), -1.0 / 65536.0);
    }

    #[test]
    fn test_scenario_b_exact() {
        // data = 2^31 + 5 -> (5 - 2^31) / 2^16, bit-exact.
        let raw = (1u64 << 31) + 5;
        let expected = (5.0 - 2f64.powi(31)) / 65536.0;
        assert_eq!(q_to_f64(raw, 32, 16), expected);
    }

    #[test]
    fn test_full_width_word() {
        assert_eq!(q_to_f64(u64::MAX, 64, 16), -1.0 / 65536.0);
        assert_eq!(q_to_f64(1u64 << 63, 64, 0), -(2f64.powi(63)));
    }

    #[test]
    fn test_narrow_word() {
        // Q8 with 4 fractional bits: 0xF8 = -8/16 = -0.5
        assert_eq!(q_to_f64(0xF8, 8, 4), -0.5);
        assert_eq!(q_to_f64(0x18, 8, 4), 1.5);
    }

    #[test]
    fn test_identity_conversion() {
        assert_eq!(Conversion::Identity.apply(1000, 32, 16), 1000.0);
        // Identity ignores precision entirely.
        assert_eq!(Conversion::Identity.apply(1000, 32, 0), 1000.0);
    }

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(Conversion::FixedPoint.apply(1 << 16, 32, 16), 1.0);
    }

    #[test]
    fn test_conversion_deserializes_from_snake_case() {
        let c: Conversion = serde_json::from_str("\"fixed_point\"").unwrap();
        assert_eq!(c, Conversion::FixedPoint);
        let c: Conversion = serde_json::from_str("\"identity\"").unwrap();
        assert_eq!(c, Conversion::Identity);
    }
}
