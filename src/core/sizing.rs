//! Bloom filter signature sizing.
//!
//! The signature size m for n elements, h hash functions and target
//! false positive rate p is the standard Bloom filter lower bound
//!
//! ```text
//! m = ceil(-n * h / ln(1 - p^(1/h)))
//! ```
//!
//! m is monotone in n, so it is computed per batch (classic) and per
//! page (compact) from the local maximum term count.

use crate::error::{CobsError, Result};

/// Bits per element needed for `num_hashes` hash functions at the given
/// false positive rate.
pub fn calc_signature_size_ratio(num_hashes: u64, false_positive_rate: f64) -> f64 {
    let h = num_hashes as f64;
    -h / (1.0 - false_positive_rate.powf(1.0 / h)).ln()
}

/// Signature size in bits for `num_elements` insertions, clamped to >= 1.
pub fn calc_signature_size(
    num_elements: u64,
    num_hashes: u64,
    false_positive_rate: f64,
) -> Result<u64> {
    check_parameters(num_hashes, false_positive_rate)?;
    let ratio = calc_signature_size_ratio(num_hashes, false_positive_rate);
    let size = (num_elements as f64 * ratio).ceil();
    if !size.is_finite() || size > u64::MAX as f64 {
        return Err(CobsError::config(format!(
            "signature size overflow for {} elements",
            num_elements
        )));
    }
    Ok((size as u64).max(1))
}

/// Validate sizing parameters.
pub fn check_parameters(num_hashes: u64, false_positive_rate: f64) -> Result<()> {
    if num_hashes == 0 {
        return Err(CobsError::config("num_hashes must be >= 1"));
    }
    if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
        return Err(CobsError::config(format!(
            "false positive rate must be in (0, 1), got {}",
            false_positive_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_single_hash() {
        // h=1, p=0.3: -1/ln(0.7) = 2.8037...
        let ratio = calc_signature_size_ratio(1, 0.3);
        assert!((ratio - 2.8037).abs() < 1e-3);
    }

    #[test]
    fn test_size_matches_ratio() {
        let ratio = calc_signature_size_ratio(3, 0.1);
        let size = calc_signature_size(1000, 3, 0.1).unwrap();
        assert_eq!(size, (1000.0 * ratio).ceil() as u64);
    }

    #[test]
    fn test_monotone_in_elements() {
        let mut prev = 0;
        for n in [1u64, 10, 100, 1000, 10_000, 100_000] {
            let size = calc_signature_size(n, 3, 0.1).unwrap();
            assert!(size >= prev);
            prev = size;
        }
    }

    #[test]
    fn test_clamped_to_one() {
        assert_eq!(calc_signature_size(0, 1, 0.3).unwrap(), 1);
    }

    #[test]
    fn test_lower_rate_needs_more_bits() {
        let loose = calc_signature_size(1000, 3, 0.3).unwrap();
        let tight = calc_signature_size(1000, 3, 0.001).unwrap();
        assert!(tight > loose);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(calc_signature_size(10, 0, 0.3).is_err());
        assert!(calc_signature_size(10, 1, 0.0).is_err());
        assert!(calc_signature_size(10, 1, 1.0).is_err());
        assert!(calc_signature_size(10, 1, -0.5).is_err());
    }
}
