//! Tests for the pure value conversions

mod common;

use common::*;

#[test]
fn test_sample_rate_roundtrip() {
    for &rate in SAMPLE_RATES_SORTED.iter() {
        let index = sample_rate_index(rate).expect("listed rate must encode");
        assert_eq!(
            sample_rate_hz(index),
            Some(rate),
            "config table must decode index {index} back to {rate} Hz"
        );
    }
}

#[test]
fn test_rate_tables_hold_the_same_rates() {
    let mut config: Vec<u64> = SAMPLE_RATES_CONFIG
        .iter()
        .copied()
        .filter(|&rate| rate != 0)
        .collect();
    config.sort_unstable();
    assert_eq!(config.as_slice(), &SAMPLE_RATES_SORTED);
}

#[test]
fn test_unlisted_sample_rate_rejected() {
    assert!(matches!(
        sample_rate_index(3),
        Err(H4032LError::InvalidSampleRate(3))
    ));
    assert!(matches!(
        sample_rate_index(0),
        Err(H4032LError::InvalidSampleRate(0))
    ));
    // The holes in the config table must not match a rate of 0.
    assert!(sample_rate_index(123_456).is_err());
}

#[test]
fn test_sample_size_rounding() {
    assert_eq!(round_sample_size(2048).unwrap(), 2048);
    assert_eq!(round_sample_size(2049).unwrap(), 2560);
    // 2047 rounds up to the minimum, which is in range.
    assert_eq!(round_sample_size(2047).unwrap(), 2048);
    assert_eq!(round_sample_size(64 * 1024 * 1024).unwrap(), 64 * 1024 * 1024);
    assert!(matches!(
        round_sample_size(64 * 1024 * 1024 + 1),
        Err(H4032LError::InvalidSampleSize(_))
    ));
    assert!(round_sample_size(0).is_err());
    assert!(round_sample_size(512).is_err());
}

#[test]
fn test_huge_sample_size_rejected() {
    // Depths whose round-up would overflow must report the range
    // error, not wrap or panic.
    assert!(matches!(
        round_sample_size(u64::MAX),
        Err(H4032LError::InvalidSampleSize(u64::MAX))
    ));
    assert!(round_sample_size(u64::MAX - 510).is_err());
}

#[test]
fn test_capture_ratio_bounds() {
    assert_eq!(validate_capture_ratio(0).unwrap(), 0);
    assert_eq!(validate_capture_ratio(100).unwrap(), 100);
    assert!(matches!(
        validate_capture_ratio(101),
        Err(H4032LError::InvalidCaptureRatio(101))
    ));
}

#[test]
fn test_pre_trigger_size() {
    assert_eq!(pre_trigger_size(16384, 5), 819);
    assert_eq!(pre_trigger_size(2048, 0), 0);
    assert_eq!(pre_trigger_size(2048, 100), 2048);
    assert_eq!(pre_trigger_size(2048, 50), 1024);
}

#[test]
fn test_voltage_to_pwm() {
    // vref = 0 maps to the midpoint value.
    assert_eq!(voltage_to_pwm(1.8), 1365);
    // Clamped at vref = 10.0 and capped at the 12-bit ceiling.
    assert_eq!(voltage_to_pwm(-8.2), 4095);
    // Clamped at vref = -5.0.
    assert_eq!(voltage_to_pwm(6.8), 0);
    // The default 2.5 V threshold programmed at attach time.
    assert_eq!(voltage_to_pwm(2.5), 1174);
}

#[test]
fn test_bitmask_compaction() {
    // Channel 0 kept as low bit, channel 2 as the next bit.
    assert_eq!(compact_bitmask(0b0101, 0b0001), 0b01);
    assert_eq!(compact_bitmask(0b0101, 0b0100), 0b10);
    assert_eq!(compact_bitmask(0, 0), 0);
    // Unmasked value bits are dropped.
    assert_eq!(compact_bitmask(0b0010, 0b1101), 0);
    // A full mask passes the value through unchanged.
    assert_eq!(compact_bitmask(u32::MAX, 0xDEAD_BEEF), 0xDEAD_BEEF);
    // Sparse high channels pack down to the low bits.
    assert_eq!(compact_bitmask(0x8000_0001, 0x8000_0000), 0b10);
}
