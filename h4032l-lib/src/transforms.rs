//! Pure conversions between user-facing values and their device encodings.

use crate::constants::{SAMPLE_SIZE_BLOCK, SAMPLE_SIZE_MAX, SAMPLE_SIZE_MIN};
use crate::error::H4032LError;

/// Sample rates in Hz, indexed by the device-side rate code carried in
/// the command packet. The three zero entries are holes in the
/// firmware table and never match a lookup.
pub const SAMPLE_RATES_CONFIG: [u64; 36] = [
    100_000_000,
    50_000_000,
    25_000_000,
    12_500_000,
    6_250_000,
    3_125_000,
    1_562_500,
    781_250,
    80_000_000,
    40_000_000,
    20_000_000,
    10_000_000,
    5_000_000,
    2_500_000,
    1_250_000,
    625_000,
    4_000_000,
    2_000_000,
    1_000_000,
    500_000,
    250_000,
    125_000,
    62_500,
    31_250,
    16_000,
    8_000,
    4_000,
    2_000,
    1_000,
    0,
    0,
    0,
    200_000_000,
    160_000_000,
    400_000_000,
    320_000_000,
];

/// The same rate set in ascending order, for presenting the supported
/// rates to a caller.
pub const SAMPLE_RATES_SORTED: [u64; 33] = [
    1_000,
    2_000,
    4_000,
    8_000,
    16_000,
    31_250,
    62_500,
    125_000,
    250_000,
    500_000,
    625_000,
    781_250,
    1_000_000,
    1_250_000,
    1_562_500,
    2_000_000,
    2_500_000,
    3_125_000,
    4_000_000,
    5_000_000,
    6_250_000,
    10_000_000,
    12_500_000,
    20_000_000,
    25_000_000,
    40_000_000,
    50_000_000,
    80_000_000,
    100_000_000,
    160_000_000,
    200_000_000,
    320_000_000,
    400_000_000,
];

/// Find the device-side rate code for an exact rate in Hz.
pub fn sample_rate_index(rate_hz: u64) -> Result<u8, H4032LError> {
    if rate_hz == 0 {
        return Err(H4032LError::InvalidSampleRate(rate_hz));
    }
    SAMPLE_RATES_CONFIG
        .iter()
        .position(|&rate| rate == rate_hz)
        .map(|index| index as u8)
        .ok_or(H4032LError::InvalidSampleRate(rate_hz))
}

/// Rate in Hz for a device-side rate code.
pub fn sample_rate_hz(index: u8) -> Option<u64> {
    SAMPLE_RATES_CONFIG.get(index as usize).copied()
}

/// Round a requested per-channel sample count up to the next multiple
/// of the 512-sample block and check the 2 Ki ... 64 Mi bounds.
pub fn round_sample_size(samples: u64) -> Result<u32, H4032LError> {
    let rounded = samples
        .checked_add(SAMPLE_SIZE_BLOCK - 1)
        .ok_or(H4032LError::InvalidSampleSize(samples))?
        & !(SAMPLE_SIZE_BLOCK - 1);
    if !(SAMPLE_SIZE_MIN..=SAMPLE_SIZE_MAX).contains(&rounded) {
        return Err(H4032LError::InvalidSampleSize(samples));
    }
    Ok(rounded as u32)
}

/// Check a capture ratio given as an integer percentage.
pub fn validate_capture_ratio(ratio: u64) -> Result<u64, H4032LError> {
    if ratio > 100 {
        return Err(H4032LError::InvalidCaptureRatio(ratio));
    }
    Ok(ratio)
}

/// Pre-trigger sample count for a sample depth and capture ratio.
/// Computed at acquisition start so later depth changes are honored.
pub fn pre_trigger_size(sample_size: u32, capture_ratio: u64) -> u32 {
    ((sample_size as u64 * capture_ratio) / 100) as u32
}

/// Convert a threshold voltage to the PWM value programming a channel
/// group's Vref. The firmware expects exactly this mapping:
///
/// ```text
/// Vref = 1.8 - ThresholdVoltage
/// if Vref > 10.0:  Vref = 10.0
/// if Vref < -5.0:  Vref = -5.0
/// pwm = ToInt((Vref + 5.0) / 15.0 * 4096.0)
/// if pwm > 4095:   pwm = 4095
/// ```
pub fn voltage_to_pwm(threshold_volts: f64) -> u16 {
    let mut vref = 1.8 - threshold_volts;
    if vref > 10.0 {
        vref = 10.0;
    } else if vref < -5.0 {
        vref = -5.0;
    }
    let pwm = ((vref + 5.0) * (4096.0 / 15.0)) as u32;
    pwm.min(4095) as u16
}

/// Pack the masked bits of `value` contiguously from bit 0 upward, in
/// ascending bit order, dropping unmasked bits. The device compares
/// against a dense value aligned to the count of masked channels, not
/// a sparse value aligned to channel index.
pub fn compact_bitmask(mut mask: u32, mut value: u32) -> u32 {
    let mut compacted = 0u32;
    let mut next_bit = 1u32;
    while mask != 0 {
        if mask & 1 != 0 {
            if value & 1 != 0 {
                compacted |= next_bit;
            }
            next_bit <<= 1;
        }
        mask >>= 1;
        value >>= 1;
    }
    compacted
}
