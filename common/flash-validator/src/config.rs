// Licensed under the Apache-2.0 license

use serde::Deserialize;

/// Busy-loop iterations timed before and after the flash work.
pub const TEST_CYCLES: u32 = 10_000_000;

/// The second timing sample may differ from the first by `1 / 200` of it (0.5%).
pub const ALLOWED_DRIFT_DIVISOR: u32 = 1_000_000 / 5000;

/// Ticks that must be measurable without counter wraparound.
pub const OVERFLOW_WINDOW_TICKS: u32 = 35_000;

pub const FIRST_PATTERN: u8 = 0xCE;
pub const SECOND_PATTERN: u8 = 0xAC;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    pub cycles: u32,
    pub window_ticks: u32,
    pub drift_divisor: u32,
    /// Sectors starting below this address hold the running program image
    /// and are never erased.
    pub reserved_end: u32,
    pub first_pattern: u8,
    pub second_pattern: u8,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            cycles: TEST_CYCLES,
            window_ticks: OVERFLOW_WINDOW_TICKS,
            drift_divisor: ALLOWED_DRIFT_DIVISOR,
            reserved_end: 0,
            first_pattern: FIRST_PATTERN,
            second_pattern: SECOND_PATTERN,
        }
    }
}
