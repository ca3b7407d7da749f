// Licensed under the Apache-2.0 license

/// Static description of a free-running up-counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickerInfo {
    /// Counting frequency in Hz.
    pub frequency_hz: u32,
    /// Width of the counter in bits, 1 to 32.
    pub bits: u8,
}

impl TickerInfo {
    pub const fn new(frequency_hz: u32, bits: u8) -> Self {
        Self { frequency_hz, bits }
    }

    /// Largest value the counter reaches before wrapping to zero.
    pub const fn max_count(&self) -> u32 {
        match self.bits {
            0..=31 => (1u32 << self.bits) - 1,
            _ => u32::MAX,
        }
    }
}

/// A hardware tick counter. Readings are raw counts in `0..=info().max_count()`.
pub trait Ticker {
    fn read(&self) -> u32;
    fn info(&self) -> TickerInfo;
}

/// Converts a raw tick count to microseconds without intermediate overflow.
pub fn ticks_to_us(ticks: u32, frequency_hz: u32) -> u64 {
    (ticks as u64 * 1_000_000)
        .checked_div(frequency_hz as u64)
        .unwrap_or(0)
}
