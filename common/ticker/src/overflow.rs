// Licensed under the Apache-2.0 license

use crate::Ticker;
use log::debug;

/// How [`overflow_protect`] secured its window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protection {
    /// The counter was far enough from its maximum already.
    Headroom,
    /// The counter was close to its maximum; returned after it wrapped.
    Wrapped,
    /// The counter has no bits and always reads zero.
    Stopped,
}

/// Makes sure at least `window` ticks can elapse before the counter wraps.
///
/// If the distance from the current reading to the counter maximum is not
/// larger than `window`, busy-waits until a reading is lower than the one
/// taken on entry, i.e. until the counter has wrapped. The maximum is derived
/// from the bit width the ticker reports.
pub fn overflow_protect<T: Ticker + ?Sized>(ticker: &T, window: u32) -> Protection {
    let max_count = ticker.info().max_count();
    if max_count == 0 {
        return Protection::Stopped;
    }
    let now = ticker.read() & max_count;
    if max_count - now > window {
        return Protection::Headroom;
    }

    debug!(
        "ticker at {:#x} of {:#x}, waiting for wraparound",
        now, max_count
    );
    while ticker.read() & max_count >= now {
        core::hint::spin_loop();
    }
    Protection::Wrapped
}
