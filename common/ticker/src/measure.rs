// Licensed under the Apache-2.0 license

//! Elapsed time of a fixed amount of CPU work.
//!
//! If the CPU clock or instruction-cache configuration changes between two
//! measurements of the same number of loop iterations, the elapsed time
//! changes with it.

use crate::{ticks_to_us, Ticker, TickerInfo};
use log::warn;

/// Uninterruptible work of a fixed length.
pub trait BusyLoop {
    fn spin(&self, cycles: u32);
}

/// Busy loop the optimizer cannot remove or reshape. How many CPU cycles one
/// iteration costs is target specific and not calibrated here.
#[derive(Clone, Copy, Debug, Default)]
pub struct CalibratedLoop;

impl BusyLoop for CalibratedLoop {
    fn spin(&self, cycles: u32) {
        delay_loop(cycles);
    }
}

#[cfg(target_arch = "riscv32")]
#[inline(never)]
pub fn delay_loop(cycles: u32) {
    if cycles == 0 {
        return;
    }
    unsafe {
        core::arch::asm!(
            "1:",
            "addi {n}, {n}, -1",
            "bnez {n}, 1b",
            n = inout(reg) cycles => _,
            options(nomem, nostack),
        );
    }
}

#[cfg(not(target_arch = "riscv32"))]
#[inline(never)]
pub fn delay_loop(cycles: u32) {
    for i in 0..cycles {
        core::hint::black_box(i);
    }
}

/// Two raw counter readings taken around a busy loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSample {
    pub start: u32,
    pub end: u32,
    pub info: TickerInfo,
}

impl TimerSample {
    pub fn elapsed_ticks(&self) -> u32 {
        self.end.wrapping_sub(self.start) & self.info.max_count()
    }

    /// Elapsed microseconds, each reading converted on its own.
    ///
    /// A wrap between the readings means the caller skipped overflow
    /// protection; the masked tick delta is used instead so the result stays
    /// meaningful for a single wrap.
    pub fn elapsed_us(&self) -> u64 {
        let hz = self.info.frequency_hz;
        if self.end >= self.start {
            ticks_to_us(self.end, hz) - ticks_to_us(self.start, hz)
        } else {
            warn!(
                "ticker wrapped during measurement ({:#x} -> {:#x})",
                self.start, self.end
            );
            ticks_to_us(self.elapsed_ticks(), hz)
        }
    }
}

/// Times a busy loop against a ticker with interrupts held off.
pub struct CycleTimer<'a> {
    ticker: &'a dyn Ticker,
    busy: &'a dyn BusyLoop,
}

impl<'a> CycleTimer<'a> {
    pub fn new(ticker: &'a dyn Ticker, busy: &'a dyn BusyLoop) -> Self {
        Self { ticker, busy }
    }

    pub fn ticker(&self) -> &'a dyn Ticker {
        self.ticker
    }

    /// Reads the counter, runs `cycles` loop iterations and reads the counter
    /// again, all inside one critical section.
    pub fn sample(&self, cycles: u32) -> TimerSample {
        let info = self.ticker.info();
        let max_count = info.max_count();
        critical_section::with(|_| {
            let start = self.ticker.read() & max_count;
            self.busy.spin(cycles);
            let end = self.ticker.read() & max_count;
            TimerSample { start, end, info }
        })
    }

    /// Microseconds taken by `cycles` iterations of the busy loop.
    pub fn measure(&self, cycles: u32) -> u64 {
        self.sample(cycles).elapsed_us()
    }
}
