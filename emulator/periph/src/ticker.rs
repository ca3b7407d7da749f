/*++

Licensed under the Apache-2.0 license.

File Name:

    ticker.rs

Abstract:

    File contains the emulated free-running timer, the emulated CPU clock and
    the busy loop that burns emulated CPU cycles.

--*/

use mcu_ticker::{BusyLoop, Ticker, TickerInfo};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Free-running counter of configurable width. Moves by `read_step` ticks
/// every time it is read and by explicit [`EmulatedTicker::advance`] calls.
pub struct EmulatedTicker {
    info: TickerInfo,
    counter: Cell<u32>,
    read_step: u32,
}

impl EmulatedTicker {
    pub fn new(frequency_hz: u32, bits: u8) -> Self {
        Self {
            info: TickerInfo::new(frequency_hz, bits),
            counter: Cell::new(0),
            read_step: 1,
        }
    }

    pub fn with_start(self, start: u32) -> Self {
        self.counter.set(start & self.info.max_count());
        self
    }

    pub fn with_read_step(mut self, read_step: u32) -> Self {
        self.read_step = read_step;
        self
    }

    pub fn now(&self) -> u32 {
        self.counter.get()
    }

    pub fn advance(&self, ticks: u64) {
        let modulus = self.info.max_count() as u64 + 1;
        let next = (self.counter.get() as u64 + ticks % modulus) % modulus;
        self.counter.set(next as u32);
    }
}

impl Ticker for EmulatedTicker {
    fn read(&self) -> u32 {
        let value = self.counter.get();
        self.advance(self.read_step as u64);
        value
    }

    fn info(&self) -> TickerInfo {
        self.info
    }
}

/// Ticker backed by the host monotonic clock, scaled to `frequency_hz` and
/// wrapped at the configured width.
pub struct HostTicker {
    info: TickerInfo,
    origin: Instant,
}

impl HostTicker {
    pub fn new(frequency_hz: u32, bits: u8) -> Self {
        Self {
            info: TickerInfo::new(frequency_hz, bits),
            origin: Instant::now(),
        }
    }
}

impl Ticker for HostTicker {
    fn read(&self) -> u32 {
        let nanos = self.origin.elapsed().as_nanos();
        let ticks = nanos * self.info.frequency_hz as u128 / 1_000_000_000;
        (ticks & self.info.max_count() as u128) as u32
    }

    fn info(&self) -> TickerInfo {
        self.info
    }
}

/// Frequency the emulated CPU currently runs at.
#[derive(Debug)]
pub struct CpuClock {
    hz: Cell<u32>,
}

impl CpuClock {
    pub fn new(hz: u32) -> Self {
        Self { hz: Cell::new(hz) }
    }

    pub fn hz(&self) -> u32 {
        self.hz.get()
    }

    pub fn set_hz(&self, hz: u32) {
        self.hz.set(hz);
    }
}

/// Busy loop on the emulated CPU: `cycles` iterations take
/// `cycles / cpu_hz` seconds of ticker time. Sub-tick remainders carry over
/// to the next call.
pub struct SpinLoop {
    ticker: Rc<EmulatedTicker>,
    clock: Rc<CpuClock>,
    remainder: Cell<u64>,
}

impl SpinLoop {
    pub fn new(ticker: Rc<EmulatedTicker>, clock: Rc<CpuClock>) -> Self {
        Self {
            ticker,
            clock,
            remainder: Cell::new(0),
        }
    }
}

impl BusyLoop for SpinLoop {
    fn spin(&self, cycles: u32) {
        let cpu_hz = self.clock.hz().max(1) as u64;
        let scaled = cycles as u64 * self.ticker.info().frequency_hz as u64 + self.remainder.get();
        self.remainder.set(scaled % cpu_hz);
        self.ticker.advance(scaled / cpu_hz);
    }
}
