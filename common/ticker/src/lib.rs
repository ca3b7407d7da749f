// Licensed under the Apache-2.0 license

//! Free-running tick counter access, wraparound protection and the
//! cycle-accurate busy-loop measurement used to detect clock drift.

#![cfg_attr(target_arch = "riscv32", no_std)]

mod measure;
mod overflow;
mod ticker;

pub use measure::{delay_loop, BusyLoop, CalibratedLoop, CycleTimer, TimerSample};
pub use overflow::{overflow_protect, Protection};
pub use ticker::{ticks_to_us, Ticker, TickerInfo};
