// Licensed under the Apache-2.0 license

//! Geometry and clock stability validation of a flash device.
//!
//! The validator walks the device geometry, erases and re-programs the top of
//! the device, and times a fixed busy loop before and after the flash work to
//! catch drivers that change CPU clock or cache configuration as a side
//! effect.

mod config;
mod error;
mod report;
mod validator;

pub use config::{
    ValidatorConfig, ALLOWED_DRIFT_DIVISOR, FIRST_PATTERN, OVERFLOW_WINDOW_TICKS, SECOND_PATTERN,
    TEST_CYCLES,
};
pub use error::ValidationError;
pub use report::{SkipReason, Step, StepOutcome, ValidationReport};
pub use validator::{FlashValidator, ValidatorState};
