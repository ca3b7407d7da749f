// Licensed under the Apache-2.0 license

use flash_hal::{FlashError, GeometryError};
use thiserror::Error;

/// Why a validation run ended in the failed state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("flash: {0}")]
    Flash(#[from] FlashError),
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("read back {actual:#04x} at {address:#010x}+{offset:#x}, expected {expected:#04x}")]
    VerificationMismatch {
        address: u32,
        offset: u32,
        expected: u8,
        actual: u8,
    },
    #[error("busy loop took {measured_us} us after flash work, {baseline_us} us before (allowed drift {allowed_us} us)")]
    DriftExceeded {
        baseline_us: u64,
        measured_us: u64,
        allowed_us: u64,
    },
    #[error("patterns {first:#04x} and {second:#04x} cannot show programming on a part erased to {erase_value:#04x}")]
    IndistinctPatterns {
        first: u8,
        second: u8,
        erase_value: u8,
    },
    #[error("drift check ran without a baseline sample")]
    MissingBaseline,
}
