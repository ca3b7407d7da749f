// Licensed under the Apache-2.0 license

//! Generic interface for flash controller access.

use core::result::Result;
use thiserror::Error;

/// Returned by [`FlashDevice::sector_size`] for addresses outside the device window.
pub const INVALID_SIZE: u32 = 0xFFFF_FFFF;

/// Interface a register-level flash driver implements. All calls are
/// synchronous and block until the controller reports completion or failure.
///
/// Drivers are shared by reference while a session is open, so every method
/// takes `&self` and implementations keep their mutable state behind cells,
/// the way register blocks do.
pub trait FlashDevice {
    /// Acquire the controller. Fails with [`FlashError::AlreadyOpen`] while a
    /// previous session has not been freed.
    fn init(&self) -> Result<(), FlashError>;

    /// Release the controller. The medium keeps its contents.
    fn free(&self) -> Result<(), FlashError>;

    /// Minimum program granularity in bytes. Constant and non-zero.
    fn page_size(&self) -> u32;

    /// First address of the device window.
    fn start_address(&self) -> u32;

    /// Size of the device window in bytes.
    fn size(&self) -> u32;

    /// Erase granularity of the sector covering `address`, or
    /// [`INVALID_SIZE`] if `address` is outside the device window.
    ///
    /// Must not scan the device: O(1) or O(log n) in the number of sectors.
    fn sector_size(&self, address: u32) -> u32;

    /// Value every byte reads back as after an erase.
    fn erase_value(&self) -> u8 {
        0xFF
    }

    /// Erase the sector starting at `address`.
    fn erase_sector(&self, address: u32) -> Result<(), FlashError>;

    /// Program `data` starting at `address`. `data.len()` is a multiple of the page size.
    fn program_page(&self, address: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Read raw bytes starting at `address`, filling the provided buffer.
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError>;
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[repr(u32)]
pub enum FlashError {
    // Reserved value, for when "no error" / "success" should be
    // encoded in the same numeric representation as FlashError
    //
    // Ok(()) = 0,
    /// Controller could not be brought up
    #[error("flash controller initialization failed")]
    InitFailure = 1,
    /// Controller could not be released
    #[error("flash controller release failed")]
    FreeFailure = 2,
    /// A session is already open on this device
    #[error("flash device already has an open session")]
    AlreadyOpen = 3,
    /// Address or length violates page or sector alignment
    #[error("address or length is not aligned to the erase or program unit")]
    Alignment = 4,
    /// Access leaves the device window
    #[error("access is outside the flash device window")]
    OutOfRange = 5,
    /// Controller did not report completion within the poll timeout
    #[error("flash controller did not complete the operation in time")]
    HardwareTimeout = 6,
    /// Controller reported an error status for the operation
    #[error("flash controller reported an operation error")]
    DeviceFault = 7,
}

impl From<FlashError> for u32 {
    fn from(err: FlashError) -> u32 {
        err as u32
    }
}

impl TryFrom<u32> for FlashError {
    type Error = ();

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FlashError::InitFailure),
            2 => Ok(FlashError::FreeFailure),
            3 => Ok(FlashError::AlreadyOpen),
            4 => Ok(FlashError::Alignment),
            5 => Ok(FlashError::OutOfRange),
            6 => Ok(FlashError::HardwareTimeout),
            7 => Ok(FlashError::DeviceFault),
            _ => Err(()),
        }
    }
}
