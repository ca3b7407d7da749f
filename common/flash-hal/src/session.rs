// Licensed under the Apache-2.0 license

//! Exclusive session over a [`FlashDevice`].
//!
//! The session owns the init/free pairing and rejects out-of-window or
//! misaligned requests before the driver is asked to touch the medium, so a
//! bad argument can never turn into an irreversible erase or program.

use crate::{FlashDevice, FlashError, INVALID_SIZE};
use log::{debug, warn};

pub struct FlashSession<'a> {
    device: &'a dyn FlashDevice,
    open: bool,
}

impl<'a> FlashSession<'a> {
    /// Initialize the device and hand out the session.
    pub fn open(device: &'a dyn FlashDevice) -> Result<Self, FlashError> {
        device.init()?;
        debug!(
            "flash session opened: start {:#010x}, size {:#x}, page {:#x}",
            device.start_address(),
            device.size(),
            device.page_size()
        );
        Ok(Self { device, open: true })
    }

    /// Release the device. Consumes the session so nothing can use it afterwards.
    pub fn free(mut self) -> Result<(), FlashError> {
        self.open = false;
        self.device.free()?;
        debug!("flash session freed");
        Ok(())
    }

    pub fn device(&self) -> &'a dyn FlashDevice {
        self.device
    }

    pub fn page_size(&self) -> u32 {
        self.device.page_size()
    }

    pub fn start_address(&self) -> u32 {
        self.device.start_address()
    }

    pub fn size(&self) -> u32 {
        self.device.size()
    }

    /// Exclusive end of the device window.
    pub fn end_address(&self) -> u64 {
        self.start_address() as u64 + self.size() as u64
    }

    pub fn sector_size(&self, address: u32) -> u32 {
        self.device.sector_size(address)
    }

    pub fn erase_value(&self) -> u8 {
        self.device.erase_value()
    }

    fn check_range(&self, address: u32, len: usize) -> Result<(), FlashError> {
        let address = address as u64;
        if address < self.start_address() as u64 || address + len as u64 > self.end_address() {
            return Err(FlashError::OutOfRange);
        }
        Ok(())
    }

    pub fn erase_sector(&self, address: u32) -> Result<(), FlashError> {
        let sector_size = self.sector_size(address);
        if sector_size == INVALID_SIZE {
            return Err(FlashError::OutOfRange);
        }
        if sector_size == 0 || address % sector_size != 0 {
            return Err(FlashError::Alignment);
        }
        self.device.erase_sector(address)
    }

    pub fn program_page(&self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.check_range(address, data.len())?;
        let page_size = self.page_size();
        if data.is_empty() || data.len() % page_size as usize != 0 || address % page_size != 0 {
            return Err(FlashError::Alignment);
        }
        self.device.program_page(address, data)
    }

    pub fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check_range(address, buf.len())?;
        self.device.read(address, buf)
    }
}

impl Drop for FlashSession<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.device.free() {
                warn!("flash session dropped without free and release failed: {}", err);
            }
        }
    }
}
