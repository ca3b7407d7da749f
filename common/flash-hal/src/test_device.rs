// Licensed under the Apache-2.0 license

//! RAM backed device used by the unit tests of this crate.

use crate::{FlashDevice, FlashError, SectorMap, SectorRegion, SessionLock};
use std::cell::{Cell, RefCell};

pub struct RamFlash {
    regions: Vec<SectorRegion>,
    page_size: u32,
    data: RefCell<Vec<u8>>,
    lock: SessionLock,
    pub erases: Cell<u32>,
    pub programs: Cell<u32>,
    pub sector_size_override: Option<fn(u32) -> u32>,
}

impl RamFlash {
    pub fn new(regions: &[SectorRegion], page_size: u32) -> Self {
        let size = SectorMap::new(regions).size() as usize;
        Self {
            regions: regions.to_vec(),
            page_size,
            data: RefCell::new(vec![0xFF; size]),
            lock: SessionLock::new(),
            erases: Cell::new(0),
            programs: Cell::new(0),
            sector_size_override: None,
        }
    }

    pub fn uniform() -> Self {
        Self::new(&[SectorRegion::new(0x0800_0000, 4096, 256)], 256)
    }

    fn map(&self) -> SectorMap<'_> {
        SectorMap::new(&self.regions)
    }

    fn offset(&self, address: u32) -> usize {
        (address - self.start_address()) as usize
    }
}

impl FlashDevice for RamFlash {
    fn init(&self) -> Result<(), FlashError> {
        self.lock.acquire()
    }

    fn free(&self) -> Result<(), FlashError> {
        self.lock.release()
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn start_address(&self) -> u32 {
        self.map().start()
    }

    fn size(&self) -> u32 {
        self.map().size()
    }

    fn sector_size(&self, address: u32) -> u32 {
        match self.sector_size_override {
            Some(f) => f(address),
            None => self.map().sector_size(address),
        }
    }

    fn erase_sector(&self, address: u32) -> Result<(), FlashError> {
        self.erases.set(self.erases.get() + 1);
        let offset = self.offset(address);
        let len = self.sector_size(address) as usize;
        self.data.borrow_mut()[offset..offset + len].fill(0xFF);
        Ok(())
    }

    fn program_page(&self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.programs.set(self.programs.get() + 1);
        let offset = self.offset(address);
        let mut mem = self.data.borrow_mut();
        for (dst, src) in mem[offset..offset + data.len()].iter_mut().zip(data) {
            *dst &= *src;
        }
        Ok(())
    }

    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let offset = self.offset(address);
        buf.copy_from_slice(&self.data.borrow()[offset..offset + buf.len()]);
        Ok(())
    }
}
