// Licensed under the Apache-2.0 license

//! Full-device geometry walk.
//!
//! Starting at the device start address, repeatedly query the sector size at
//! the current offset and advance by it. A well formed device is tiled
//! exactly: the walk lands on `start + size` with no gap or overlap, every
//! sector is aligned to its own size and reports the same size at its first
//! and last byte.

use crate::{FlashDevice, GeometryError, INVALID_SIZE};
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sector {
    pub start: u32,
    pub size: u32,
}

impl Sector {
    /// Address of the sector's final byte, `None` if the sector runs past
    /// the top of the 32-bit address space.
    pub fn last_byte(&self) -> Option<u32> {
        self.start.checked_add(self.size.checked_sub(1)?)
    }
}

/// Iterator over the sectors of a device. Stops with an error instead of
/// looping when the device reports a zero or invalid sector size.
pub struct SectorWalk<'a> {
    device: &'a dyn FlashDevice,
    offset: u64,
    end: u64,
    done: bool,
}

impl<'a> SectorWalk<'a> {
    pub fn new(device: &'a dyn FlashDevice) -> Self {
        let start = device.start_address() as u64;
        Self {
            device,
            offset: start,
            end: start + device.size() as u64,
            done: false,
        }
    }
}

impl Iterator for SectorWalk<'_> {
    type Item = Result<Sector, GeometryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.offset >= self.end {
            self.done = true;
            return (self.offset > self.end).then_some(Err(GeometryError::Overshoot {
                end: self.offset,
                expected: self.end,
            }));
        }
        let address = self.offset as u32;
        let size = self.device.sector_size(address);
        if size == 0 || size == INVALID_SIZE {
            self.done = true;
            return Some(Err(GeometryError::InvalidSectorSize { address, size }));
        }
        self.offset += size as u64;
        Some(Ok(Sector {
            start: address,
            size,
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryReport {
    pub start: u32,
    pub size: u32,
    pub page_size: u32,
    pub sectors: u32,
    pub min_sector_size: u32,
    pub max_sector_size: u32,
}

impl GeometryReport {
    pub fn is_uniform(&self) -> bool {
        self.min_sector_size == self.max_sector_size
    }
}

/// Walks the whole device and checks every geometry invariant, including that
/// the addresses just outside the window report [`INVALID_SIZE`].
pub fn check_geometry(device: &dyn FlashDevice) -> Result<GeometryReport, GeometryError> {
    let page_size = device.page_size();
    if page_size == 0 {
        return Err(GeometryError::InvalidPageSize(page_size));
    }
    if device.size() == 0 {
        return Err(GeometryError::EmptyLayout);
    }

    let mut report = GeometryReport {
        start: device.start_address(),
        size: device.size(),
        page_size,
        sectors: 0,
        min_sector_size: u32::MAX,
        max_sector_size: 0,
    };

    for sector in SectorWalk::new(device) {
        let Sector { start, size } = sector?;
        trace!("sector {:#010x} size {:#x}", start, size);
        if size % page_size != 0 {
            return Err(GeometryError::NotPageMultiple {
                address: start,
                size,
                page_size,
            });
        }
        if start % size != 0 {
            return Err(GeometryError::Misaligned {
                address: start,
                size,
            });
        }
        let last_byte = Sector { start, size }
            .last_byte()
            .ok_or(GeometryError::Overshoot {
                end: start as u64 + size as u64,
                expected: report.start as u64 + report.size as u64,
            })?;
        let last = device.sector_size(last_byte);
        if last != size {
            return Err(GeometryError::InconsistentBoundary {
                address: start,
                first: size,
                last,
            });
        }
        report.sectors += 1;
        report.min_sector_size = report.min_sector_size.min(size);
        report.max_sector_size = report.max_sector_size.max(size);
    }

    if let Some(before) = report.start.checked_sub(1) {
        check_outside(device, before)?;
    }
    let end = report.start as u64 + report.size as u64;
    if let Ok(after) = u32::try_from(end) {
        check_outside(device, after)?;
    }

    Ok(report)
}

fn check_outside(device: &dyn FlashDevice, address: u32) -> Result<(), GeometryError> {
    match device.sector_size(address) {
        INVALID_SIZE => Ok(()),
        size => Err(GeometryError::SentinelMissing { address, size }),
    }
}
