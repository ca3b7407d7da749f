// Licensed under the Apache-2.0 license

//! Sector layout descriptions and the errors raised when a layout breaks the
//! flash geometry invariants.

use crate::INVALID_SIZE;
use thiserror::Error;

/// `count` consecutive sectors of `sector_size` bytes starting at `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorRegion {
    pub start: u32,
    pub sector_size: u32,
    pub count: u32,
}

impl SectorRegion {
    pub const fn new(start: u32, sector_size: u32, count: u32) -> Self {
        Self {
            start,
            sector_size,
            count,
        }
    }

    pub const fn size(&self) -> u64 {
        self.sector_size as u64 * self.count as u64
    }

    /// Exclusive end address. Kept as `u64` so a region ending at the top of
    /// the 32-bit address space is representable.
    pub const fn end(&self) -> u64 {
        self.start as u64 + self.size()
    }

    fn contains(&self, address: u32) -> bool {
        address >= self.start && (address as u64) < self.end()
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("sector layout has no regions")]
    EmptyLayout,
    #[error("page size {0} is not usable")]
    InvalidPageSize(u32),
    #[error("sector size at {address:#010x} is {size:#x}")]
    InvalidSectorSize { address: u32, size: u32 },
    #[error("sector size {size:#x} at {address:#010x} is not a multiple of page size {page_size:#x}")]
    NotPageMultiple {
        address: u32,
        size: u32,
        page_size: u32,
    },
    #[error("sector at {address:#010x} is not aligned to its size {size:#x}")]
    Misaligned { address: u32, size: u32 },
    #[error("sector at {address:#010x} reports size {first:#x} at its start and {last:#x} at its last byte")]
    InconsistentBoundary { address: u32, first: u32, last: u32 },
    #[error("region expected at {expected:#x} starts at {found:#010x}")]
    Discontiguous { expected: u64, found: u32 },
    #[error("sector walk ended at {end:#x}, device ends at {expected:#x}")]
    Overshoot { end: u64, expected: u64 },
    #[error("layout ends at {0:#x}, beyond the 32-bit address space")]
    WindowOverflow(u64),
    #[error("layout spans {0:#x} bytes, more than a 32-bit size can report")]
    WindowTooLarge(u64),
    #[error("address {address:#010x} outside the device reports sector size {size:#x}")]
    SentinelMissing { address: u32, size: u32 },
}

/// Lookup structure over a list of contiguous [`SectorRegion`]s sorted by
/// address. Answers [`SectorMap::sector_size`] with a binary search, so the
/// cost depends on the number of regions and never on the device size.
#[derive(Clone, Copy, Debug)]
pub struct SectorMap<'a> {
    regions: &'a [SectorRegion],
}

impl<'a> SectorMap<'a> {
    pub const fn new(regions: &'a [SectorRegion]) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &'a [SectorRegion] {
        self.regions
    }

    pub fn start(&self) -> u32 {
        self.regions.first().map_or(0, |r| r.start)
    }

    pub fn end(&self) -> u64 {
        self.regions.last().map_or(0, |r| r.end())
    }

    pub fn size(&self) -> u32 {
        u32::try_from(self.end() - self.start() as u64).unwrap_or(u32::MAX)
    }

    pub fn sector_count(&self) -> u32 {
        self.regions.iter().map(|r| r.count).sum()
    }

    fn region_of(&self, address: u32) -> Option<&'a SectorRegion> {
        let idx = self.regions.partition_point(|r| r.start <= address);
        let region = self.regions.get(idx.checked_sub(1)?)?;
        region.contains(address).then_some(region)
    }

    pub fn sector_size(&self, address: u32) -> u32 {
        self.region_of(address)
            .map_or(INVALID_SIZE, |r| r.sector_size)
    }

    /// Start of the sector covering `address`.
    pub fn sector_start(&self, address: u32) -> Option<u32> {
        let region = self.region_of(address)?;
        Some(region.start + align_down(address - region.start, region.sector_size))
    }

    /// Checks the layout can back a flash device with the given page size.
    pub fn validate(&self, page_size: u32) -> Result<(), GeometryError> {
        if page_size == 0 {
            return Err(GeometryError::InvalidPageSize(page_size));
        }
        let first = self.regions.first().ok_or(GeometryError::EmptyLayout)?;
        let mut expected = first.start as u64;
        for region in self.regions {
            if region.start as u64 != expected {
                return Err(GeometryError::Discontiguous {
                    expected,
                    found: region.start,
                });
            }
            if region.sector_size == 0 || region.sector_size == INVALID_SIZE || region.count == 0
            {
                return Err(GeometryError::InvalidSectorSize {
                    address: region.start,
                    size: region.sector_size,
                });
            }
            if region.sector_size % page_size != 0 {
                return Err(GeometryError::NotPageMultiple {
                    address: region.start,
                    size: region.sector_size,
                    page_size,
                });
            }
            if region.start % region.sector_size != 0 {
                return Err(GeometryError::Misaligned {
                    address: region.start,
                    size: region.sector_size,
                });
            }
            expected = region.end();
        }
        if expected > u32::MAX as u64 + 1 {
            return Err(GeometryError::WindowOverflow(expected));
        }
        let span = expected - first.start as u64;
        if span > u32::MAX as u64 {
            return Err(GeometryError::WindowTooLarge(span));
        }
        Ok(())
    }
}

/// Rounds `address` down to a multiple of `size`. A zero size leaves the
/// address unchanged.
pub fn align_down(address: u32, size: u32) -> u32 {
    match size {
        0 => address,
        _ => address - address % size,
    }
}
