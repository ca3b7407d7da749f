/*++

Licensed under the Apache-2.0 license.

File Name:

    layout.rs

Abstract:

    File contains the geometry and timing description of an emulated flash part.

--*/

use flash_hal::{SectorMap, SectorRegion};
use serde::Deserialize;

/// `count` sectors of `size` bytes.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SectorRun {
    pub size: u32,
    pub count: u32,
}

/// Address window and sector layout of an emulated flash part. Sector runs
/// follow each other without gaps starting at `start`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FlashLayout {
    pub start: u32,
    pub page_size: u32,
    #[serde(default = "FlashLayout::default_erase_value")]
    pub erase_value: u8,
    pub sectors: Vec<SectorRun>,
}

impl FlashLayout {
    fn default_erase_value() -> u8 {
        0xFF
    }

    /// 1 MiB of 4 KiB sectors with 256 byte pages at 0x0800_0000.
    pub fn uniform() -> Self {
        Self {
            start: 0x0800_0000,
            page_size: 256,
            erase_value: 0xFF,
            sectors: vec![SectorRun {
                size: 0x1000,
                count: 256,
            }],
        }
    }

    /// 1 MiB bank with the STM32F4 split: four 16 KiB, one 64 KiB and seven
    /// 128 KiB sectors.
    pub fn stm32f4() -> Self {
        Self {
            start: 0x0800_0000,
            page_size: 256,
            erase_value: 0xFF,
            sectors: vec![
                SectorRun {
                    size: 0x4000,
                    count: 4,
                },
                SectorRun {
                    size: 0x1_0000,
                    count: 1,
                },
                SectorRun {
                    size: 0x2_0000,
                    count: 7,
                },
            ],
        }
    }

    pub fn regions(&self) -> Vec<SectorRegion> {
        let mut address = self.start as u64;
        self.sectors
            .iter()
            .map(|run| {
                let region = SectorRegion::new(address as u32, run.size, run.count);
                address += region.size();
                region
            })
            .collect()
    }

    /// Total bytes covered by the sector runs.
    pub fn capacity(&self) -> u64 {
        self.sectors
            .iter()
            .map(|run| run.size as u64 * run.count as u64)
            .sum()
    }

    pub fn validate(&self) -> Result<(), flash_hal::GeometryError> {
        SectorMap::new(&self.regions()).validate(self.page_size)
    }
}

/// Emulator clock ticks an operation keeps the controller busy for.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FlashTiming {
    pub program_busy_ticks: u32,
    pub erase_busy_ticks: u32,
}

impl Default for FlashTiming {
    fn default() -> Self {
        Self {
            program_busy_ticks: 4,
            erase_busy_ticks: 64,
        }
    }
}
