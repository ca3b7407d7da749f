// Licensed under the Apache-2.0 license

//! Contract every flash controller abstraction must satisfy, plus the
//! host-side enforcement and geometry checks built on top of it.

#![cfg_attr(target_arch = "riscv32", no_std)]

mod geometry;
mod hil;
mod lock;
mod session;
mod walk;

#[cfg(test)]
mod test_device;

pub use geometry::{align_down, GeometryError, SectorMap, SectorRegion};
pub use hil::{FlashDevice, FlashError, INVALID_SIZE};
pub use lock::SessionLock;
pub use session::FlashSession;
pub use walk::{check_geometry, GeometryReport, Sector, SectorWalk};
