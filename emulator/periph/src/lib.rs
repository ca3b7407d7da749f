/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated flash and timer peripherals.

--*/

mod flash_ctrl;
mod flash_drv;
mod layout;
mod ticker;

pub use flash_ctrl::{DummyFlashCtrl, FlashCtrlError, FlashOpError, FlashOperation};
pub use flash_drv::{EmulatedFlashDriver, PollTimeout};
pub use layout::{FlashLayout, FlashTiming, SectorRun};
pub use ticker::{CpuClock, EmulatedTicker, HostTicker, SpinLoop};
