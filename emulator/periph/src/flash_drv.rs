/*++

Licensed under the Apache-2.0 license.

File Name:

    flash_drv.rs

Abstract:

    File contains the register-level driver for the dummy flash controller.

--*/

use crate::flash_ctrl::{CtrlRegwen, FlControl, OpStatus};
use crate::{DummyFlashCtrl, FlashOperation};
use flash_hal::{FlashDevice, FlashError, SessionLock};
use log::error;
use tock_registers::LocalRegisterCopy;

/// Number of controller ticks an erase or program may take before the driver
/// gives up on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTimeout(pub u32);

impl Default for PollTimeout {
    fn default() -> Self {
        PollTimeout(10_000)
    }
}

pub struct EmulatedFlashDriver {
    ctrl: DummyFlashCtrl,
    lock: SessionLock,
    timeout: PollTimeout,
}

impl EmulatedFlashDriver {
    pub fn new(ctrl: DummyFlashCtrl, timeout: PollTimeout) -> Self {
        Self {
            ctrl,
            lock: SessionLock::new(),
            timeout,
        }
    }

    pub fn ctrl(&self) -> &DummyFlashCtrl {
        &self.ctrl
    }

    fn start_operation(&self, op: FlashOperation, address: u32) -> Result<(), FlashError> {
        // A previous operation that timed out may still hold the controller
        let regwen: LocalRegisterCopy<u32, CtrlRegwen::Register> =
            LocalRegisterCopy::new(self.ctrl.read_ctrl_regwen());
        if !regwen.is_set(CtrlRegwen::En) {
            error!("flash controller still busy, cannot start {:?}", op);
            return Err(FlashError::HardwareTimeout);
        }

        self.ctrl.write_op_status(0);
        self.ctrl.write_fl_addr(address);
        self.ctrl
            .write_control((FlControl::Op.val(op as u32) + FlControl::Start::SET).value);

        // Polling for the operation to complete. This is a blocking call.
        self.poll_for_completion(address)
    }

    fn poll_for_completion(&self, address: u32) -> Result<(), FlashError> {
        for _ in 0..self.timeout.0 {
            self.ctrl.poll();
            let status: LocalRegisterCopy<u32, OpStatus::Register> =
                LocalRegisterCopy::new(self.ctrl.read_op_status());
            if status.is_set(OpStatus::Done) {
                self.ctrl.write_op_status(0);
                return Ok(());
            }
            let err = status.read(OpStatus::Err);
            if err != 0 {
                self.ctrl.write_op_status(0);
                error!("flash operation at {:#010x} failed with status {}", address, err);
                return Err(FlashError::DeviceFault);
            }
        }
        error!(
            "flash operation at {:#010x} not done after {} ticks",
            address, self.timeout.0
        );
        Err(FlashError::HardwareTimeout)
    }
}

impl FlashDevice for EmulatedFlashDriver {
    fn init(&self) -> Result<(), FlashError> {
        if self.ctrl.init_failed() {
            return Err(FlashError::InitFailure);
        }
        self.lock.acquire()
    }

    fn free(&self) -> Result<(), FlashError> {
        self.lock.release()
    }

    fn page_size(&self) -> u32 {
        self.ctrl.layout().page_size
    }

    fn start_address(&self) -> u32 {
        self.ctrl.layout().start
    }

    fn size(&self) -> u32 {
        self.ctrl.sector_map().size()
    }

    fn sector_size(&self, address: u32) -> u32 {
        self.ctrl.sector_map().sector_size(address)
    }

    fn erase_value(&self) -> u8 {
        self.ctrl.layout().erase_value
    }

    fn erase_sector(&self, address: u32) -> Result<(), FlashError> {
        self.start_operation(FlashOperation::EraseSector, address)
    }

    fn program_page(&self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        let page_size = self.page_size() as usize;
        for (i, page) in data.chunks(page_size).enumerate() {
            self.ctrl.write_page_buffer(page);
            self.start_operation(
                FlashOperation::ProgramPage,
                address + (i * page_size) as u32,
            )?;
        }
        Ok(())
    }

    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.ctrl
            .direct_read(address, buf)
            .map_err(|_| FlashError::OutOfRange)
    }
}
