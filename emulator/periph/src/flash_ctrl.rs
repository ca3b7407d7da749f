/*++

Licensed under the Apache-2.0 license.

File Name:

    flash_ctrl.rs

Abstract:

    File contains dummy flash controller peripheral emulation.

--*/

use crate::ticker::CpuClock;
use crate::{FlashLayout, FlashTiming};
use flash_hal::{GeometryError, SectorMap, SectorRegion, INVALID_SIZE};
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

register_bitfields![u32,
    pub FlControl [
        Start OFFSET(0) NUMBITS(1) [],
        Op OFFSET(1) NUMBITS(2) [
            ProgramPage = 2,
            EraseSector = 3,
        ],
    ],
    pub OpStatus [
        Done OFFSET(0) NUMBITS(1) [],
        Err OFFSET(1) NUMBITS(3) [],
    ],
    pub CtrlRegwen [
        En OFFSET(0) NUMBITS(1) [],
    ],
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlashOperation {
    ProgramPage = 2,
    EraseSector = 3,
}

impl TryFrom<u32> for FlashOperation {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(FlashOperation::ProgramPage),
            3 => Ok(FlashOperation::EraseSector),
            _ => Err(()),
        }
    }
}

/// Values reported in the `OpStatus::Err` field. Zero means no error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashOpError {
    WriteError = 1,
    EraseError = 2,
    InvalidOp = 3,
    StorageError = 4,
}

#[derive(Debug, Error)]
pub enum FlashCtrlError {
    #[error("flash backing file: {0}")]
    Io(#[from] std::io::Error),
    #[error("flash layout: {0}")]
    Geometry(#[from] GeometryError),
}

/// A dummy flash controller peripheral for emulation purposes.
///
/// Software programs `fl_addr`, fills the page buffer for program operations
/// and sets `control` to start an operation. The operation completes after the
/// configured number of [`DummyFlashCtrl::poll`] ticks and is reported in
/// `op_status`. Reads go through the direct (memory mapped) read window.
pub struct DummyFlashCtrl {
    layout: FlashLayout,
    regions: Vec<SectorRegion>,
    timing: FlashTiming,
    control: InMemoryRegister<u32, FlControl::Register>,
    op_status: InMemoryRegister<u32, OpStatus::Register>,
    ctrl_regwen: InMemoryRegister<u32, CtrlRegwen::Register>,
    fl_addr: InMemoryRegister<u32>,
    page_buffer: RefCell<Vec<u8>>,
    direct_read_region: RefCell<Vec<u8>>,
    file: RefCell<Option<File>>,
    busy_ticks: Cell<Option<u32>>,
    stalled: Cell<bool>,
    drop_writes: Cell<bool>,
    fail_init: Cell<bool>,
    erase_clock: RefCell<Option<(Rc<CpuClock>, u32)>>,
}

impl DummyFlashCtrl {
    fn initialize_flash_storage(
        file: &mut File,
        size: u64,
        erase_value: u8,
    ) -> std::io::Result<()> {
        let mut remaining = size;
        let chunk = vec![erase_value; 1048576]; // 1MB chunk
        file.seek(SeekFrom::Start(0))?;
        while remaining > 0 {
            let write_size = std::cmp::min(remaining, chunk.len() as u64) as usize;
            file.write_all(&chunk[..write_size])?;
            remaining -= write_size as u64;
        }
        Ok(())
    }

    pub fn new(
        layout: FlashLayout,
        timing: FlashTiming,
        file_name: Option<PathBuf>,
    ) -> Result<Self, FlashCtrlError> {
        layout.validate()?;
        let capacity = layout.capacity();
        let mut storage = vec![layout.erase_value; capacity as usize];

        let file = if let Some(path) = file_name {
            let mut file = File::options()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            if file.metadata()?.len() < capacity {
                debug!("initializing flash backing file {}", path.display());
                Self::initialize_flash_storage(&mut file, capacity, layout.erase_value)?;
            }
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut storage)?;
            Some(file)
        } else {
            None
        };

        Ok(Self {
            page_buffer: RefCell::new(vec![0; layout.page_size as usize]),
            regions: layout.regions(),
            layout,
            timing,
            control: InMemoryRegister::new(0),
            op_status: InMemoryRegister::new(0),
            ctrl_regwen: InMemoryRegister::new(CtrlRegwen::En::SET.value),
            fl_addr: InMemoryRegister::new(0),
            direct_read_region: RefCell::new(storage),
            file: RefCell::new(file),
            busy_ticks: Cell::new(None),
            stalled: Cell::new(false),
            drop_writes: Cell::new(false),
            fail_init: Cell::new(false),
            erase_clock: RefCell::new(None),
        })
    }

    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    pub fn sector_map(&self) -> SectorMap<'_> {
        SectorMap::new(&self.regions)
    }

    /// Operations started from now on never complete.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.set(stalled);
    }

    /// Program operations report success without changing the medium.
    pub fn set_drop_writes(&self, drop_writes: bool) {
        self.drop_writes.set(drop_writes);
    }

    /// The controller refuses to come out of reset.
    pub fn set_fail_init(&self, fail_init: bool) {
        self.fail_init.set(fail_init);
    }

    pub fn init_failed(&self) -> bool {
        self.fail_init.get()
    }

    /// Every successful erase switches `clock` to `hz`, like a driver that
    /// reprograms clock or cache settings behind the caller's back.
    pub fn set_erase_clock_hook(&self, clock: Rc<CpuClock>, hz: u32) {
        *self.erase_clock.borrow_mut() = Some((clock, hz));
    }

    pub fn read_control(&self) -> u32 {
        self.control.get()
    }

    /// Starts an operation when `Start` is set. Ignored while an operation is
    /// in flight (`ctrl_regwen` cleared).
    pub fn write_control(&self, val: u32) {
        if !self.ctrl_regwen.is_set(CtrlRegwen::En) {
            warn!("flash control write while busy ignored");
            return;
        }
        self.control.set(val);
        if !self.control.is_set(FlControl::Start) {
            return;
        }
        let ticks = match self.control.read(FlControl::Op).try_into() {
            Ok(FlashOperation::ProgramPage) => self.timing.program_busy_ticks,
            Ok(FlashOperation::EraseSector) => self.timing.erase_busy_ticks,
            Err(_) => 0,
        };
        self.ctrl_regwen.modify(CtrlRegwen::En::CLEAR);
        self.busy_ticks.set(Some(ticks));
    }

    pub fn read_op_status(&self) -> u32 {
        self.op_status.get()
    }

    pub fn write_op_status(&self, val: u32) {
        self.op_status.set(val);
    }

    pub fn read_ctrl_regwen(&self) -> u32 {
        self.ctrl_regwen.get()
    }

    pub fn read_fl_addr(&self) -> u32 {
        self.fl_addr.get()
    }

    pub fn write_fl_addr(&self, val: u32) {
        self.fl_addr.set(val);
    }

    /// Loads one page of data for the next program operation.
    pub fn write_page_buffer(&self, data: &[u8]) {
        let mut buffer = self.page_buffer.borrow_mut();
        let len = data.len().min(buffer.len());
        buffer[..len].copy_from_slice(&data[..len]);
    }

    /// Memory mapped read of the flash contents.
    pub fn direct_read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashOpError> {
        let offset = self.offset(address, buf.len()).ok_or(FlashOpError::StorageError)?;
        buf.copy_from_slice(&self.direct_read_region.borrow()[offset..offset + buf.len()]);
        Ok(())
    }

    /// Advances the emulator clock by one tick.
    pub fn poll(&self) {
        let Some(remaining) = self.busy_ticks.get() else {
            return;
        };
        if self.stalled.get() {
            return;
        }
        if remaining > 1 {
            self.busy_ticks.set(Some(remaining - 1));
            return;
        }
        self.busy_ticks.set(None);
        self.process_io();
    }

    fn offset(&self, address: u32, len: usize) -> Option<usize> {
        let offset = address.checked_sub(self.layout.start)? as usize;
        (offset as u64 + len as u64 <= self.layout.capacity()).then_some(offset)
    }

    fn store(&self, offset: usize, len: usize) -> Result<(), FlashOpError> {
        let storage = self.direct_read_region.borrow();
        if let Some(file) = self.file.borrow_mut().as_mut() {
            file.seek(SeekFrom::Start(offset as u64))
                .and_then(|_| file.write_all(&storage[offset..offset + len]))
                .and_then(|_| file.flush())
                .map_err(|err| {
                    warn!("flash backing file write failed: {}", err);
                    FlashOpError::StorageError
                })?;
        }
        Ok(())
    }

    fn program_page(&self) -> Result<(), FlashOpError> {
        let address = self.fl_addr.get();
        let page_size = self.layout.page_size as usize;
        if address % self.layout.page_size != 0 {
            return Err(FlashOpError::WriteError);
        }
        let offset = self
            .offset(address, page_size)
            .ok_or(FlashOpError::WriteError)?;
        if self.drop_writes.get() {
            debug!("dropping program of page {:#010x}", address);
            return Ok(());
        }
        {
            let buffer = self.page_buffer.borrow();
            let mut storage = self.direct_read_region.borrow_mut();
            // Programming only moves bits away from their erased state
            let erased = self.layout.erase_value;
            for (cell, data) in storage[offset..offset + page_size].iter_mut().zip(buffer.iter()) {
                *cell = erased ^ ((erased ^ *cell) | (erased ^ *data));
            }
        }
        self.store(offset, page_size)
    }

    fn erase_sector(&self) -> Result<(), FlashOpError> {
        let address = self.fl_addr.get();
        let sector_size = self.sector_map().sector_size(address);
        if sector_size == INVALID_SIZE || address % sector_size != 0 {
            return Err(FlashOpError::EraseError);
        }
        let len = sector_size as usize;
        let offset = self.offset(address, len).ok_or(FlashOpError::EraseError)?;
        self.direct_read_region.borrow_mut()[offset..offset + len].fill(self.layout.erase_value);
        self.store(offset, len)?;

        if let Some((clock, hz)) = self.erase_clock.borrow().as_ref() {
            warn!("erase switched CPU clock from {} Hz to {} Hz", clock.hz(), hz);
            clock.set_hz(*hz);
        }
        Ok(())
    }

    fn handle_io_completion(&self, io_compl: Result<(), FlashOpError>) {
        match io_compl {
            Ok(_) => self.op_status.modify(OpStatus::Done::SET),
            Err(error_type) => self.op_status.modify(OpStatus::Err.val(error_type as u32)),
        }
        self.control.modify(FlControl::Start::CLEAR);
        // Operation is fully completed; allow SW to write control for the next one.
        self.ctrl_regwen.modify(CtrlRegwen::En::SET);
    }

    fn process_io(&self) {
        let io_compl = match self.control.read(FlControl::Op).try_into() {
            Ok(FlashOperation::ProgramPage) => self.program_page(),
            Ok(FlashOperation::EraseSector) => self.erase_sector(),
            Err(_) => Err(FlashOpError::InvalidOp),
        };
        self.handle_io_completion(io_compl);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run_to_completion(ctrl: &DummyFlashCtrl) -> u32 {
        for _ in 0..1000 {
            ctrl.poll();
            if ctrl.read_ctrl_regwen() != 0 {
                break;
            }
        }
        ctrl.read_op_status()
    }

    fn start(ctrl: &DummyFlashCtrl, op: FlashOperation, address: u32) {
        ctrl.write_op_status(0);
        ctrl.write_fl_addr(address);
        let op = match op {
            FlashOperation::ProgramPage => FlControl::Op::ProgramPage,
            FlashOperation::EraseSector => FlControl::Op::EraseSector,
        };
        ctrl.write_control((FlControl::Start::SET + op).value);
    }

    #[test]
    fn test_program_is_bitwise_and() {
        let ctrl =
            DummyFlashCtrl::new(FlashLayout::uniform(), FlashTiming::default(), None).unwrap();
        ctrl.write_page_buffer(&[0xF0; 256]);
        start(&ctrl, FlashOperation::ProgramPage, 0x0800_0000);
        assert_eq!(run_to_completion(&ctrl), OpStatus::Done::SET.value);

        ctrl.write_page_buffer(&[0x3C; 256]);
        start(&ctrl, FlashOperation::ProgramPage, 0x0800_0000);
        assert_eq!(run_to_completion(&ctrl), OpStatus::Done::SET.value);

        let mut buf = [0u8; 4];
        ctrl.direct_read(0x0800_0000, &mut buf).unwrap();
        assert_eq!(buf, [0x30; 4]);
        ctrl.direct_read(0x0800_0100, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 4]);
    }

    #[test]
    fn test_program_zero_erased_part_sets_bits() {
        let layout = FlashLayout {
            erase_value: 0x00,
            ..FlashLayout::uniform()
        };
        let ctrl = DummyFlashCtrl::new(layout, FlashTiming::default(), None).unwrap();
        for data in [0x0F, 0x30] {
            ctrl.write_page_buffer(&[data; 256]);
            start(&ctrl, FlashOperation::ProgramPage, 0x0800_0000);
            assert_eq!(run_to_completion(&ctrl), OpStatus::Done::SET.value);
        }

        let mut buf = [0xAAu8; 4];
        ctrl.direct_read(0x0800_0000, &mut buf).unwrap();
        assert_eq!(buf, [0x3F; 4]);
    }

    #[test]
    fn test_busy_until_ticks_elapse() {
        let ctrl =
            DummyFlashCtrl::new(FlashLayout::uniform(), FlashTiming::default(), None).unwrap();
        start(&ctrl, FlashOperation::EraseSector, 0x0800_0000);
        for _ in 0..63 {
            ctrl.poll();
        }
        assert_eq!(ctrl.read_ctrl_regwen(), 0);
        assert_eq!(ctrl.read_op_status(), 0);
        ctrl.poll();
        assert_eq!(ctrl.read_ctrl_regwen(), CtrlRegwen::En::SET.value);
        assert_eq!(ctrl.read_op_status(), OpStatus::Done::SET.value);
    }

    #[test]
    fn test_misaligned_erase_reports_error() {
        let ctrl =
            DummyFlashCtrl::new(FlashLayout::uniform(), FlashTiming::default(), None).unwrap();
        start(&ctrl, FlashOperation::EraseSector, 0x0800_0800);
        let status = run_to_completion(&ctrl);
        assert_eq!(
            status,
            OpStatus::Err.val(FlashOpError::EraseError as u32).value
        );
    }

    #[test]
    fn test_file_backing_persists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        {
            let ctrl = DummyFlashCtrl::new(
                FlashLayout::uniform(),
                FlashTiming::default(),
                Some(path.clone()),
            )
            .unwrap();
            ctrl.write_page_buffer(&[0x5A; 256]);
            start(&ctrl, FlashOperation::ProgramPage, 0x080F_FF00);
            assert_eq!(run_to_completion(&ctrl), OpStatus::Done::SET.value);
        }
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0x10_0000);

        let ctrl =
            DummyFlashCtrl::new(FlashLayout::uniform(), FlashTiming::default(), Some(path))
                .unwrap();
        let mut buf = [0u8; 2];
        ctrl.direct_read(0x080F_FEFF, &mut buf).unwrap();
        assert_eq!(buf, [0xFF, 0x5A]);
    }
}
