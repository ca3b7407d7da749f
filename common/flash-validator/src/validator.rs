// Licensed under the Apache-2.0 license

use crate::{SkipReason, Step, StepOutcome, ValidationError, ValidationReport, ValidatorConfig};
use flash_hal::{
    align_down, check_geometry, FlashDevice, FlashSession, GeometryError, GeometryReport,
};
use log::{error, info, warn};
use mcu_ticker::{overflow_protect, BusyLoop, CycleTimer, Ticker, TimerSample};

/// Scratch size for read-back comparisons.
const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorState {
    Init,
    GeometryCheck,
    Erase,
    Program,
    Verify,
    DriftCheck,
    Done,
    Failed(ValidationError),
}

/// Page programmed by the program step and the sector holding it.
#[derive(Clone, Copy, Debug)]
struct ProgramTarget {
    address: u32,
    sector: u32,
    sector_size: u32,
}

#[derive(Default)]
struct ValidationContext<'a> {
    session: Option<FlashSession<'a>>,
    baseline: Option<TimerSample>,
    final_sample: Option<TimerSample>,
    geometry: Option<GeometryReport>,
    program_target: Option<ProgramTarget>,
    outcomes: Vec<(Step, StepOutcome)>,
}

/// Runs the validation steps in order, one step per [`FlashValidator::on_event`]
/// call. Any failing step moves the machine to [`ValidatorState::Failed`];
/// nothing is retried.
pub struct FlashValidator<'a> {
    state: ValidatorState,
    device: &'a dyn FlashDevice,
    timer: CycleTimer<'a>,
    config: ValidatorConfig,
    ctx: ValidationContext<'a>,
}

impl<'a> FlashValidator<'a> {
    pub fn new(
        device: &'a dyn FlashDevice,
        ticker: &'a dyn Ticker,
        busy: &'a dyn BusyLoop,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            state: ValidatorState::Init,
            device,
            timer: CycleTimer::new(ticker, busy),
            config,
            ctx: ValidationContext::default(),
        }
    }

    pub fn state(&self) -> &ValidatorState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ValidatorState::Done | ValidatorState::Failed(_))
    }

    /// Runs the current step and moves to the next state.
    pub fn on_event(&mut self) {
        let (step, next) = match self.state {
            ValidatorState::Init => (Step::Init, ValidatorState::GeometryCheck),
            ValidatorState::GeometryCheck => (Step::GeometryCheck, ValidatorState::Erase),
            ValidatorState::Erase => (Step::Erase, ValidatorState::Program),
            ValidatorState::Program => (Step::Program, ValidatorState::Verify),
            ValidatorState::Verify => (Step::Verify, ValidatorState::DriftCheck),
            ValidatorState::DriftCheck => (Step::DriftCheck, ValidatorState::Done),
            ValidatorState::Done | ValidatorState::Failed(_) => return,
        };

        let result = match step {
            Step::Init => self.handle_init_state(),
            Step::GeometryCheck => self.handle_geometry_state(),
            Step::Erase => self.handle_erase_state(),
            Step::Program => self.handle_program_state(),
            Step::Verify => self.handle_verify_state(),
            Step::DriftCheck => self.handle_drift_state(),
        };

        match result {
            Ok(outcome) => {
                match &outcome {
                    StepOutcome::Skipped(reason) => warn!("{} skipped: {}", step, reason),
                    _ => info!("{} passed", step),
                }
                self.ctx.outcomes.push((step, outcome));
                self.state = next;
            }
            Err(err) => {
                error!("{} failed: {}", step, err);
                self.ctx.outcomes.push((step, StepOutcome::Failed(err.clone())));
                // Dropping the session releases the device.
                self.ctx.session = None;
                self.state = ValidatorState::Failed(err);
            }
        }
    }

    /// Drives the machine to `Done` or `Failed` and reports what happened.
    pub fn run(mut self) -> ValidationReport {
        while !self.is_finished() {
            self.on_event();
        }
        let elapsed = |sample: Option<TimerSample>| sample.map(|s| s.elapsed_us());
        ValidationReport {
            state: self.state,
            outcomes: self.ctx.outcomes,
            geometry: self.ctx.geometry,
            baseline_us: elapsed(self.ctx.baseline),
            final_us: elapsed(self.ctx.final_sample),
        }
    }

    fn session(&self) -> Result<&FlashSession<'a>, ValidationError> {
        // Every state after Init runs with the session open until Verify frees it.
        self.ctx
            .session
            .as_ref()
            .ok_or(ValidationError::Flash(flash_hal::FlashError::InitFailure))
    }

    fn handle_init_state(&mut self) -> Result<StepOutcome, ValidationError> {
        self.ctx.session = Some(FlashSession::open(self.device)?);
        let protection = overflow_protect(self.timer.ticker(), self.config.window_ticks);
        let sample = self.timer.sample(self.config.cycles);
        info!(
            "baseline: {} cycles in {} us ({:?})",
            self.config.cycles,
            sample.elapsed_us(),
            protection
        );
        self.ctx.baseline = Some(sample);
        Ok(StepOutcome::Passed)
    }

    fn handle_geometry_state(&mut self) -> Result<StepOutcome, ValidationError> {
        let report = check_geometry(self.session()?.device())?;
        info!(
            "{} sectors, {:#x}..={:#x} bytes, page {:#x}",
            report.sectors, report.min_sector_size, report.max_sector_size, report.page_size
        );
        self.ctx.geometry = Some(report);
        Ok(StepOutcome::Passed)
    }

    fn handle_erase_state(&mut self) -> Result<StepOutcome, ValidationError> {
        let session = self.session()?;
        let last_byte = (session.end_address() - 1) as u32;
        let sector_size = session.sector_size(last_byte);
        let sector = (session.end_address() - sector_size as u64) as u32;
        if sector % sector_size != 0 {
            return Err(GeometryError::Misaligned {
                address: sector,
                size: sector_size,
            }
            .into());
        }
        if sector < self.config.reserved_end {
            return Ok(StepOutcome::Skipped(SkipReason::Reserved {
                boundary: sector,
                reserved_end: self.config.reserved_end,
            }));
        }

        session.erase_sector(sector)?;
        expect_fill(session, sector, sector_size, session.erase_value())?;
        Ok(StepOutcome::Passed)
    }

    fn handle_program_state(&mut self) -> Result<StepOutcome, ValidationError> {
        let session = self.session()?;
        let (first, second) = (self.config.first_pattern, self.config.second_pattern);
        let erase_value = session.erase_value();
        if first == second || first == erase_value || second == erase_value {
            return Err(ValidationError::IndistinctPatterns {
                first,
                second,
                erase_value,
            });
        }

        // Second-to-last page, or the only page of a single-page part.
        let page_size = session.page_size();
        let start = session.start_address() as u64;
        let end = session.end_address();
        let address = end
            .checked_sub(2 * page_size as u64)
            .filter(|a| *a >= start)
            .or_else(|| end.checked_sub(page_size as u64).filter(|a| *a >= start))
            .ok_or(GeometryError::InvalidPageSize(page_size))? as u32;
        let sector_size = session.sector_size(address);
        let sector = align_down(address, sector_size);
        if sector < self.config.reserved_end {
            return Ok(StepOutcome::Skipped(SkipReason::Reserved {
                boundary: sector,
                reserved_end: self.config.reserved_end,
            }));
        }

        for pattern in [first, second] {
            session.erase_sector(sector)?;
            session.program_page(address, &vec![pattern; page_size as usize])?;
            expect_fill(session, address, page_size, pattern)?;
        }

        self.ctx.program_target = Some(ProgramTarget {
            address,
            sector,
            sector_size,
        });
        Ok(StepOutcome::Passed)
    }

    fn handle_verify_state(&mut self) -> Result<StepOutcome, ValidationError> {
        let session = self.session()?;
        let outcome = match self.ctx.program_target {
            Some(target) => {
                let page_size = session.page_size();
                let erased = session.erase_value();
                let page_end = target.address + page_size;
                let sector_end = target.sector as u64 + target.sector_size as u64;
                expect_fill(session, target.address, page_size, self.config.second_pattern)?;
                expect_fill(session, target.sector, target.address - target.sector, erased)?;
                expect_fill(session, page_end, (sector_end - page_end as u64) as u32, erased)?;
                StepOutcome::Passed
            }
            None => StepOutcome::Skipped(SkipReason::NothingProgrammed),
        };

        if let Some(session) = self.ctx.session.take() {
            session.free()?;
        }
        Ok(outcome)
    }

    fn handle_drift_state(&mut self) -> Result<StepOutcome, ValidationError> {
        let baseline = self
            .ctx
            .baseline
            .ok_or(ValidationError::MissingBaseline)?
            .elapsed_us();
        overflow_protect(self.timer.ticker(), self.config.window_ticks);
        let sample = self.timer.sample(self.config.cycles);
        self.ctx.final_sample = Some(sample);

        let measured = sample.elapsed_us();
        let allowed = baseline
            .checked_div(self.config.drift_divisor as u64)
            .unwrap_or(0);
        info!(
            "after flash work: {} us (baseline {} us, allowed drift {} us)",
            measured, baseline, allowed
        );
        if measured.abs_diff(baseline) > allowed {
            return Err(ValidationError::DriftExceeded {
                baseline_us: baseline,
                measured_us: measured,
                allowed_us: allowed,
            });
        }
        Ok(StepOutcome::Passed)
    }
}

/// Reads `len` bytes at `address` and checks every one of them is `expected`.
fn expect_fill(
    session: &FlashSession<'_>,
    address: u32,
    len: u32,
    expected: u8,
) -> Result<(), ValidationError> {
    let mut buf = [0u8; READ_CHUNK];
    let mut done = 0u32;
    while done < len {
        let chunk = (len - done).min(READ_CHUNK as u32) as usize;
        let base = address + done;
        session.read(base, &mut buf[..chunk])?;
        if let Some(pos) = buf[..chunk].iter().position(|b| *b != expected) {
            return Err(ValidationError::VerificationMismatch {
                address,
                offset: done + pos as u32,
                expected,
                actual: buf[pos],
            });
        }
        done += chunk as u32;
    }
    Ok(())
}
