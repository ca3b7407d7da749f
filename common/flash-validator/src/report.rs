// Licensed under the Apache-2.0 license

use crate::{ValidationError, ValidatorState};
use core::fmt;
use flash_hal::GeometryReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Init,
    GeometryCheck,
    Erase,
    Program,
    Verify,
    DriftCheck,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Init => "init",
            Step::GeometryCheck => "geometry",
            Step::Erase => "erase",
            Step::Program => "program",
            Step::Verify => "verify",
            Step::DriftCheck => "drift",
        };
        f.pad(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The sector at `boundary` overlaps the reserved program image.
    Reserved { boundary: u32, reserved_end: u32 },
    /// Nothing was programmed, so there is nothing to verify.
    NothingProgrammed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Reserved {
                boundary,
                reserved_end,
            } => write!(
                f,
                "sector {:#010x} lies below reserved end {:#010x}",
                boundary, reserved_end
            ),
            SkipReason::NothingProgrammed => write!(f, "nothing was programmed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Passed,
    Skipped(SkipReason),
    Failed(ValidationError),
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Passed => write!(f, "ok"),
            StepOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            StepOutcome::Failed(err) => write!(f, "FAILED ({})", err),
        }
    }
}

/// Result of one validation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub state: ValidatorState,
    pub outcomes: Vec<(Step, StepOutcome)>,
    pub geometry: Option<GeometryReport>,
    pub baseline_us: Option<u64>,
    pub final_us: Option<u64>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.state == ValidatorState::Done
    }

    pub fn failure(&self) -> Option<&ValidationError> {
        match &self.state {
            ValidatorState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (Step, SkipReason)> + '_ {
        self.outcomes.iter().filter_map(|(step, outcome)| match outcome {
            StepOutcome::Skipped(reason) => Some((*step, *reason)),
            _ => None,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (step, outcome) in &self.outcomes {
            writeln!(f, "  {:<9} {}", step, outcome)?;
        }
        if let Some(geometry) = &self.geometry {
            writeln!(
                f,
                "  device    {:#010x}+{:#x}, page {:#x}, {} sectors of {:#x}..={:#x}",
                geometry.start,
                geometry.size,
                geometry.page_size,
                geometry.sectors,
                geometry.min_sector_size,
                geometry.max_sector_size
            )?;
        }
        if let (Some(before), Some(after)) = (self.baseline_us, self.final_us) {
            writeln!(f, "  timing    {} us before, {} us after", before, after)?;
        }
        write!(
            f,
            "  result    {}",
            if self.passed() { "PASSED" } else { "FAILED" }
        )
    }
}
