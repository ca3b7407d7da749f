/*++

Licensed under the Apache-2.0 license.

File Name:

    scenario.rs

Abstract:

    File contains the validation scenarios and the code that wires an emulated
    flash part and timer to the validator for each of them.

--*/

use crate::{EmulatorArgs, LayoutPreset};
use anyhow::{bail, Context, Result};
use emulator_periph::{
    CpuClock, DummyFlashCtrl, EmulatedFlashDriver, EmulatedTicker, FlashLayout, FlashTiming,
    HostTicker, PollTimeout, SpinLoop,
};
use flash_validator::{FlashValidator, ValidationReport, ValidatorConfig};
use log::{info, warn};
use mcu_ticker::CalibratedLoop;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Faults injected into the emulated controller.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FaultConfig {
    pub erase_clock_hz: Option<u32>,
    pub stall: bool,
    pub drop_writes: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub layout: FlashLayout,
    #[serde(default)]
    pub timing: FlashTiming,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub faults: FaultConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    scenario: Vec<Scenario>,
}

impl Scenario {
    pub fn preset(preset: LayoutPreset) -> Self {
        let (name, layout) = match preset {
            LayoutPreset::Uniform => ("uniform", FlashLayout::uniform()),
            LayoutPreset::Stm32f4 => ("stm32f4", FlashLayout::stm32f4()),
        };
        Self {
            name: name.to_string(),
            layout,
            timing: FlashTiming::default(),
            validator: ValidatorConfig::default(),
            faults: FaultConfig::default(),
        }
    }

    /// Applies validator and fault settings given on the command line.
    pub fn apply_overrides(&mut self, args: &EmulatorArgs) {
        let config = &mut self.validator;
        if let Some(reserved_end) = args.reserved_end {
            config.reserved_end = reserved_end;
        }
        if let Some(cycles) = args.cycles {
            config.cycles = cycles;
        }
        if let Some(window_ticks) = args.window_ticks {
            config.window_ticks = window_ticks;
        }
        if let Some(drift_divisor) = args.drift_divisor {
            config.drift_divisor = drift_divisor;
        }
        if args.erase_clock_hz.is_some() {
            self.faults.erase_clock_hz = args.erase_clock_hz;
        }
    }
}

pub fn parse_scenarios(text: &str) -> Result<Vec<Scenario>> {
    let file: ScenarioFile = toml::from_str(text)?;
    if file.scenario.is_empty() {
        bail!("no [[scenario]] tables");
    }
    Ok(file.scenario)
}

pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file {}", path.display()))?;
    parse_scenarios(&text).with_context(|| format!("parsing scenario file {}", path.display()))
}

/// Scenarios selected by the command line, with overrides applied.
pub fn scenarios_from_args(args: &EmulatorArgs) -> Result<Vec<Scenario>> {
    let mut scenarios = match &args.scenario_file {
        Some(path) => load_scenarios(path)?,
        None => args.layout.iter().copied().map(Scenario::preset).collect(),
    };
    for scenario in scenarios.iter_mut() {
        scenario.apply_overrides(args);
    }
    Ok(scenarios)
}

/// Timer and controller settings shared by every scenario of a run.
#[derive(Clone, Debug)]
pub struct RunEnv {
    pub ticker_bits: u8,
    pub ticker_hz: u32,
    pub ticker_start: u32,
    pub cpu_hz: u32,
    pub host_timing: bool,
    pub poll_timeout: PollTimeout,
    pub flash_dir: Option<PathBuf>,
}

impl Default for RunEnv {
    fn default() -> Self {
        Self {
            ticker_bits: 32,
            ticker_hz: 1_000_000,
            ticker_start: 0,
            cpu_hz: 400_000_000,
            host_timing: false,
            poll_timeout: PollTimeout::default(),
            flash_dir: None,
        }
    }
}

impl From<&EmulatorArgs> for RunEnv {
    fn from(args: &EmulatorArgs) -> Self {
        Self {
            ticker_bits: args.ticker_bits,
            ticker_hz: args.ticker_hz,
            ticker_start: args.ticker_start,
            cpu_hz: args.cpu_hz,
            host_timing: args.host_timing,
            poll_timeout: PollTimeout(args.poll_timeout),
            flash_dir: args.flash_dir.clone(),
        }
    }
}

/// Builds the emulated hardware for `scenario` and runs the validator on it.
/// Errors are setup problems; validation failures are part of the report.
pub fn run_scenario(scenario: &Scenario, env: &RunEnv) -> Result<ValidationReport> {
    let flash_file = env
        .flash_dir
        .as_ref()
        .map(|dir| dir.join(format!("{}.bin", scenario.name)));
    let ctrl = DummyFlashCtrl::new(scenario.layout.clone(), scenario.timing, flash_file)
        .with_context(|| format!("scenario {}: creating flash controller", scenario.name))?;
    ctrl.set_stalled(scenario.faults.stall);
    ctrl.set_drop_writes(scenario.faults.drop_writes);
    let flash = EmulatedFlashDriver::new(ctrl, env.poll_timeout);
    let config = scenario.validator.clone();

    info!(
        "scenario {}: {:#010x}+{:#x}",
        scenario.name,
        scenario.layout.start,
        scenario.layout.capacity()
    );

    if env.host_timing {
        if scenario.faults.erase_clock_hz.is_some() {
            warn!(
                "scenario {}: clock fault ignored with host timing",
                scenario.name
            );
        }
        let ticker = HostTicker::new(env.ticker_hz, env.ticker_bits);
        return Ok(FlashValidator::new(&flash, &ticker, &CalibratedLoop, config).run());
    }

    let ticker = Rc::new(
        EmulatedTicker::new(env.ticker_hz, env.ticker_bits).with_start(env.ticker_start),
    );
    let clock = Rc::new(CpuClock::new(env.cpu_hz));
    if let Some(hz) = scenario.faults.erase_clock_hz {
        flash.ctrl().set_erase_clock_hook(clock.clone(), hz);
    }
    let spin = SpinLoop::new(ticker.clone(), clock);
    Ok(FlashValidator::new(&flash, ticker.as_ref(), &spin, config).run())
}
