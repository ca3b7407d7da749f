/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Library interface for the Flash HAL Validation Emulator.

--*/

pub mod args;
pub mod scenario;

pub use args::{EmulatorArgs, LayoutPreset};
pub use scenario::{
    load_scenarios, parse_scenarios, run_scenario, scenarios_from_args, FaultConfig, RunEnv,
    Scenario,
};
