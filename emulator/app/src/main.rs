/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the Flash HAL Validation Emulator.

--*/

use clap::Parser;
use emulator::{run_scenario, scenarios_from_args, EmulatorArgs, RunEnv};
use log::error;
use simple_logger::SimpleLogger;

fn main() -> anyhow::Result<()> {
    let cli = EmulatorArgs::parse();
    SimpleLogger::new().with_level(cli.log_level).init()?;

    let env = RunEnv::from(&cli);
    let scenarios = scenarios_from_args(&cli)?;
    let mut failures = 0;
    for scenario in &scenarios {
        match run_scenario(scenario, &env) {
            Ok(report) => {
                println!("scenario {}:\n{}", scenario.name, report);
                if !report.passed() {
                    failures += 1;
                }
            }
            Err(err) => {
                error!("scenario {}: {:#}", scenario.name, err);
                failures += 1;
            }
        }
    }

    println!("{} of {} scenarios passed", scenarios.len() - failures, scenarios.len());
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
