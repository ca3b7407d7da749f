// Licensed under the Apache-2.0 license

//! Thin wrappers over the cargo subcommands the check-in gate runs.

use crate::PROJECT_ROOT;
use anyhow::{bail, Context, Result};
use std::process::{Command, Stdio};

/// A cargo invocation rooted at the workspace.
pub(crate) fn command<'a>(args: impl IntoIterator<Item = &'a str>) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.current_dir(&*PROJECT_ROOT).args(args);
    cmd
}

/// Runs cargo with `args` and fails with `hint` if it exits unsuccessfully.
pub(crate) fn run(args: &[&str], quiet: bool, hint: &str) -> Result<()> {
    println!("Running: cargo {}", args.join(" "));
    let mut cmd = command(args.iter().copied());
    if quiet {
        cmd.stdout(Stdio::null());
    }
    let status = cmd
        .status()
        .with_context(|| format!("spawning cargo {}", args[0]))?;
    if !status.success() {
        bail!("cargo {} failed; {}", args.join(" "), hint);
    }
    Ok(())
}

pub(crate) fn clippy() -> Result<()> {
    run(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        false,
        "fix the lints above",
    )
}

pub(crate) fn format() -> Result<()> {
    run(&["fmt", "--check", "--all"], false, "run cargo fmt --all")
}

pub(crate) fn cargo_lock() -> Result<()> {
    run(
        &["tree", "--locked"],
        true,
        "commit the required Cargo.lock changes",
    )
}
