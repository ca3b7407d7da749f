// Licensed under the Apache-2.0 license

use crate::cargo;
use anyhow::Result;

pub(crate) fn validate(release: bool, args: &[String]) -> Result<()> {
    let mut cargo_args = vec!["run", "-p", "emulator"];
    if release {
        cargo_args.push("--release");
    }
    cargo_args.push("--");
    cargo_args.extend(args.iter().map(String::as_str));
    cargo::run(&cargo_args, false, "flash validation did not pass")
}
