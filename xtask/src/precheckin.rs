// Licensed under the Apache-2.0 license

use crate::{cargo, deps, header};
use anyhow::Result;

pub(crate) fn precheckin() -> Result<()> {
    cargo::cargo_lock()?;
    cargo::format()?;
    cargo::clippy()?;
    header::check()?;
    deps::check()
}
