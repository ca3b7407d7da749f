// Licensed under the Apache-2.0 license

use crate::PROJECT_ROOT;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

const IGNORE_DIRS: [&str; 3] = ["examples", "target", ".git"];

pub(crate) fn check() -> Result<()> {
    let cargo_tomls = find_cargo_tomls(&PROJECT_ROOT)?;
    let mut okay = true;
    for toml_path in cargo_tomls.iter() {
        let data = std::fs::read_to_string(toml_path)?;
        let value = data.parse::<Table>()?;
        let Some(deps) = value.get("dependencies").and_then(Value::as_table) else {
            continue;
        };
        println!("Checking dependencies in {}", toml_path.display());
        for (k, v) in deps.iter() {
            if !uses_workspace(v) {
                okay = false;
                println!(
                    "  dependency {} should be {}.workspace = true but was {} = {}",
                    k, k, k, v
                );
            }
        }
    }
    if !okay {
        bail!("Dependency check failed");
    }
    Ok(())
}

fn uses_workspace(dep: &Value) -> bool {
    dep.as_table()
        .and_then(|table| table.get("workspace"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub(crate) fn find_cargo_tomls(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut result = vec![];
    let walker = walkdir::WalkDir::new(dir).into_iter().filter_entry(|entry| {
        entry
            .file_name()
            .to_str()
            .map_or(true, |name| !IGNORE_DIRS.contains(&name))
    });
    for entry in walker {
        let entry = entry?;
        if entry.file_name() == "Cargo.toml" {
            result.push(entry.into_path());
        }
    }
    result.sort();
    Ok(result)
}
