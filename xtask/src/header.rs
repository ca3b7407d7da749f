// Licensed under the Apache-2.0 license

use crate::PROJECT_ROOT;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

const LICENSE: &str = "Licensed under the Apache-2.0 license";
/// The license must appear this close to the top of a file.
const HEADER_LINES: usize = 3;
const SKIPPED_DIRS: [&str; 3] = [".git", "examples", "target"];

/// Comment syntax of a file that must carry the license header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Syntax {
    Rust,
    Toml,
}

impl Syntax {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "rs" => Some(Self::Rust),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn line_comment(self) -> &'static str {
        match self {
            Self::Rust => "//",
            Self::Toml => "#",
        }
    }

    /// Whether `text` names the license in a comment near its top. Rust files
    /// may also use a `/*++` file banner.
    fn has_header(self, text: &str) -> bool {
        let mut in_banner = false;
        for line in text.lines().take(HEADER_LINES).map(str::trim) {
            in_banner |= self == Self::Rust && line.starts_with("/*");
            let comment = in_banner || line.starts_with(self.line_comment());
            if comment && line.contains(LICENSE) {
                return true;
            }
        }
        false
    }

    fn with_header(self, text: &str) -> String {
        let gap = if text.starts_with('\n') { "" } else { "\n" };
        format!("{} {LICENSE}\n{gap}{text}", self.line_comment())
    }
}

pub(crate) fn check() -> Result<()> {
    println!("Running: license header check");
    let missing = missing_headers(&PROJECT_ROOT)?;
    for (path, _) in missing.iter() {
        println!("  missing license header: {}", relative(path));
    }
    if !missing.is_empty() {
        bail!(
            "{} files lack the license header; run \"cargo xtask header-fix\"",
            missing.len()
        );
    }
    Ok(())
}

pub(crate) fn fix() -> Result<()> {
    println!("Running: license header fix");
    let fixed = fix_headers(&PROJECT_ROOT)?;
    for path in fixed.iter() {
        println!("  added license header: {}", relative(path));
    }
    Ok(())
}

fn fix_headers(root: &Path) -> Result<Vec<PathBuf>> {
    let missing = missing_headers(root)?;
    for (path, syntax) in missing.iter() {
        let text = std::fs::read_to_string(path)?;
        std::fs::write(path, syntax.with_header(&text))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(missing.into_iter().map(|(path, _)| path).collect())
}

fn missing_headers(root: &Path) -> Result<Vec<(PathBuf, Syntax)>> {
    let mut missing = vec![];
    let walker = walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry.file_type().is_dir()
                || entry
                    .file_name()
                    .to_str()
                    .map_or(true, |name| !SKIPPED_DIRS.contains(&name))
        });
    for entry in walker {
        let entry = entry?;
        let Some(syntax) = Syntax::of(entry.path()).filter(|_| entry.file_type().is_file())
        else {
            continue;
        };
        let text = std::fs::read_to_string(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        if !syntax.has_header(&text) {
            missing.push((entry.into_path(), syntax));
        }
    }
    Ok(missing)
}

fn relative(path: &Path) -> String {
    path.strip_prefix(&*PROJECT_ROOT)
        .unwrap_or(path)
        .display()
        .to_string()
}
