// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

mod cargo;
mod deps;
mod header;
mod precheckin;
mod validate;

pub(crate) static PROJECT_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
    Path::new(&env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
});

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the flash validation emulator on one or more scenarios
    Validate {
        /// Build and run the emulator with optimizations
        #[arg(short, long, default_value_t = false)]
        release: bool,

        /// Arguments passed through to the emulator
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run clippy on all targets
    Clippy,
    /// Check that all files are formatted
    Format,
    /// Run pre-check-in checks
    Precheckin,
    /// Check cargo lock
    CargoLock,
    /// Check files for Apache license header
    HeaderCheck,
    /// Add Apache license header to files where it is missing
    HeaderFix,
    /// Run tests
    Test,
    /// Check dependencies
    Deps,
}

fn main() {
    let cli = Xtask::parse();
    let result = match &cli.xtask {
        Commands::Validate { release, args } => validate::validate(*release, args),
        Commands::Clippy => cargo::clippy(),
        Commands::Precheckin => precheckin::precheckin(),
        Commands::Format => cargo::format(),
        Commands::CargoLock => cargo::cargo_lock(),
        Commands::HeaderFix => header::fix(),
        Commands::HeaderCheck => header::check(),
        Commands::Test => test::test(),
        Commands::Deps => deps::check(),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
