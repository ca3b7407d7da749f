/*++

Licensed under the Apache-2.0 license.

File Name:

    args.rs

Abstract:

    File contains the command line arguments of the flash validation emulator.

--*/

use clap::{Parser, ValueEnum};
use clap_num::maybe_hex;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutPreset {
    /// 1 MiB of 4 KiB sectors at 0x0800_0000
    Uniform,
    /// 1 MiB bank split into 16 KiB, 64 KiB and 128 KiB sectors
    Stm32f4,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, name = "Flash HAL Validation Emulator")]
pub struct EmulatorArgs {
    /// Built-in flash layouts to validate, in order.
    #[arg(short, long, value_enum, default_values_t = [LayoutPreset::Uniform])]
    pub layout: Vec<LayoutPreset>,

    /// TOML file with `[[scenario]]` tables. Replaces --layout.
    #[arg(short, long)]
    pub scenario_file: Option<PathBuf>,

    /// Directory holding one persistent flash image per scenario.
    #[arg(long)]
    pub flash_dir: Option<PathBuf>,

    /// Sectors starting below this address are never erased.
    #[arg(long, value_parser=maybe_hex::<u32>)]
    pub reserved_end: Option<u32>,

    /// Busy-loop iterations per timing sample.
    #[arg(long, value_parser=maybe_hex::<u32>)]
    pub cycles: Option<u32>,

    /// Ticks that must be measurable without counter wraparound.
    #[arg(long, value_parser=maybe_hex::<u32>)]
    pub window_ticks: Option<u32>,

    /// Allowed drift is the baseline divided by this value.
    #[arg(long)]
    pub drift_divisor: Option<u32>,

    /// Switch the emulated CPU to this frequency on every erase.
    #[arg(long)]
    pub erase_clock_hz: Option<u32>,

    /// Width of the emulated ticker in bits.
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub ticker_bits: u8,

    #[arg(long, default_value_t = 1_000_000)]
    pub ticker_hz: u32,

    /// Initial ticker value; start close to the wrap point to exercise overflow protection.
    #[arg(long, default_value_t = 0, value_parser=maybe_hex::<u32>)]
    pub ticker_start: u32,

    #[arg(long, default_value_t = 400_000_000)]
    pub cpu_hz: u32,

    /// Time the real busy loop against the host clock instead of the emulated CPU.
    #[arg(long, default_value_t = false)]
    pub host_timing: bool,

    /// Controller ticks an erase or program may take.
    #[arg(long, default_value_t = 10_000)]
    pub poll_timeout: u32,

    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}
