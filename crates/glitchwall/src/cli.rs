use std::path::PathBuf;

use backdrop::{parse_antialias, Antialiasing, GpuPowerPreference};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "glitchwall",
    author,
    version,
    about = "Beat-synchronised glitch backdrop for the desktop"
)]
pub struct Cli {
    /// Settings file (TOML); command-line flags override its values.
    #[arg(long, value_name = "FILE", env = "GLITCHWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Window or export size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// MSAA mode: `auto`, `off`, or an explicit sample count (2, 4, 8, 16).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// GPU adapter preference.
    #[arg(long, value_enum, value_name = "PREFERENCE")]
    pub power: Option<PowerArg>,

    /// Request a compositor-blended surface so the desktop shows through until the first frame.
    #[arg(long)]
    pub transparent: bool,

    /// Keep pointer input on the backdrop window instead of passing it through.
    #[arg(long)]
    pub interactive: bool,

    /// Override the display scale factor used for the drawable size.
    #[arg(long, value_name = "RATIO", value_parser = parse_pixel_ratio)]
    pub pixel_ratio: Option<f64>,

    /// Render a single frame on the CPU, write it as PNG and exit.
    #[arg(long, value_name = "PATH")]
    pub still_export: Option<PathBuf>,

    /// Timestamp (seconds) evaluated by `--still-export`.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0, value_parser = parse_still_time)]
    pub still_time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerArg {
    Low,
    High,
}

impl From<PowerArg> for GpuPowerPreference {
    fn from(value: PowerArg) -> Self {
        match value {
            PowerArg::Low => GpuPowerPreference::Low,
            PowerArg::High => GpuPowerPreference::High,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;

    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

fn parse_pixel_ratio(value: &str) -> Result<f64, String> {
    let ratio: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid pixel ratio '{value}'"))?;
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err("pixel ratio must be a positive number".to_string());
    }
    Ok(ratio)
}

fn parse_still_time(value: &str) -> Result<f32, String> {
    let seconds: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid still time '{value}'; expected seconds"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("still time must be a non-negative number of seconds".to_string());
    }
    Ok(seconds)
}
