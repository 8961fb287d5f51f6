use std::path::Path;

use anyhow::{Context, Result};
use backdrop::dpi::{LogicalSize, PhysicalSize};
use backdrop::{export_still, BackdropOptions, HostConfig, SurfaceAlpha, WindowSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// `RUST_LOG` wins over the settings file; both fall back to `info`.
pub fn initialise_tracing(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| config_filter.and_then(|raw| EnvFilter::try_new(raw).ok()))
        .unwrap_or_else(|| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: Option<&Path>) -> Result<HostConfig> {
    match path {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(HostConfig::default()),
    }
}

pub fn run(cli: Cli, config: HostConfig) -> Result<()> {
    let options = resolve_options(&cli, &config);
    let (width, height) = cli
        .size
        .unwrap_or((config.window.width, config.window.height));
    let logical = LogicalSize::new(f64::from(width), f64::from(height));

    if let Some(path) = cli.still_export.as_deref() {
        let ratio = options.pixel_ratio.unwrap_or(1.0);
        let size: PhysicalSize<u32> = logical.to_physical(ratio);
        let written = export_still(path, size, cli.still_time)
            .with_context(|| format!("failed to export still frame to {}", path.display()))?;
        info!(path = %written.display(), "still frame written");
        return Ok(());
    }

    let settings = WindowSettings {
        title: config.window.title.clone(),
        size: logical,
        below: config.window.below,
    };
    info!(
        width,
        height,
        antialiasing = ?options.antialiasing,
        power = ?options.power,
        passthrough = options.passthrough,
        "starting glitchwall"
    );
    backdrop::run(settings, options)
}

/// Settings file values with command-line overrides applied.
fn resolve_options(cli: &Cli, config: &HostConfig) -> BackdropOptions {
    let mut options = config.backdrop_options();
    if let Some(antialiasing) = cli.antialias {
        options.antialiasing = antialiasing;
    }
    if let Some(power) = cli.power {
        options.power = power.into();
    }
    if cli.transparent {
        options.surface_alpha = SurfaceAlpha::Transparent;
    }
    if cli.interactive {
        options.passthrough = false;
    }
    if cli.pixel_ratio.is_some() {
        options.pixel_ratio = cli.pixel_ratio;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop::{Antialiasing, GpuPowerPreference};
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["glitchwall"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse cli")
    }

    #[test]
    fn flags_override_settings_file() {
        let config = HostConfig::from_toml_str(
            "[render]\nantialias = \"off\"\npower = \"low\"\npixel_ratio = 2.0\n",
        )
        .expect("parse config");
        let options = resolve_options(
            &cli(&["--antialias", "8", "--power", "high", "--interactive"]),
            &config,
        );
        assert_eq!(options.antialiasing, Antialiasing::Samples(8));
        assert_eq!(options.power, GpuPowerPreference::High);
        assert_eq!(options.pixel_ratio, Some(2.0));
        assert!(!options.passthrough);
        assert_eq!(options.surface_alpha, SurfaceAlpha::Opaque);
    }

    #[test]
    fn no_flags_keep_settings_file() {
        let config = HostConfig::default();
        let options = resolve_options(&cli(&[]), &config);
        assert_eq!(options, config.backdrop_options());
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
        assert!(load_config(None).is_ok());
    }

    #[test]
    fn still_export_writes_png() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let target = dir.path().join("frames").join("still.png");
        let args = cli(&[
            "--size",
            "32x18",
            "--still-export",
            target.to_str().expect("utf-8 path"),
        ]);
        run(args, HostConfig::default()).expect("export");
        assert!(target.exists());
    }
}
