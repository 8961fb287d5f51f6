use serde::{Deserialize, Serialize};

/// Anti-aliasing policy for the backdrop pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

/// Declares how the compositor should treat the swapchain alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceAlpha {
    /// Frames fully cover the host without transparency.
    #[default]
    Opaque,
    /// Frames are cleared to transparent and blended by the compositor, so
    /// the host shows through while no frame has been drawn.
    Transparent,
}

/// Adapter selection hint forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPowerPreference {
    /// Prefer the integrated GPU; the backdrop is decorative.
    #[default]
    Low,
    High,
}

/// Options fixed at mount time.
///
/// Everything here is read once by [`crate::Backdrop::mount`]; changing the
/// effect at runtime is not supported, remount instead.
#[derive(Debug, Clone, PartialEq)]
pub struct BackdropOptions {
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Alpha behaviour of the drawable.
    pub surface_alpha: SurfaceAlpha,
    /// Adapter preference for the GPU context.
    pub power: GpuPowerPreference,
    /// Overrides the host's device pixel ratio when set.
    pub pixel_ratio: Option<f64>,
    /// Let pointer input fall through to whatever sits beneath the drawable.
    pub passthrough: bool,
}

impl Default for BackdropOptions {
    fn default() -> Self {
        Self {
            antialiasing: Antialiasing::default(),
            surface_alpha: SurfaceAlpha::default(),
            power: GpuPowerPreference::default(),
            pixel_ratio: None,
            passthrough: true,
        }
    }
}

/// Parses the textual anti-alias forms shared by the CLI and config file.
pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}
