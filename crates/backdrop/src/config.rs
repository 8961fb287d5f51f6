use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::types::{
    parse_antialias, Antialiasing, BackdropOptions, GpuPowerPreference, SurfaceAlpha,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings file for the desktop host.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_true")]
    pub passthrough: bool,
    /// Keep the window beneath other windows.
    #[serde(default = "default_true")]
    pub below: bool,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            passthrough: true,
            below: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    #[serde(
        default,
        deserialize_with = "deserialize_antialias_opt",
        skip_serializing
    )]
    pub antialias: Option<Antialiasing>,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub power: GpuPowerPreference,
    #[serde(default)]
    pub pixel_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    pub filter: Option<String>,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_title() -> String {
    "glitchwall".to_string()
}

fn default_true() -> bool {
    true
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<Antialiasing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

impl HostConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: HostConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if let Some(ratio) = self.render.pixel_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "render.pixel_ratio must be a positive number, got {ratio}"
                )));
            }
        }

        if let Some(filter) = self.log.filter.as_deref() {
            if filter.trim().is_empty() {
                return Err(ConfigError::Invalid("log.filter must not be empty".into()));
            }
        }

        Ok(())
    }

    /// Mount options described by this file.
    pub fn backdrop_options(&self) -> BackdropOptions {
        BackdropOptions {
            antialiasing: self.render.antialias.unwrap_or_default(),
            surface_alpha: if self.render.transparent {
                SurfaceAlpha::Transparent
            } else {
                SurfaceAlpha::Opaque
            },
            power: self.render.power,
            pixel_ratio: self.render.pixel_ratio,
            passthrough: self.window.passthrough,
        }
    }
}
