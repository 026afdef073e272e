use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::canvas::{CanvasSize, Rgb};

/// A defect in the configuration or in a zone definition. Always fatal at
/// startup; the reconciliation loop never starts with a bad config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode template image {}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("zone {name:?}: {reason}")]
    Zone { name: String, reason: String },
    #[error("{0}")]
    Invalid(String),
}

fn default_base_url() -> String {
    "https://pixels.pythondiscord.com".to_string()
}

fn default_zones_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_assumed_size() -> CanvasSize {
    CanvasSize { width: 160, height: 90 }
}

fn default_blank_colour() -> Rgb {
    Rgb::WHITE
}

fn default_refresh_stride() -> u32 {
    2
}

fn default_canvas_log() -> Option<PathBuf> {
    Some(PathBuf::from("canvas.log"))
}

fn default_mirror_interval() -> u64 {
    60
}

fn default_mirror_scale() -> u32 {
    5
}

/// Settings for the Discord webhook mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    pub webhook_url: String,
    /// Id of the webhook message to keep editing. Created on first run when
    /// absent.
    #[serde(default)]
    pub message_id: Option<u64>,
    #[serde(default = "default_mirror_interval")]
    pub interval_secs: u64,
    /// Nearest-neighbor upscale factor applied before posting.
    #[serde(default = "default_mirror_scale")]
    pub scale: u32,
}

/// Everything the process needs, validated once at load time.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Opaque bearer token attached to every request.
    pub token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Directory holding the zone definition files.
    #[serde(default = "default_zones_dir")]
    pub zones_dir: PathBuf,
    /// Used when the backend cannot report its canvas size.
    #[serde(default = "default_assumed_size")]
    pub assumed_size: CanvasSize,
    /// Substituted for reads while an endpoint is temporarily gone.
    #[serde(default = "default_blank_colour")]
    pub blank_colour: Rgb,
    /// Live pixels of this colour are never overwritten.
    #[serde(default)]
    pub protected_colour: Option<Rgb>,
    /// Once a row has needed a repair, re-read the live canvas every this
    /// many columns instead of trusting the snapshot.
    #[serde(default = "default_refresh_stride")]
    pub refresh_stride: u32,
    /// Append-only audit log of every canvas snapshot fetch. `null` disables.
    #[serde(default = "default_canvas_log")]
    pub canvas_log: Option<PathBuf>,
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("token must not be empty".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        if self.refresh_stride == 0 {
            return Err(ConfigError::Invalid(
                "refresh_stride must be at least 1".to_string(),
            ));
        }
        if let Some(mirror) = &self.mirror {
            if mirror.interval_secs == 0 {
                return Err(ConfigError::Invalid(
                    "mirror.interval_secs must be at least 1".to_string(),
                ));
            }
            if mirror.scale == 0 {
                return Err(ConfigError::Invalid(
                    "mirror.scale must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("test.json"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(config.base_url, "https://pixels.pythondiscord.com");
        assert_eq!(config.zones_dir, PathBuf::from("images"));
        assert_eq!(config.assumed_size, CanvasSize { width: 160, height: 90 });
        assert_eq!(config.blank_colour, Rgb::WHITE);
        assert_eq!(config.protected_colour, None);
        assert_eq!(config.refresh_stride, 2);
        assert_eq!(config.canvas_log, Some(PathBuf::from("canvas.log")));
        assert!(config.mirror.is_none());
    }

    #[test]
    fn colours_parse_from_hex_strings() {
        let config = parse(
            r#"{"token": "abc", "blank_colour": "000000", "protected_colour": "ff00ff"}"#,
        )
        .unwrap();
        assert_eq!(config.blank_colour, Rgb::BLACK);
        assert_eq!(config.protected_colour, Some(Rgb::new(0xff, 0, 0xff)));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = parse(r#"{}"#).unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn empty_token_is_an_error() {
        assert!(parse(r#"{"token": "  "}"#).is_err());
    }

    #[test]
    fn zero_refresh_stride_is_an_error() {
        let err = parse(r#"{"token": "abc", "refresh_stride": 0}"#).unwrap_err();
        assert!(err.to_string().contains("refresh_stride"));
    }

    #[test]
    fn mirror_section_is_validated() {
        assert!(parse(
            r#"{"token": "abc", "mirror": {"webhook_url": "https://example.invalid", "scale": 0}}"#
        )
        .is_err());
    }
}
