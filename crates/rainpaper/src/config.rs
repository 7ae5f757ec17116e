use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "rainpaper.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk settings. Every field has a default so a missing or empty file
/// behaves exactly like no file at all.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Fragment shader rendered as the wallpaper.
    pub shader: Option<PathBuf>,
    /// Background media installed before the first frame.
    pub media: Option<PathBuf>,
    /// Window size in pixels.
    pub size: (u32, u32),
    /// Target frame rate.
    pub fps: f32,
    /// Display scale multiplied onto the device pixel ratio.
    pub scale: f32,
    /// Pointer parallax strength.
    pub parallax: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shader: None,
            media: None,
            size: (1920, 1080),
            fps: 30.0,
            scale: 1.0,
            parallax: 1.0,
        }
    }
}

impl AppConfig {
    /// Loads settings from `path`, or from the per-user config directory
    /// when no explicit path is given. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rainpaper")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "fps = 60.0\nshader = \"rain.frag\"\n").expect("write");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.shader.as_deref(), Some(Path::new("rain.frag")));
        assert_eq!(config.size, (1920, 1080));
        assert_eq!(config.parallax, 1.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "mystery = true\n").expect("write");

        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
