use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations of the external tools and the default IPTC charset.
///
/// # Loading
///
/// ```rust,no_run
/// use image_metadata::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.exiv2 = "/usr/local/bin/exiv2".into();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// exiv2 binary, used to read metadata and to run command scripts.
    pub exiv2: PathBuf,
    /// jpegoptim binary, used to strip metadata.
    pub jpegoptim: PathBuf,
    /// Charset IPTC text is transcoded to on save.
    pub iptc_charset: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exiv2: PathBuf::from("/usr/bin/exiv2"),
            jpegoptim: PathBuf::from("/usr/bin/jpegoptim"),
            iptc_charset: "UTF-8".to_string(),
        }
    }
}

impl Config {
    /// Resolve the config file path: same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.exiv2, PathBuf::from("/usr/bin/exiv2"));
        assert_eq!(config.jpegoptim, PathBuf::from("/usr/bin/jpegoptim"));
        assert_eq!(config.iptc_charset, "UTF-8");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(dir.path().join("absent.json").as_path())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.exiv2 = PathBuf::from("/opt/exiv2/bin/exiv2");
        config.iptc_charset = "ISO-8859-1".to_string();
        config.save(Some(path.as_path())).unwrap();

        assert_eq!(Config::load(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"jpegoptim": "/usr/local/bin/jpegoptim"}"#).unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.jpegoptim, PathBuf::from("/usr/local/bin/jpegoptim"));
        assert_eq!(config.exiv2, PathBuf::from("/usr/bin/exiv2"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
