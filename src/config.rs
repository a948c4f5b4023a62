use crate::analysis::AnalysisConfig;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default location of the configuration file
pub const CONFIG_FILE: &str = "config.toml";

/// Common configuration for both CLI and Web UI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Largest accepted upload, in megabytes
    pub max_file_size_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8574,
            max_file_size_mb: 50,
        }
    }
}

impl ServerConfig {
    pub fn max_file_size_bytes(&self) -> usize {
        let bytes = self.max_file_size_mb.saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

/// Load configuration from config.toml in the working directory
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from(Path::new(CONFIG_FILE))
}

/// Load configuration from the given file.
///
/// A missing file is not an error: the defaults are returned instead.
/// The analysis section is validated before it is handed out.
pub fn load_config_from(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    match File::open(path) {
        Ok(mut file) => {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let config = parse_config(&contents)?;
            tracing::debug!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No {} found, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(format!("Cannot open {}: {}", path.display(), e).into()),
    }
}

/// Load configuration from a file the user named explicitly.
///
/// Unlike [`load_config_from`], a missing file is an error.
pub fn load_config_file(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Configuration file not found: {}", path.display()).into());
    }
    load_config_from(path)
}

/// Parse and validate configuration text
pub fn parse_config(contents: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config: Config = toml::from_str(contents)?;
    config.analysis.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PeakLabeling;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert!(config.server.is_none());
    }

    #[test]
    fn test_partial_analysis_section() {
        let config = parse_config(
            r#"
            [analysis]
            refractory_period = 0.25
            peak_labeling = "alternating"

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.refractory_period, 0.25);
        assert_eq!(config.analysis.peak_labeling, PeakLabeling::Alternating);
        assert_eq!(config.analysis.fft_size, 2048);
        let server = config.server.unwrap();
        assert_eq!(server.port, 9000);
        assert_eq!(server.max_file_size_mb, 50);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_named_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confg.toml");
        assert!(load_config_file(&path).is_err());

        std::fs::write(&path, "[analysis]\nrefractory_period = 0.3\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.analysis.refractory_period, 0.3);
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        // A directory cannot be read as a configuration file
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_from(dir.path()).is_err());
    }

    #[test]
    fn test_huge_upload_limit_saturates() {
        let server = ServerConfig {
            port: 8574,
            max_file_size_mb: u64::MAX,
        };
        assert_eq!(server.max_file_size_bytes(), usize::MAX);
        assert_eq!(ServerConfig::default().max_file_size_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_analysis_section_is_rejected() {
        assert!(parse_config("[analysis]\nfft_size = 1000\n").is_err());
    }
}
