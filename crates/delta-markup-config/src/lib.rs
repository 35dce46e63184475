use delta_markup_engine::{ConvertOptions, Dom, FormatDescriptor, FormatSpec, FormatSpecError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid format in config: {0}")]
    InvalidFormat(#[from] FormatSpecError),
}

/// One `[[formats]]` table: the attribute name plus its descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFormat {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: FormatDescriptor,
}

/// Declarative conversion settings.
///
/// Formats are a list rather than a table so that declaration order, which
/// decides nesting and precedence, survives the round trip through TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_tag: Option<String>,
    #[serde(default)]
    pub formats: Vec<NamedFormat>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            log::debug!("no config at {}", config_path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        log::debug!(
            "loaded {} formats from {}",
            config.formats.len(),
            config_path.display()
        );
        Ok(Some(config))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn options(&self) -> ConvertOptions {
        self.block_tag
            .as_ref()
            .map(ConvertOptions::with_block_tag)
            .unwrap_or_default()
    }

    /// Validates every format and produces what `convert` needs.
    ///
    /// Custom formats cannot be expressed in TOML; register them on the
    /// returned spec with [`FormatSpec::custom`].
    pub fn into_spec<D: Dom>(self) -> Result<(FormatSpec<D>, ConvertOptions), ConfigError> {
        let options = self.options();
        let spec = FormatSpec::from_descriptors(
            self.formats
                .into_iter()
                .map(|format| (format.name, format.descriptor)),
        )?;
        Ok((spec, options))
    }
}
