use std::path::Path;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use crate::target::config::{AnchorConfig, MrcnnTargetConfig, RpnTargetConfig};

pub const ENV_PREFIX: &str = "TARGETS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Option<Logger>,
    pub anchors: AnchorConfig,
    pub rpn_target: RpnTargetConfig,
    pub mrcnn_target: MrcnnTargetConfig,
}

impl Settings {
    /// Loads settings from an optional TOML file, then `TARGETS__SECTION__KEY` environment
    /// overrides. Target parameters are validated before returning.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true));

        let settings: Settings = builder
            .build()
            .context("failed to read settings")?
            .try_deserialize()
            .context("failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .context("failed to parse settings")?
            .try_deserialize()
            .context("failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.rpn_target.validate().context("invalid rpn_target section")?;
        self.mrcnn_target.validate().context("invalid mrcnn_target section")?;
        Ok(())
    }

    pub fn log_level(&self) -> &str {
        self.logger.as_ref().map(|l| l.level.as_str()).unwrap_or("info")
    }
}
