use super::{
    features::FeaturesConfig, importance::ImportanceConfig, labeling::LabelingConfig,
    sampling::SamplingConfig, traits::ConfigSection,
};
use crate::error::{EventlabError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

const ENV_PREFIX: &str = "EVENTLAB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub sampling: SamplingConfig,
    pub labeling: LabelingConfig,
    pub features: FeaturesConfig,
    pub importance: ImportanceConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        validate_section(&self.sampling)?;
        validate_section(&self.labeling)?;
        validate_section(&self.features)?;
        validate_section(&self.importance)?;
        Ok(())
    }

    /// Parse a TOML document on its own, without environment overrides
    pub fn from_toml(contents: &str) -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()
            .map_err(|e| EventlabError::Configuration(format!("Malformed TOML: {}", e)))?;
        let config = deserialize(source)?;
        config.validate()?;
        Ok(config)
    }
}

/// Unknown keys and unsupported values are configuration errors
fn deserialize(source: config::Config) -> Result<AppConfig> {
    source
        .try_deserialize()
        .map_err(|e| EventlabError::Configuration(e.to_string()))
}

fn validate_section<S: ConfigSection>(section: &S) -> Result<()> {
    section.validate().map_err(|e| match e {
        EventlabError::Configuration(msg) => {
            EventlabError::Configuration(format!("[{}] {}", S::section_name(), msg))
        }
        other => other,
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML file; `EVENTLAB__<SECTION>__<KEY>` variables override it
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let source = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config = deserialize(source)?;

        config.validate()?;
        log::info!("Loaded configuration from {}", path.as_ref().display());

        *self.write()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.read()?;
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| EventlabError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig> {
        Ok(self.read()?.clone())
    }

    /// Apply `f` and keep the result only if it still validates
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, AppConfig>> {
        self.config
            .read()
            .map_err(|_| EventlabError::Configuration("Configuration lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>> {
        self.config
            .write()
            .map_err(|_| EventlabError::Configuration("Configuration lock poisoned".to_string()))
    }
}
