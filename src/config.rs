use std::path::Path;
use std::path::PathBuf;

use log::debug;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::MigrationJob;

/// Searched in order, relative to the working directory, when no path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "configs/migration-config.yaml",
    "migration-config.yaml",
    "../configs/migration-config.yaml",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repositories: Vec<MigrationJob>,
}

impl Config {
    /// Read, parse and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every job, stopping at the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repositories.is_empty() {
            return Err(ConfigError::NoJobs);
        }

        for (index, job) in self.repositories.iter().enumerate() {
            let label = if job.name.trim().is_empty() {
                format!("#{}", index + 1)
            } else {
                job.name.clone()
            };
            let invalid = |field: &'static str, reason: &str| ConfigError::Validation {
                job: label.clone(),
                field,
                reason: reason.to_string(),
            };

            if job.name.trim().is_empty() {
                return Err(invalid("name", "is required"));
            }
            for (field, value) in [
                ("sourceUrl", &job.source_url),
                ("destinationUrl", &job.destination_url),
            ] {
                if value.trim().is_empty() {
                    return Err(invalid(field, "is required"));
                }
                match url::Url::parse(value.trim()) {
                    Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => {}
                    Ok(_) => return Err(invalid(field, "has no host")),
                    Err(e) => return Err(invalid(field, &format!("is not a valid URL ({e})"))),
                }
            }
            if job.commit_message.trim().is_empty() {
                return Err(invalid("commitMessage", "is required"));
            }
        }

        Ok(())
    }

    /// Load the first of [`DEFAULT_CONFIG_PATHS`] that exists.
    pub fn find_default() -> Result<Self, ConfigError> {
        Self::find_in(Path::new("."))
    }

    /// Like [`Self::find_default`], resolving the paths against `base`.
    pub fn find_in(base: &Path) -> Result<Self, ConfigError> {
        let candidates: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(|p| base.join(p)).collect();
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound(candidates)),
        }
    }
}
