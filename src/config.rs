//! declgen configuration
//!
//! Handles loading of `declgen.yaml` and merging command-line overrides.
//! Every key has a default, so an empty or missing file is a valid
//! configuration.

use crate::declaration::ArtifactKind;
use crate::error::{Error, Result};
use crate::model::ModelOptions;
use crate::util::to_snake_case;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the declaration inputs
pub const CONFIG_FILE: &str = "declgen.yaml";

/// Project configuration (`declgen.yaml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory generated units are written to, relative to the config file
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Names of generated types and files
    #[serde(default)]
    pub naming: NamingConfig,

    /// Largest parameter count a cached method may have
    #[serde(default = "default_max_cache_arity")]
    pub max_cache_arity: usize,

    /// Pretty-print generated code
    #[serde(default = "default_true")]
    pub auto_format: bool,

    /// Prepend source file, declaration and hash to each unit
    #[serde(default = "default_true")]
    pub provenance: bool,

    /// Worker threads; 1 generates sequentially
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Path generated code uses to reach the runtime support module
    #[serde(default = "default_runtime_path")]
    pub runtime_path: String,
}

/// Longest tuple with `Hash` and `Eq`, so the widest possible cache key
pub const CACHE_ARITY_LIMIT: usize = 12;

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_max_cache_arity() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_jobs() -> usize {
    1
}

fn default_runtime_path() -> String {
    "::declgen::runtime".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            naming: NamingConfig::default(),
            max_cache_arity: default_max_cache_arity(),
            auto_format: true,
            provenance: true,
            jobs: default_jobs(),
            runtime_path: default_runtime_path(),
        }
    }
}

/// Naming convention for generated types and files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NamingConfig {
    #[serde(default = "default_subclass_suffix")]
    pub subclass_suffix: String,

    #[serde(default = "default_builder_suffix")]
    pub builder_suffix: String,

    #[serde(default = "default_converter_suffix")]
    pub converter_suffix: String,

    /// File pattern: {snake}, {name}, {declaration}, {kind}
    #[serde(default = "default_file_pattern")]
    pub file: String,
}

fn default_subclass_suffix() -> String {
    "Subclass".to_string()
}

fn default_builder_suffix() -> String {
    "Builder".to_string()
}

fn default_converter_suffix() -> String {
    "Converter".to_string()
}

fn default_file_pattern() -> String {
    "{snake}.rs".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            subclass_suffix: default_subclass_suffix(),
            builder_suffix: default_builder_suffix(),
            converter_suffix: default_converter_suffix(),
            file: default_file_pattern(),
        }
    }
}

impl NamingConfig {
    pub fn suffix(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Subclass => &self.subclass_suffix,
            ArtifactKind::Builder => &self.builder_suffix,
            ArtifactKind::Converter => &self.converter_suffix,
        }
    }

    /// Type name of an artifact (`PointBuilder`)
    pub fn output_name(&self, declaration: &str, kind: ArtifactKind) -> String {
        format!("{}{}", declaration, self.suffix(kind))
    }

    /// File name of an artifact (`point_builder.rs`)
    pub fn file_name(&self, declaration: &str, kind: ArtifactKind) -> String {
        let output = self.output_name(declaration, kind);
        self.file
            .replace("{snake}", &to_snake_case(&output))
            .replace("{name}", &output)
            .replace("{declaration}", declaration)
            .replace("{kind}", &kind.to_string())
    }
}

/// Values given on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub auto_format: Option<bool>,
    pub provenance: Option<bool>,
    pub runtime_path: Option<String>,
}

impl Config {
    /// Parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        if config.output_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.output_dir = parent.join(&config.output_dir);
            }
        }
        Ok(config)
    }

    /// Load `declgen.yaml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let file = dir.join(CONFIG_FILE);
        if !file.exists() {
            return Ok(None);
        }
        Self::load(&file).map(Some)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_norway::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_cache_arity == 0 {
            return Err(Error::Config("max_cache_arity must be at least 1".into()));
        }
        if self.max_cache_arity > CACHE_ARITY_LIMIT {
            return Err(Error::Config(format!(
                "max_cache_arity must be at most {} but was {}",
                CACHE_ARITY_LIMIT, self.max_cache_arity
            )));
        }
        if self.jobs == 0 {
            return Err(Error::Config("jobs must be at least 1".into()));
        }
        if !self.naming.file.contains("{snake}")
            && !self.naming.file.contains("{name}")
            && !(self.naming.file.contains("{declaration}") && self.naming.file.contains("{kind}"))
        {
            return Err(Error::Config(format!(
                "naming.file `{}` does not give each artifact its own file",
                self.naming.file
            )));
        }
        Ok(())
    }

    /// Apply command-line values
    pub fn merge(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(jobs) = overrides.jobs {
            self.jobs = jobs;
        }
        if let Some(auto_format) = overrides.auto_format {
            self.auto_format = auto_format;
        }
        if let Some(provenance) = overrides.provenance {
            self.provenance = provenance;
        }
        if let Some(path) = &overrides.runtime_path {
            self.runtime_path = path.clone();
        }
        self.validate()?;
        Ok(self)
    }

    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            max_cache_arity: self.max_cache_arity.min(CACHE_ARITY_LIMIT),
            subclass_suffix: self.naming.subclass_suffix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("jobs: 4").unwrap().jobs, 4);
    }

    #[test]
    fn test_naming_pattern() {
        let naming = NamingConfig::default();
        assert_eq!(naming.output_name("Point", ArtifactKind::Builder), "PointBuilder");
        assert_eq!(naming.file_name("Point", ArtifactKind::Builder), "point_builder.rs");

        let custom = NamingConfig {
            file: "{declaration}/{kind}.rs".into(),
            ..NamingConfig::default()
        };
        assert_eq!(custom.file_name("HttpUrl", ArtifactKind::Subclass), "HttpUrl/subclass.rs");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_yaml("max_cache_arity: 0").is_err());
        assert_eq!(Config::from_yaml("max_cache_arity: 12").unwrap().max_cache_arity, 12);
        let err = Config::from_yaml("max_cache_arity: 13").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config error: max_cache_arity must be at most 12 but was 13"
        );
        assert!(Config::from_yaml("unknown_key: 1").is_err());
        assert!(Config::from_yaml("naming:\n  file: out.rs").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::from_yaml("jobs: 2\nauto_format: false")
            .unwrap()
            .merge(&ConfigOverrides {
                jobs: Some(8),
                ..ConfigOverrides::default()
            })
            .unwrap();
        assert_eq!(config.jobs, 8);
        assert!(!config.auto_format);
    }

    #[test]
    fn test_output_dir_is_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "output_dir: out\n").unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.output_dir, dir.path().join("out"));
        assert!(Config::load_from_dir(&dir.path().join("missing")).unwrap().is_none());
    }
}
