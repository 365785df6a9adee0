//! ---
//! acm_section: "01-core-functionality"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Shared configuration and tracing setup."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

/// Section holding permission rules.
pub const POLICY_SECTION: &str = "p";
/// Section holding grouping (role) rules.
pub const GROUPING_SECTION: &str = "g";

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for R-ACM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcmConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub model: ModelDefinition,
}

/// Metadata describing where an [`AcmConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAcmConfig {
    pub config: AcmConfig,
    pub source: PathBuf,
}

impl AcmConfig {
    pub const ENV_CONFIG_PATH: &str = "R_ACM_CONFIG";

    /// Load configuration from disk, respecting the `R_ACM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAcmConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAcmConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAcmConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Load and validate one configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AcmConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()
    }
}

impl std::str::FromStr for AcmConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AcmConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Declared rule types, keyed by section then rule type.
///
/// ```toml
/// [model.p.p]
/// tokens = ["sub", "obj", "act", "priority"]
///
/// [model.g.g]
/// tokens = ["_", "_", "_"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelDefinition {
    pub sections: IndexMap<String, IndexMap<String, AssertionDefinition>>,
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a rule type with the given field names.
    pub fn with_assertion<S: AsRef<str>>(self, section: &str, ptype: &str, tokens: &[S]) -> Self {
        self.with_definition(section, ptype, AssertionDefinition::new(tokens))
    }

    /// Declare a rule type from a prepared definition.
    pub fn with_definition(
        mut self,
        section: &str,
        ptype: &str,
        definition: AssertionDefinition,
    ) -> Self {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(ptype.to_owned(), definition);
        self
    }

    /// Iterate `(section, ptype, definition)` in declaration order.
    pub fn assertions(&self) -> impl Iterator<Item = (&str, &str, &AssertionDefinition)> {
        self.sections.iter().flat_map(|(section, ptypes)| {
            ptypes
                .iter()
                .map(move |(ptype, def)| (section.as_str(), ptype.as_str(), def))
        })
    }

    /// Number of declared rule types.
    pub fn len(&self) -> usize {
        self.sections.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(anyhow!("model must declare at least one rule type"));
        }
        for (section, ptype, def) in self.assertions() {
            if section.trim().is_empty() || ptype.trim().is_empty() {
                return Err(anyhow!("section and rule type names cannot be empty"));
            }
            def.validate(section, ptype)?;
        }
        Ok(())
    }
}

/// Field schema of one rule type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionDefinition {
    pub tokens: Vec<String>,
    /// Condition parameter names trailing the link fields of grouping rules.
    #[serde(default)]
    pub params: Vec<String>,
}

impl AssertionDefinition {
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.as_ref().to_owned()).collect(),
            params: Vec::new(),
        }
    }

    pub fn with_params<S: AsRef<str>>(mut self, params: &[S]) -> Self {
        self.params = params.iter().map(|p| p.as_ref().to_owned()).collect();
        self
    }

    pub fn validate(&self, section: &str, ptype: &str) -> Result<()> {
        if self.tokens.is_empty() {
            return Err(anyhow!("{section}.{ptype} must declare at least one field"));
        }
        if self.tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(anyhow!("{section}.{ptype} declares an empty field name"));
        }
        if section == GROUPING_SECTION {
            if self.tokens.len() < 2 {
                return Err(anyhow!(
                    "role definition {section}.{ptype} needs at least 2 fields"
                ));
            }
        } else {
            if !self.params.is_empty() {
                return Err(anyhow!(
                    "{section}.{ptype} declares condition params outside the grouping section"
                ));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = self.tokens.iter().find(|t| !seen.insert(t.as_str())) {
                return Err(anyhow!("{section}.{ptype} declares field `{dup}` twice"));
            }
        }
        Ok(())
    }
}

fn default_file_output() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Write the rolling JSON file next to stdout.
    #[serde(default = "default_file_output")]
    pub file_output: bool,
    /// Filter directive used when neither `R_ACM_LOG` nor `RUST_LOG` is set.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: default_file_output(),
            filter: None,
        }
    }
}
