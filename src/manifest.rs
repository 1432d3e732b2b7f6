//! Configuration file parsing for jailbind
//!
//! Parses a TOML file with optional `create` defaults and `[[param]]`
//! extensions to the parameter allow-list.

use crate::error::{Error, Result};
use crate::jail::{JailOptions, ParamKind, ParamRegistry};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Load configuration from a file
pub fn load(path: &Path) -> Result<BindConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: BindConfig = toml::from_str(&content)?;
    config.validate()?;

    Ok(config)
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindConfig {
    /// Defaults for jail creation
    #[serde(default)]
    pub create: Option<JailOptions>,

    /// Extra parameters accepted by jail_set/jail_get
    #[serde(default, rename = "param")]
    pub params: Vec<ParamSpec>,
}

/// One allow-list extension
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
}

impl BindConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(create) = &self.create {
            create
                .validate()
                .map_err(|e| Error::ConfigValidation(format!("[create]: {}", e)))?;
        }
        self.registry()?;
        Ok(())
    }

    /// Built-in allow-list plus the configured extensions
    pub fn registry(&self) -> Result<ParamRegistry> {
        self.params
            .iter()
            .try_fold(ParamRegistry::builtin(), |registry, spec| {
                registry
                    .with_param(spec.name.as_str(), spec.kind)
                    .map_err(|e| Error::ConfigValidation(format!("[[param]] '{}': {}", spec.name, e)))
            })
    }

    /// Install the allow-list process-wide
    pub fn install(&self) -> Result<()> {
        self.registry()?.install()
    }
}
