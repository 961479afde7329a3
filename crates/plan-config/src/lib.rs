#![deny(warnings)]

//! Configuration loading: fee profiles, funnel plans, automation rules and
//! plan-input documents.

use plan_core::{
    validate_plan_inputs, FeeProfileTable, FunnelPlanTable, PlanInputs, ValidationError,
};
use plan_rules::{AutomationRule, RuleError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ADPLAN_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Tables and rules the planner runs with.
///
/// Sections left out of a config file fall back to the built-in tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "FeeProfileTable::builtin")]
    pub fee_profiles: FeeProfileTable,
    #[serde(default = "FunnelPlanTable::builtin")]
    pub funnel_plans: FunnelPlanTable,
    #[serde(default)]
    pub rules: Vec<AutomationRule>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            fee_profiles: FeeProfileTable::builtin(),
            funnel_plans: FunnelPlanTable::builtin(),
            rules: Vec::new(),
        }
    }
}

impl PlannerConfig {
    /// Rules that would fail evaluation, with their index.
    pub fn rule_errors(&self) -> Vec<(usize, RuleError)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.compile().err().map(|e| (i, e)))
            .collect()
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<config>"),
            message: e.to_string(),
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_yaml<T: for<'de> Deserialize<'de>>(text: &str, path: &Path) -> Result<T, ConfigError> {
    serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse a YAML config document. An empty document yields the defaults.
pub fn config_from_str(text: &str) -> Result<PlannerConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(PlannerConfig::default());
    }
    parse_yaml(text, Path::new("<inline>"))
}

/// Load a YAML config file.
pub fn load_config(path: &Path) -> Result<PlannerConfig, ConfigError> {
    let text = read(path)?;
    if text.trim().is_empty() {
        return Ok(PlannerConfig::default());
    }
    let cfg: PlannerConfig = parse_yaml(&text, path)?;
    debug!(
        path = %path.display(),
        channels = cfg.fee_profiles.len(),
        plans = cfg.funnel_plans.len(),
        rules = cfg.rules.len(),
        "loaded config"
    );
    Ok(cfg)
}

/// Pick the config source: explicit path, then `env_path`, then built-ins.
pub fn resolve_config_from(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
) -> Result<PlannerConfig, ConfigError> {
    if let Some(p) = explicit {
        info!(path = %p.display(), "using config from flag");
        return load_config(p);
    }
    if let Some(p) = env_path.filter(|p| !p.as_os_str().is_empty()) {
        info!(path = %p.display(), "using config from {}", CONFIG_ENV);
        return load_config(&p);
    }
    info!("using built-in config");
    Ok(PlannerConfig::default())
}

/// [`resolve_config_from`] reading [`CONFIG_ENV`] from the environment.
pub fn resolve_config(explicit: Option<&Path>) -> Result<PlannerConfig, ConfigError> {
    resolve_config_from(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

/// Load plan inputs from a `.yaml`, `.yml` or `.json` file.
///
/// Negative amounts, negative rates and zero accounts are rejected with
/// [`ConfigError::Invalid`].
pub fn load_inputs(path: &Path) -> Result<PlanInputs, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let text = read(path)?;
    let inputs: PlanInputs = match ext.as_deref() {
        Some("yaml") | Some("yml") => parse_yaml(&text, path)?,
        Some("json") => serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };
    validate_plan_inputs(&inputs)?;
    Ok(inputs)
}
