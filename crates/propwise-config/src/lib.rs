use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROPWISE_DIR_NAME: &str = ".propwise";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_SQLITE_FILE_NAME: &str = "preferences.sqlite";
pub const DEFAULT_JSON_FILE_NAME: &str = "learning.json";
pub const DEFAULT_MODE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_BUDGET_CEILING: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Json => "json",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Sqlite => DEFAULT_SQLITE_FILE_NAME,
            Self::Json => DEFAULT_JSON_FILE_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PropwiseConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Relative paths resolve against the `.propwise` directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_mode_threshold")]
    pub mode_threshold: f64,
    #[serde(default = "default_budget_ceiling")]
    pub budget_ceiling: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            mode_threshold: DEFAULT_MODE_THRESHOLD,
            budget_ceiling: DEFAULT_BUDGET_CEILING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LearningConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_floor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn propwise_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(PROPWISE_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    propwise_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn store_path(workspace_root: impl AsRef<Path>, store: &StoreConfig) -> PathBuf {
    let dir = propwise_dir(workspace_root);
    match store.path.as_deref() {
        Some(path) if Path::new(path).is_absolute() => PathBuf::from(path),
        Some(path) => dir.join(path),
        None => dir.join(store.backend.default_file_name()),
    }
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<PropwiseConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(PropwiseConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PropwiseConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<PropwiseConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(propwise_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = PropwiseConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &PropwiseConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let threshold = config.ranking.mode_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        warnings.push(ConfigWarning {
            code: "ranking_mode_threshold_out_of_range",
            message: format!(
                "ranking.mode_threshold = {threshold} is outside (0, 1]; single-criterion modes will never or always trigger"
            ),
        });
    }

    let ceiling = config.ranking.budget_ceiling;
    if !(ceiling.is_finite() && ceiling >= 1.0) {
        warnings.push(ConfigWarning {
            code: "ranking_budget_ceiling_below_budget",
            message: format!(
                "ranking.budget_ceiling = {ceiling} excludes listings priced at the budget itself"
            ),
        });
    }

    if let Some(floor) = config.learning.weight_floor {
        if !(floor.is_finite() && floor >= 0.0) {
            warnings.push(ConfigWarning {
                code: "learning_weight_floor_negative",
                message: format!(
                    "learning.weight_floor = {floor} does not prevent weights from inverting"
                ),
            });
        }
    }

    warnings
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_config(mut config: PropwiseConfig) -> PropwiseConfig {
    config.store.path = normalize_optional(config.store.path.take());
    config
}

fn default_mode_threshold() -> f64 {
    DEFAULT_MODE_THRESHOLD
}

fn default_budget_ceiling() -> f64 {
    DEFAULT_BUDGET_CEILING
}
