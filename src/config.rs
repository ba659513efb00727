// Configuration loading and parsing (advisor.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: StrategyConfig,
    pub rules: RulesConfig,
    pub llm: LlmConfig,
    pub credentials: CredentialsConfig,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// advisor.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire advisor.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AdvisorFile {
    strategy: StrategyConfig,
    #[serde(default)]
    rules: RulesConfig,
    llm: LlmConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// Which recommendation strategy the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyMode {
    Heuristic,
    Narrative,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub mode: StrategyMode,
    /// When the narrative strategy's upstream call fails, fall back to the
    /// heuristic strategy instead of propagating the error.
    #[serde(default)]
    pub fallback_to_heuristic: bool,
    /// Squad members below this form are transfer-out candidates.
    #[serde(default = "default_weak_form_threshold")]
    pub weak_form_threshold: f64,
    /// Market pool floor: only players at or above this form are considered.
    #[serde(default = "default_market_min_form")]
    pub market_min_form: f64,
    /// Maximum size of the market candidate pool.
    #[serde(default = "default_market_limit")]
    pub market_limit: usize,
    /// A replacement must beat the outgoing player's form by more than this.
    #[serde(default = "default_form_margin")]
    pub form_margin: f64,
    /// Largest point penalty the manager tolerates (<= 0).
    #[serde(default = "default_max_hit_budget")]
    pub max_hit_budget: i32,
}

fn default_weak_form_threshold() -> f64 {
    4.0
}

fn default_market_min_form() -> f64 {
    4.0
}

fn default_market_limit() -> usize {
    30
}

fn default_form_margin() -> f64 {
    1.0
}

fn default_max_hit_budget() -> i32 {
    -8
}

/// Season-rule policy knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// How many wildcards a manager gets per season. The official rule is
    /// believed to be two (one per half) but is kept configurable pending
    /// confirmation.
    #[serde(default = "default_wildcards_per_season")]
    pub wildcards_per_season: u8,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            wildcards_per_season: default_wildcards_per_season(),
        }
    }
}

fn default_wildcards_per_season() -> u8 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/advisor.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- advisor.toml (required) ---
    let advisor_path = config_dir.join("advisor.toml");
    let advisor_text = read_file(&advisor_path)?;
    let advisor_file: AdvisorFile =
        toml::from_str(&advisor_text).map_err(|e| ConfigError::ParseError {
            path: advisor_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        strategy: advisor_file.strategy,
        rules: advisor_file.rules,
        llm: advisor_file.llm,
        credentials,
        db_path: advisor_file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working
/// directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let strategy = &config.strategy;

    if strategy.weak_form_threshold <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "strategy.weak_form_threshold".into(),
            message: format!("must be > 0, got {}", strategy.weak_form_threshold),
        });
    }

    if strategy.market_min_form < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "strategy.market_min_form".into(),
            message: format!("must be >= 0, got {}", strategy.market_min_form),
        });
    }

    if strategy.market_limit == 0 {
        return Err(ConfigError::ValidationError {
            field: "strategy.market_limit".into(),
            message: "must be > 0".into(),
        });
    }

    if strategy.form_margin < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "strategy.form_margin".into(),
            message: format!("must be >= 0, got {}", strategy.form_margin),
        });
    }

    if strategy.max_hit_budget > 0 {
        return Err(ConfigError::ValidationError {
            field: "strategy.max_hit_budget".into(),
            message: format!("must be <= 0, got {}", strategy.max_hit_budget),
        });
    }

    if config.rules.wildcards_per_season == 0 {
        return Err(ConfigError::ValidationError {
            field: "rules.wildcards_per_season".into(),
            message: "must be > 0".into(),
        });
    }

    if config.llm.model.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.model".into(),
            message: "must not be empty".into(),
        });
    }

    if config.llm.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "llm.request_timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }

    if config.db_path.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_ADVISOR_TOML: &str = r#"
        [strategy]
        mode = "heuristic"
        fallback_to_heuristic = true

        [rules]
        wildcards_per_season = 2

        [llm]
        model = "claude-sonnet-4-5-20250929"
        max_tokens = 2000
        request_timeout_secs = 45

        [database]
        path = "advisor.db"
    "#;

    /// Helper: write config files under a fresh temp base dir and return it.
    fn write_config(name: &str, advisor: &str, credentials: Option<&str>) -> PathBuf {
        let base = std::env::temp_dir().join(format!(
            "fpl_advisor_config_{}_{name}",
            std::process::id(),
        ));
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("advisor.toml"), advisor).unwrap();
        if let Some(cred) = credentials {
            fs::write(config_dir.join("credentials.toml"), cred).unwrap();
        }
        base
    }

    #[test]
    fn load_valid_config() {
        let base = write_config("valid", VALID_ADVISOR_TOML, None);
        let config = load_config_from(&base).expect("should load valid config");

        assert_eq!(config.strategy.mode, StrategyMode::Heuristic);
        assert!(config.strategy.fallback_to_heuristic);
        assert!((config.strategy.weak_form_threshold - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.strategy.market_limit, 30);
        assert_eq!(config.rules.wildcards_per_season, 2);
        assert_eq!(config.llm.request_timeout_secs, 45);
        assert_eq!(config.db_path, "advisor.db");
        assert!(config.credentials.anthropic_api_key.is_none());

        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn credentials_are_optional() {
        let base = write_config(
            "credentials",
            VALID_ADVISOR_TOML,
            Some("anthropic_api_key = \"sk-ant-test\"\n"),
        );
        let config = load_config_from(&base).unwrap();
        assert_eq!(
            config.credentials.anthropic_api_key.as_deref(),
            Some("sk-ant-test")
        );
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn missing_advisor_file_is_not_found() {
        let base = std::env::temp_dir().join(format!(
            "fpl_advisor_missing_{}",
            std::process::id()
        ));
        fs::create_dir_all(base.join("config")).unwrap();

        let err = load_config_from(&base).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let base = write_config("malformed", "[strategy\nmode = broken", None);
        let err = load_config_from(&base).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn unknown_mode_is_parse_error() {
        let toml = VALID_ADVISOR_TOML.replace("\"heuristic\"", "\"oracle\"");
        let base = write_config("unknown_mode", &toml, None);
        let err = load_config_from(&base).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn positive_hit_budget_fails_validation() {
        let toml = VALID_ADVISOR_TOML.replace(
            "fallback_to_heuristic = true",
            "fallback_to_heuristic = true\nmax_hit_budget = 4",
        );
        let base = write_config("hit_budget", &toml, None);
        let err = load_config_from(&base).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "strategy.max_hit_budget");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let toml = VALID_ADVISOR_TOML.replace(
            "request_timeout_secs = 45",
            "request_timeout_secs = 0",
        );
        let base = write_config("zero_timeout", &toml, None);
        let err = load_config_from(&base).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let minimal = r#"
            [strategy]
            mode = "narrative"

            [llm]
            model = "claude-sonnet-4-5-20250929"

            [database]
            path = "advisor.db"
        "#;
        let base = write_config("defaults", minimal, None);
        let config = load_config_from(&base).unwrap();

        assert_eq!(config.strategy.mode, StrategyMode::Narrative);
        assert!(!config.strategy.fallback_to_heuristic);
        assert!((config.strategy.form_margin - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.strategy.max_hit_budget, -8);
        assert_eq!(config.rules.wildcards_per_season, 2);
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.llm.request_timeout_secs, 60);

        fs::remove_dir_all(&base).ok();
    }
}
