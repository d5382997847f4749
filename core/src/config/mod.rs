use crate::agent::PromptConfig;
use crate::agent::loop_::{DEFAULT_MAX_LOOPS, DEFAULT_TERMINATION_PHRASES};
use crate::agent::prompt::{DEFAULT_MAX_PROMPT_CHARS, DEFAULT_RECENT_RESULTS, DEFAULT_RESULT_CHARS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const SWEEP_DIR: &str = ".sweep";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_loops: usize,
    pub model_timeout_secs: u64,
    pub max_prompt_chars: usize,
    pub recent_results: usize,
    pub result_chars: usize,
    pub termination_phrases: Vec<String>,
    /// Paths and patterns that cleanup tools must never touch.
    pub whitelist: Vec<String>,
    /// Maximum number of entries a single scan reports.
    pub scan_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            max_loops: DEFAULT_MAX_LOOPS,
            model_timeout_secs: 120,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            recent_results: DEFAULT_RECENT_RESULTS,
            result_chars: DEFAULT_RESULT_CHARS,
            termination_phrases: DEFAULT_TERMINATION_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            whitelist: default_whitelist(),
            scan_limit: 200,
        }
    }
}

fn default_whitelist() -> Vec<String> {
    let mut whitelist = vec![
        "/bin".to_string(),
        "/boot".to_string(),
        "/etc".to_string(),
        "/usr".to_string(),
        "/System".to_string(),
        "C:\\Windows".to_string(),
        "*.git".to_string(),
    ];
    whitelist.push(get_sweep_dir().display().to_string());
    whitelist
}

impl Config {
    pub fn prompt_config(&self) -> PromptConfig {
        PromptConfig {
            max_chars: self.max_prompt_chars,
            recent_results: self.recent_results,
            result_chars: self.result_chars,
        }
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

pub fn get_sweep_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SWEEP_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_sweep_dir().join("config.toml")
}

pub fn ensure_sweep_dir() -> Result<PathBuf> {
    let sweep_dir = get_sweep_dir();

    if !sweep_dir.exists() {
        std::fs::create_dir_all(&sweep_dir).with_context(|| {
            format!("Failed to create sweep directory at {}", sweep_dir.display())
        })?;
    }

    Ok(sweep_dir)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("Config file not found. Run 'sweep onboard' to set up your configuration.")
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    anyhow::ensure!(config.max_loops > 0, "max_loops must be at least 1");
    anyhow::ensure!(
        config.model_timeout_secs > 0,
        "model_timeout_secs must be at least 1"
    );
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_sweep_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config = parse_config("provider = \"ollama\"\nmodel = \"qwen3\"\nmax_loops = 8\n").unwrap();
        assert_eq!(config.provider.as_deref(), Some("ollama"));
        assert_eq!(config.model, "qwen3");
        assert_eq!(config.max_loops, 8);
        assert_eq!(config.model_timeout_secs, 120);
        assert_eq!(config.max_prompt_chars, DEFAULT_MAX_PROMPT_CHARS);
        assert!(config.termination_phrases.iter().any(|p| p == "exit"));
    }

    #[test]
    fn zero_budgets_are_rejected() {
        assert!(parse_config("max_loops = 0").is_err());
        assert!(parse_config("model_timeout_secs = 0").is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config {
            whitelist: vec!["/home/me/keep".into()],
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    fn derived_engine_settings() {
        let config = Config {
            max_prompt_chars: 4_000,
            model_timeout_secs: 30,
            ..Config::default()
        };
        assert_eq!(config.prompt_config().max_chars, 4_000);
        assert_eq!(config.model_timeout(), Duration::from_secs(30));
    }
}
