use eyre::{Context, Result};
use folio::iteration::IterationSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub iteration: IterationConfig,
    pub git: GitConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub generation_temperature: f32,
    pub judge_temperature: f32,
    pub diff_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            timeout_ms: 300000,
            generation_temperature: 0.7,
            judge_temperature: 0.1,
            diff_temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    /// Unset means no cap; the operator decides when to stop
    pub max_attempts: Option<u32>,
    pub summary_max_chars: usize,
    pub preview_chars: usize,
    pub context_max_chars: usize,
    pub commit_feedback_chars: usize,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            summary_max_chars: 500,
            preview_chars: 100,
            context_max_chars: 20000,
            commit_feedback_chars: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub enabled: bool,
    /// Where to run git; defaults to the project directory
    pub repo_root: Option<PathBuf>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo_root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub trace_enabled: bool,
    pub trace_dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            trace_enabled: false,
            trace_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("folio")
                .join("debug"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            iteration: IterationConfig::default(),
            git: GitConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Default log filter; `RUST_LOG` still takes precedence
    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Coordinator settings for this configuration
    pub fn iteration_settings(&self) -> IterationSettings {
        IterationSettings {
            project_name: None,
            model: Some(self.llm.model.clone()),
            max_tokens: Some(self.llm.max_tokens),
            generation_temperature: self.llm.generation_temperature,
            judge_temperature: self.llm.judge_temperature,
            diff_temperature: self.llm.diff_temperature,
            max_attempts: self.iteration.max_attempts,
            summary_max_chars: self.iteration.summary_max_chars,
            preview_chars: self.iteration.preview_chars,
            context_max_chars: self.iteration.context_max_chars,
            commit_feedback_chars: self.iteration.commit_feedback_chars,
        }
    }
}
