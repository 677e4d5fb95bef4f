use anyhow::{Context, Result};
use std::path::PathBuf;

pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub(crate) const DEFAULT_LOG_FILTER: &str = "warn";

/// Classifier settings read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct AiConfig {
    /// `AI_MOCK=1` or `AI_DEMO=1`: never touch the network.
    pub(crate) mock: bool,
    pub(crate) api_key: Option<String>,
    pub(crate) model: String,
    pub(crate) base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            mock: false,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

// Keeps the key out of logs and panic output.
impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("mock", &self.mock)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Config {
    pub(crate) ai: AiConfig,
    /// `FINSORT_DB`; `None` means the per-user data directory.
    pub(crate) db_path: Option<PathBuf>,
    /// `FINSORT_LOG`, an `EnvFilter` directive.
    pub(crate) log_filter: Option<String>,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| get(key).as_deref() == Some("1");

        Self {
            ai: AiConfig {
                mock: flag("AI_MOCK") || flag("AI_DEMO"),
                api_key: get("OPENAI_API_KEY"),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
            db_path: get("FINSORT_DB").map(PathBuf::from),
            log_filter: get("FINSORT_LOG"),
        }
    }

    pub(crate) fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Explicit path wins, then `FINSORT_DB`, then the data directory.
    pub(crate) fn resolve_db_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        match explicit.or_else(|| self.db_path.clone()) {
            Some(path) => Ok(path),
            None => default_db_path(),
        }
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "finsort", "Finsort")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("finsort.db"))
}
