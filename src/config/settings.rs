//! Configuration settings for Svar.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub agent: AgentSettings,
    pub records: RecordsSettings,
    pub calendar: CalendarSettings,
    pub analysis: AnalysisSettings,
    pub download: DownloadSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files (page image batches).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/svar".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Orchestration loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Chat model driving tool selection.
    pub model: String,
    /// Maximum completion passes per turn.
    pub max_iterations: usize,
    /// Wall-clock budget per turn, in seconds.
    pub turn_timeout_seconds: u64,
    /// Override for the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_iterations: 8,
            turn_timeout_seconds: 120,
            system_prompt: None,
        }
    }
}

/// Announcement record store settings. The API key comes from the
/// AIRTABLE_API_KEY environment variable, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsSettings {
    /// Base URL of the record store API.
    pub api_url: String,
    /// Base (workspace) identifier.
    pub base_id: String,
    /// Table holding the announcements.
    pub table: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for RecordsSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.airtable.com/v0".to_string(),
            base_id: String::new(),
            table: "Announcements".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Calendar webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Webhook endpoint for event search (GET).
    pub search_url: String,
    /// Webhook endpoint for event mutations (POST).
    pub mutate_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            search_url: String::new(),
            mutate_url: String::new(),
            timeout_seconds: 30,
        }
    }
}

/// Document analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Vision-capable model for document analysis.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Rasterization resolution for page images.
    pub dpi: u32,
    /// Response token cap for analysis calls.
    pub max_tokens: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 60,
            dpi: 100,
            max_tokens: 1000,
        }
    }
}

/// Attachment download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Directory downloaded attachments are written to.
    pub dir: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            dir: "/tmp/svar/downloads".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded download directory path.
    pub fn download_dir(&self) -> PathBuf {
        Self::expand_path(&self.download.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let settings = Settings::default();
        assert_eq!(settings.agent.model, "gpt-4o-mini");
        assert_eq!(settings.agent.max_iterations, 8);
        assert_eq!(settings.analysis.timeout_seconds, 60);
        assert_eq!(settings.records.table, "Announcements");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [agent]
            model = "gpt-4.1"
            max_iterations = 4

            [records]
            base_id = "appXYZ"
            "#,
        )
        .unwrap();

        assert_eq!(settings.agent.model, "gpt-4.1");
        assert_eq!(settings.agent.max_iterations, 4);
        assert_eq!(settings.records.base_id, "appXYZ");
        // Untouched sections keep their defaults
        assert_eq!(settings.agent.turn_timeout_seconds, 120);
        assert_eq!(settings.analysis.dpi, 100);
    }
}
