use serde::{Deserialize, Serialize};

use crate::error::{KinemaError, KinemaResult};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    /// Overrides the scene's first frame when set.
    pub frame_start: Option<u64>,
    /// Overrides the scene's end frame (exclusive) when set.
    pub frame_end: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output_dir: String,
    /// Emit content hashes alongside rendered frames.
    pub hash: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            hash: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String, // "error" | "warn" | "info" | "debug" | "trace"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KinemaConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KinemaConfig {
    pub fn from_toml_str(contents: &str) -> KinemaResult<Self> {
        toml::from_str(contents).map_err(|e| KinemaError::Config(e.to_string()))
    }

    pub fn load_from_file(path: &std::path::Path) -> KinemaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> KinemaResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| KinemaError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
