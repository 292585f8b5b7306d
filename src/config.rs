use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub theme: String,
    pub dark: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            theme: "Default".to_string(),
            dark: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("novelway").required(false))
            .build()?;
        s.try_deserialize()
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string(self)?;
        std::fs::write("novelway.toml", toml)?;
        Ok(())
    }

    /// Base URL with trailing slashes stripped; request paths are joined
    /// with exactly one slash.
    pub fn base_url(&self) -> String {
        self.api_base_url.trim_end_matches('/').to_string()
    }
}
