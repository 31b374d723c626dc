use super::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from file or return defaults
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

/// Load configuration from `config_path`, creating its directory when the file is missing
pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;
        Ok(config)
    } else {
        // Create default config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Config::default())
    }
}

/// Get the path to the config file
fn get_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "promptsmith")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.config/promptsmith/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "deepseek");
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.ui.theme, "dark");
    }

    #[test]
    fn test_missing_file_gives_defaults_and_creates_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.llm.api_key_env, "DEEPSEEK_API_KEY");
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[llm]
provider = "anthropic"
api_key_env = "ANTHROPIC_API_KEY"
model = "claude-sonnet-4-5-20250929"

[retry]
retries = 4

[store]
path = "~/prompts/sessions.db"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.retry.retries, 4);
        assert_eq!(config.retry.backoff_factor, 1.5);
        assert!(config.ui.show_suggestions);
        assert!(!config
            .store
            .resolved_path()
            .to_string_lossy()
            .starts_with('~'));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nprovider=").unwrap();
        assert!(load_config_from(&path).is_err());
    }
}
