use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Origin of the platform deployment, e.g. `https://basalt.example.dev`.
  /// The console talks to the REST API mounted under `/api` on it.
  pub url: String,
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./basalt.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/basalt/config.yaml
  ///
  /// The platform URL resolves as `url_override`, then `BASALT_URL`, then
  /// the config file; either of the first two is enough by itself when no
  /// file exists.
  pub fn load(explicit_path: Option<&Path>, url_override: Option<String>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config {
        api: ApiConfig { url: String::new() },
      },
    };

    if let Ok(url) = std::env::var("BASALT_URL") {
      config.api.url = url;
    }
    if let Some(url) = url_override {
      config.api.url = url;
    }

    if config.api.url.is_empty() {
      return Err(eyre!(
        "No platform URL configured. Create ~/.config/basalt/config.yaml or set BASALT_URL."
      ));
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("basalt.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("basalt").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_yaml_config() {
    let config: Config =
      serde_yaml::from_str("api:\n  url: https://basalt.example.dev\n").unwrap();
    assert_eq!(config.api.url, "https://basalt.example.dev");
  }

  #[test]
  fn test_yaml_without_url_is_rejected() {
    assert!(serde_yaml::from_str::<Config>("api: {}\n").is_err());
  }

  #[test]
  fn test_explicit_missing_path_errors() {
    let result = Config::load(Some(Path::new("/nonexistent/basalt.yaml")), None);
    assert!(result.is_err());
  }

  #[test]
  fn test_url_override_needs_no_config_file() {
    let config = Config::load(None, Some("https://basalt.example.dev".to_string())).unwrap();
    assert_eq!(config.api.url, "https://basalt.example.dev");
  }

  #[test]
  fn test_env_var_supplies_url_when_no_file() {
    std::env::set_var("BASALT_URL", "https://env.basalt.example.dev");
    let config = Config::load(None, None);
    std::env::remove_var("BASALT_URL");
    assert_eq!(config.unwrap().api.url, "https://env.basalt.example.dev");
  }
}
