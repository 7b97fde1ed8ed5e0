use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_page_size() -> usize {
  5
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Items per page in list views
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  /// Custom title for the header (defaults to the API host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the tracker REST API, e.g. `http://localhost:8080`
  pub base_url: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./trak.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/trak/config.yaml
  /// 4. ~/.config/trak/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/trak/config.yaml\n\
                 with at least:\n\napi:\n  base_url: http://localhost:8080"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("trak.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("trak").join("config.yaml");
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

  /// Get the API token from environment variables.
  ///
  /// Checks TRAK_API_TOKEN first, then TRAK_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("TRAK_API_TOKEN")
      .or_else(|_| std::env::var("TRAK_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set TRAK_API_TOKEN or TRAK_TOKEN environment variable.")
      })
  }
}
