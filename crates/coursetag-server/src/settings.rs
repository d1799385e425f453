//! Runtime configuration for the server binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `COURSETAG_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:         String,
  #[serde(default = "default_port")]
  pub port:         u16,
  pub store_path:   PathBuf,
  /// Shared secret mixed into every daily token.
  pub token_secret: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Load from an optional TOML file at `path`, then the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("COURSETAG"))
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn loads_toml_and_fills_defaults() {
    let dir = std::env::temp_dir().join(format!("coursetag-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "store_path = \"/var/lib/coursetag.db\"").unwrap();
    writeln!(file, "token_secret = \"hunter2\"").unwrap();
    drop(file);

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/coursetag.db"));
    assert_eq!(cfg.token_secret, "hunter2");

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn missing_secret_is_an_error() {
    let path = std::env::temp_dir().join("coursetag-config-does-not-exist.toml");
    // Only fails if the environment doesn't supply the fields either.
    if std::env::var("COURSETAG_TOKEN_SECRET").is_err() {
      assert!(ServerConfig::load(&path).is_err());
    }
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/data/store.db")),
      PathBuf::from(home).join("data/store.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
