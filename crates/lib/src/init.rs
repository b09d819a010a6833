//! Initialize a config file with defaults and an empty webhook list.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{self, Config};

/// Write a default config to `config_path` if it does not exist. YAML is written when the
/// path has a `.yaml`/`.yml` extension, JSON otherwise.
/// Returns `true` when a file was created.
pub fn init_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        log::debug!("config already exists at {}, skipping", config_path.display());
        return Ok(false);
    }
    if let Some(dir) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let config = Config::default();
    let text = if matches!(
        config_path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    ) {
        serde_yaml::to_string(&config).context("serializing default config")?
    } else {
        serde_json::to_string_pretty(&config).context("serializing default config")? + "\n"
    };
    std::fs::write(config_path, text)
        .with_context(|| format!("writing default config to {}", config_path.display()))?;
    log::info!("created default config at {}", config_path.display());
    // Round-trip so a broken template fails here rather than at `serve`.
    config::load_config(Some(config_path.to_path_buf()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hookrelay-init-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn writes_loadable_json_once() {
        let dir = temp_dir();
        let path = dir.join("config.json");
        assert!(init_config(&path).unwrap());
        let (config, _) = config::load_config(Some(path.clone())).unwrap();
        assert_eq!(config.listen_address, ":8080");
        assert!(config.webhooks.is_empty());

        std::fs::write(&path, r#"{"Webhooks":[{"Token":"t","Team":"x"}]}"#).unwrap();
        assert!(!init_config(&path).unwrap());
        let (config, _) = config::load_config(Some(path)).unwrap();
        assert_eq!(config.webhooks.len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn writes_yaml_for_yaml_extension() {
        let dir = temp_dir();
        let path = dir.join("config.yaml");
        assert!(init_config(&path).unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("KeybaseBin: keybase"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
