//! Configuration types and loading.
//!
//! Config is loaded from a file named `config` (`config.json`, `config.yaml` or `config.yml`)
//! in the working directory, or from an explicit path. Keys are `KeybaseBin`, `ListenAddress`,
//! and `Webhooks` (a list of `{ "Token", "Team" }`), matched without regard to ASCII case, so
//! `listenaddress` and `webhooks: [{token, team}]` load the same. Any other key is an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names searched, in order, when no explicit config path is given.
const CONFIG_FILE_CANDIDATES: &[&str] = &["config.json", "config.yaml", "config.yml"];

/// Canonical spelling of every config key; file keys are folded onto these before decoding.
const CONFIG_KEYS: &[&str] = &["KeybaseBin", "ListenAddress", "Webhooks", "Token", "Team"];

/// Top-level application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Config {
    /// Keybase binary used to start the chat session (default "keybase", resolved via PATH).
    #[serde(default = "default_keybase_bin")]
    pub keybase_bin: String,

    /// Listen address for the webhook server (default ":8080"). An empty host binds all interfaces.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Registered webhooks, in precedence order.
    #[serde(default)]
    pub webhooks: Vec<WebhookRegistration>,
}

/// A configured pairing of a secret token and a destination team.
///
/// Tokens are not required to be unique: when several registrations share a token the first
/// one in configured order handles the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct WebhookRegistration {
    pub token: String,
    pub team: String,
}

fn default_keybase_bin() -> String {
    "keybase".to_string()
}

fn default_listen_address() -> String {
    ":8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keybase_bin: default_keybase_bin(),
            listen_address: default_listen_address(),
            webhooks: Vec::new(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the Keybase binary: env HOOKRELAY_KEYBASE_BIN overrides config.
pub fn resolve_keybase_bin(config: &Config) -> String {
    non_empty_env("HOOKRELAY_KEYBASE_BIN").unwrap_or_else(|| {
        let b = config.keybase_bin.trim();
        if b.is_empty() {
            default_keybase_bin()
        } else {
            b.to_string()
        }
    })
}

/// Resolve the listen address: env HOOKRELAY_LISTEN_ADDRESS overrides config.
pub fn resolve_listen_address(config: &Config) -> String {
    non_empty_env("HOOKRELAY_LISTEN_ADDRESS")
        .unwrap_or_else(|| config.listen_address.trim().to_string())
}

/// Turn a listen address into something `TcpListener::bind` accepts.
/// `":8080"` (empty host) binds every interface; an empty string falls back to the default port.
pub fn bind_addr(listen_address: &str) -> String {
    let a = listen_address.trim();
    if a.is_empty() {
        return bind_addr(&default_listen_address());
    }
    match a.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => a.to_string(),
    }
}

/// Generate a fresh random token for a new webhook registration.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Resolve config path: env HOOKRELAY_CONFIG_PATH, else [`find_config_in`] for `dir`.
pub fn default_config_path_in(dir: &Path) -> PathBuf {
    if let Ok(p) = std::env::var("HOOKRELAY_CONFIG_PATH") {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    find_config_in(dir)
}

/// First existing `config.json`, `config.yaml` or `config.yml` in `dir`.
/// When nothing exists the JSON candidate is returned so the error names a concrete file.
pub fn find_config_in(dir: &Path) -> PathBuf {
    CONFIG_FILE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
        .unwrap_or_else(|| dir.join(CONFIG_FILE_CANDIDATES[0]))
}

/// [`default_config_path_in`] for the current working directory.
pub fn default_config_path() -> PathBuf {
    default_config_path_in(Path::new("."))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Rewrite object keys that match a [`CONFIG_KEYS`] entry ignoring ASCII case to that entry.
fn fold_key_case(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let key = CONFIG_KEYS
                        .iter()
                        .find(|c| c.eq_ignore_ascii_case(&k))
                        .map(|c| c.to_string())
                        .unwrap_or(k);
                    (key, fold_key_case(v))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_key_case).collect()),
        other => other,
    }
}

/// Parse config text; YAML when `path` has a `.yaml`/`.yml` extension, JSON otherwise.
pub fn parse_config(path: &Path, s: &str) -> Result<Config> {
    let raw: serde_json::Value = if is_yaml(path) {
        serde_yaml::from_str(s).with_context(|| format!("parsing config from {}", path.display()))?
    } else {
        serde_json::from_str(s).with_context(|| format!("parsing config from {}", path.display()))?
    };
    serde_json::from_value(fold_key_case(raw))
        .with_context(|| format!("parsing config from {}", path.display()))
}

/// Load config from `path` or the default location. A missing file is an error: the relay
/// has nothing to route without registrations.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    if !path.exists() {
        anyhow::bail!(
            "config file not found: {} (run `hookrelay init` to create one)",
            path.display()
        );
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let config = parse_config(&path, &s)?;
    log::debug!(
        "loaded config from {} ({} webhook(s))",
        path.display(),
        config.webhooks.len()
    );
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hookrelay-{}-{}", tag, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_when_keys_missing() {
        let config = parse_config(Path::new("config.json"), "{}").unwrap();
        assert_eq!(config.keybase_bin, "keybase");
        assert_eq!(config.listen_address, ":8080");
        assert!(config.webhooks.is_empty());
    }

    #[test]
    fn parses_json_webhooks_in_order() {
        let s = r#"{
            "KeybaseBin": "/usr/bin/keybase",
            "ListenAddress": "127.0.0.1:9000",
            "Webhooks": [
                { "Token": "abc", "Team": "first" },
                { "Token": "abc", "Team": "second" },
                { "Token": "xyz", "Team": "third" }
            ]
        }"#;
        let config = parse_config(Path::new("config.json"), s).unwrap();
        assert_eq!(config.keybase_bin, "/usr/bin/keybase");
        assert_eq!(config.listen_address, "127.0.0.1:9000");
        let teams: Vec<&str> = config.webhooks.iter().map(|w| w.team.as_str()).collect();
        assert_eq!(teams, ["first", "second", "third"]);
    }

    #[test]
    fn parses_yaml_by_extension() {
        let s = "ListenAddress: \":9090\"\nWebhooks:\n  - Token: t1\n    Team: ops\n";
        let config = parse_config(Path::new("config.yml"), s).unwrap();
        assert_eq!(config.listen_address, ":9090");
        assert_eq!(
            config.webhooks,
            vec![WebhookRegistration {
                token: "t1".to_string(),
                team: "ops".to_string(),
            }]
        );
    }

    #[test]
    fn keys_match_regardless_of_case() {
        let s = "listenaddress: \":9090\"\nwebhooks:\n  - token: t1\n    team: ops\n";
        let config = parse_config(Path::new("config.yaml"), s).unwrap();
        assert_eq!(config.listen_address, ":9090");
        assert_eq!(
            config.webhooks,
            vec![WebhookRegistration {
                token: "t1".to_string(),
                team: "ops".to_string(),
            }]
        );

        let s = r#"{"keybaseBin": "/opt/kb", "WEBHOOKS": [{"TOKEN": "a", "team": "dev"}]}"#;
        let config = parse_config(Path::new("config.json"), s).unwrap();
        assert_eq!(config.keybase_bin, "/opt/kb");
        assert_eq!(config.webhooks[0].token, "a");
        assert_eq!(config.webhooks[0].team, "dev");
    }

    #[test]
    fn unknown_keys_are_an_error() {
        let err = parse_config(Path::new("config.json"), r#"{"Hooks": []}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("Hooks"));

        let s = "Webhooks:\n  - Token: t1\n    Teams: ops\n";
        assert!(parse_config(Path::new("config.yaml"), s).is_err());
    }

    #[test]
    fn bad_json_is_an_error() {
        let err = parse_config(Path::new("config.json"), "{ not json").unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn bind_addr_fills_empty_host() {
        assert_eq!(bind_addr(":8080"), "0.0.0.0:8080");
        assert_eq!(bind_addr("127.0.0.1:9000"), "127.0.0.1:9000");
        assert_eq!(bind_addr("  "), "0.0.0.0:8080");
    }

    #[test]
    fn load_config_missing_file_fails() {
        let path = std::env::temp_dir()
            .join(format!("hookrelay-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let err = load_config(Some(path)).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_config_reads_file() {
        let dir = std::env::temp_dir().join(format!("hookrelay-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"Webhooks":[{"Token":"t","Team":"dev"}]}"#).unwrap();
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.webhooks.len(), 1);
        assert_eq!(config.webhooks[0].team, "dev");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn config_search_order() {
        let dir = temp_dir("search");
        assert_eq!(find_config_in(&dir), dir.join("config.json"));

        std::fs::write(dir.join("config.yml"), "").unwrap();
        assert_eq!(find_config_in(&dir), dir.join("config.yml"));

        std::fs::write(dir.join("config.yaml"), "").unwrap();
        assert_eq!(find_config_in(&dir), dir.join("config.yaml"));

        std::fs::write(dir.join("config.json"), "{}").unwrap();
        assert_eq!(find_config_in(&dir), dir.join("config.json"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn blank_keybase_bin_falls_back_to_default() {
        std::env::remove_var("HOOKRELAY_KEYBASE_BIN");
        for bin in ["", "   "] {
            let config = Config {
                keybase_bin: bin.to_string(),
                ..Config::default()
            };
            assert_eq!(resolve_keybase_bin(&config), "keybase");
        }
        let config = Config {
            keybase_bin: " /opt/kb ".to_string(),
            ..Config::default()
        };
        assert_eq!(resolve_keybase_bin(&config), "/opt/kb");
    }

    #[test]
    #[serial]
    fn env_overrides_config() {
        let config = Config {
            keybase_bin: "/from/config".to_string(),
            listen_address: "127.0.0.1:7000".to_string(),
            webhooks: Vec::new(),
        };

        std::env::set_var("HOOKRELAY_KEYBASE_BIN", "/from/env");
        std::env::set_var("HOOKRELAY_LISTEN_ADDRESS", ":9999");
        assert_eq!(resolve_keybase_bin(&config), "/from/env");
        assert_eq!(resolve_listen_address(&config), ":9999");

        // Blank env values do not count as set.
        std::env::set_var("HOOKRELAY_KEYBASE_BIN", "  ");
        std::env::set_var("HOOKRELAY_LISTEN_ADDRESS", "");
        assert_eq!(resolve_keybase_bin(&config), "/from/config");
        assert_eq!(resolve_listen_address(&config), "127.0.0.1:7000");

        std::env::remove_var("HOOKRELAY_KEYBASE_BIN");
        std::env::remove_var("HOOKRELAY_LISTEN_ADDRESS");
        assert_eq!(resolve_keybase_bin(&config), "/from/config");
        assert_eq!(resolve_listen_address(&config), "127.0.0.1:7000");

        let dir = temp_dir("env-path");
        std::fs::write(dir.join("config.yaml"), "").unwrap();
        let explicit = dir.join("elsewhere.json");
        std::env::set_var("HOOKRELAY_CONFIG_PATH", &explicit);
        assert_eq!(default_config_path_in(&dir), explicit);
        std::env::set_var("HOOKRELAY_CONFIG_PATH", " ");
        assert_eq!(default_config_path_in(&dir), dir.join("config.yaml"));
        std::env::remove_var("HOOKRELAY_CONFIG_PATH");
        assert_eq!(default_config_path_in(&dir), dir.join("config.yaml"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn generated_tokens_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
