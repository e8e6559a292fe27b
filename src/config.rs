use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR: &str = ".HeatmapTracker";
const CONFIG_FILE: &str = "config.json";
pub const ANY_ORIGIN: &str = "*";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_root_dir().join("db").join("clicks.db"),
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            allowed_origins: vec![ANY_ORIGIN.to_string()],
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        parse_host(&config.api_host)?;
        config.allowed_origins = config
            .allowed_origins
            .iter()
            .map(|origin| normalize_origin(origin))
            .collect::<Result<Vec<_>>>()?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(parse_host(&self.api_host)?, self.api_port))
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == ANY_ORIGIN)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("db_path must not be empty");
                }
                self.db_path = expand_home(trimmed);
            }
            "api_host" => {
                parse_host(value.trim())?;
                self.api_host = value.trim().to_string();
            }
            "api_port" => {
                self.api_port = value
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "allowed_origins" => {
                self.allowed_origins = parse_origin_list(value)?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, api_host|api.host, api_port|api.port, allowed_origins|cors.allowed_origins"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "api_host" => Some(self.api_host.clone()),
            "api_port" => Some(self.api_port.to_string()),
            "allowed_origins" => Some(self.allowed_origins.join(",")),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "api_host" | "api.host" => "api_host",
        "api_port" | "api.port" => "api_port",
        "allowed_origins" | "cors.allowed_origins" => "allowed_origins",
        _ => key,
    }
}

fn parse_host(value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid api_host: {value}. Example: 127.0.0.1 or 0.0.0.0"))
}

/// Parses a comma separated origin list. An empty value disables cross-origin access.
pub fn parse_origin_list(raw: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(normalize_origin)
        .collect()
}

/// Reduces an origin to `scheme://host[:port]`, or passes the wildcard through.
pub fn normalize_origin(raw: &str) -> Result<String> {
    if raw == ANY_ORIGIN {
        return Ok(ANY_ORIGIN.to_string());
    }

    let parsed = Url::parse(raw).with_context(|| {
        format!("Invalid origin: {raw}. Example: http://localhost:5173 or *")
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Origin must use http or https: {raw}");
    }
    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        bail!("Origin must not contain a path, query or fragment: {raw}");
    }

    Ok(parsed.origin().ascii_serialization())
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ANY_ORIGIN, Config, normalize_origin, parse_origin_list};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn defaults_allow_any_origin_on_localhost() {
        let config = Config::default();
        assert!(config.allows_any_origin());
        assert_eq!(
            config.bind_address().expect("bind address").to_string(),
            "127.0.0.1:8000"
        );
    }

    #[test]
    fn set_value_accepts_dotted_aliases() {
        let mut config = Config::default();
        config.set_value("api.port", "9100").expect("port");
        config.set_value("api.host", "0.0.0.0").expect("host");
        config.set_value("db.path", "/tmp/clicks.db").expect("db path");

        assert_eq!(config.get_value("api_port").as_deref(), Some("9100"));
        assert_eq!(config.get_value("api_host").as_deref(), Some("0.0.0.0"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/clicks.db"));
    }

    #[test]
    fn set_value_rejects_bad_input() {
        let mut config = Config::default();
        assert!(config.set_value("api_port", "eighty").is_err());
        assert!(config.set_value("api_host", "localhost").is_err());
        assert!(config.set_value("unknown", "1").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn origins_are_normalized() {
        let origins = parse_origin_list("https://example.com/, http://localhost:5173")
            .expect("origin list");
        assert_eq!(origins, vec!["https://example.com", "http://localhost:5173"]);

        assert_eq!(normalize_origin(ANY_ORIGIN).expect("wildcard"), ANY_ORIGIN);
        assert!(normalize_origin("ftp://example.com").is_err());
        assert!(normalize_origin("https://example.com/app").is_err());
        assert!(normalize_origin("example.com").is_err());
    }

    #[test]
    fn empty_origin_list_disables_cross_origin() {
        let mut config = Config::default();
        config
            .set_value("cors.allowed_origins", "")
            .expect("empty list");
        assert!(config.allowed_origins.is_empty());
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config
            .set_value("allowed_origins", "https://app.example.com")
            .expect("origins");
        config.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_config_file_falls_back_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "api_port": 8123 }"#).expect("write config");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.api_port, 8123);
        assert_eq!(loaded.allowed_origins, vec![ANY_ORIGIN.to_string()]);
    }

    #[test]
    fn hand_edited_origins_are_normalized_on_load() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "allowed_origins": ["HTTPS://Shop.Example.com/"] }"#,
        )
        .expect("write config");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.allowed_origins, vec!["https://shop.example.com"]);

        std::fs::write(&path, r#"{ "allowed_origins": ["not an origin"] }"#)
            .expect("write config");
        assert!(Config::load_from(&path).is_err());
    }
}
