use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub minify: bool,
    #[serde(default = "default_warn_on_empty_state")]
    pub warn_on_empty_state: bool,
    /// Utility name to declarations, e.g. `block = "display: block"`.
    #[serde(default)]
    pub utilities: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError {
        message: format!("failed to read config {}: {}", path.display(), err),
    })?;
    parse(&text).map_err(|err| ConfigError {
        message: format!("failed to parse config {}: {}", path.display(), err.message),
    })
}

pub fn parse(text: &str) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|err| ConfigError {
        message: err.to_string(),
    })
}

fn default_warn_on_empty_state() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minify: false,
            warn_on_empty_state: default_warn_on_empty_state(),
            utilities: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load, parse, Config};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn loads_toml_config() {
        let path = temp_path("stateframe_config");
        let _ = fs::write(&path, "minify = true\nwarn_on_empty_state = false");
        let config = load(&path).expect("config should parse");
        assert!(config.minify);
        assert!(!config.warn_on_empty_state);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn defaults_when_empty() {
        let path = temp_path("stateframe_config_default");
        let _ = fs::write(&path, "");
        let config = load(&path).expect("config should parse");
        assert!(!config.minify);
        assert!(config.warn_on_empty_state);
        assert!(config.utilities.is_empty());
        assert_eq!(config, Config::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn loads_utilities() {
        let config = parse(
            r#"
[utilities]
block = "display: block"
"text-red" = "color: red; font-weight: 600"
"#,
        )
        .expect("config should parse");
        assert_eq!(config.utilities["block"], "display: block");
        assert_eq!(config.utilities["text-red"], "color: red; font-weight: 600");
    }

    #[test]
    fn reports_missing_file() {
        let path = temp_path("stateframe_config_missing");
        let err = load(&path).expect_err("missing config should fail");
        assert!(err.message.starts_with("failed to read config"));
    }

    #[test]
    fn reports_invalid_toml() {
        let path = temp_path("stateframe_config_invalid");
        let _ = fs::write(&path, "minify = \"yes\"");
        let err = load(&path).expect_err("invalid config should fail");
        assert!(err.message.starts_with("failed to parse config"));
        let _ = fs::remove_file(&path);
    }

    fn temp_path(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}.toml", prefix, nanos))
    }
}
