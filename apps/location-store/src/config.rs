use crate::cli::Args;
use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_bind: String,
    pub csv_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_bind = env_string("LOCATION_STORE_HTTP_BIND", Some("127.0.0.1:5000".to_string()))?;
        let csv_path = PathBuf::from(env_string(
            "LOCATION_STORE_CSV_PATH",
            Some("locations.csv".to_string()),
        )?);

        Ok(Self {
            http_bind,
            csv_path,
        })
    }

    /// Command-line flags win over the environment.
    pub fn apply_args(mut self, args: &Args) -> Self {
        if let Some(bind) = args.bind.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.http_bind = bind.to_string();
        }
        if let Some(path) = args.csv_path.clone() {
            self.csv_path = path;
        }
        self
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment_values() {
        let config = Config {
            http_bind: "127.0.0.1:5000".to_string(),
            csv_path: PathBuf::from("locations.csv"),
        };
        let args = Args {
            bind: Some(" 0.0.0.0:8080 ".to_string()),
            csv_path: Some(PathBuf::from("/tmp/markers.csv")),
        };

        let config = config.apply_args(&args);
        assert_eq!(config.http_bind, "0.0.0.0:8080");
        assert_eq!(config.csv_path, PathBuf::from("/tmp/markers.csv"));
    }

    #[test]
    fn blank_bind_flag_keeps_environment_value() {
        let config = Config {
            http_bind: "127.0.0.1:5000".to_string(),
            csv_path: PathBuf::from("locations.csv"),
        };
        let args = Args {
            bind: Some("   ".to_string()),
            csv_path: None,
        };

        let config = config.apply_args(&args);
        assert_eq!(config.http_bind, "127.0.0.1:5000");
        assert_eq!(config.csv_path, PathBuf::from("locations.csv"));
    }
}
