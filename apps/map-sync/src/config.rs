use crate::cli::Args;
use crate::geo::{LatLng, ViewportSize};
use crate::view::{BaseLayer, ViewOptions};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    /// Transport timeout for store requests; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub center: LatLng,
    pub zoom: u8,
    pub primary_max_zoom: u8,
    pub secondary_max_zoom: u8,
    pub viewport: ViewportSize,
    pub skip_initial_load: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: "http://127.0.0.1:5000".to_string(),
            request_timeout: None,
            center: LatLng::new(17.48342, 78.5173),
            zoom: 18,
            primary_max_zoom: 18,
            secondary_max_zoom: 18,
            viewport: ViewportSize::new(800, 600),
            skip_initial_load: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let store_url = env_string("MAP_SYNC_STORE_URL", Some(defaults.store_url))?;
        // 0 (the default) disables the timeout.
        let request_timeout = match env_u64("MAP_SYNC_REQUEST_TIMEOUT_MS", Some(0))? {
            0 => defaults.request_timeout,
            ms => Some(Duration::from_millis(ms)),
        };

        let center = LatLng::new(
            env_f64("MAP_SYNC_CENTER_LAT", Some(defaults.center.lat))?,
            env_f64("MAP_SYNC_CENTER_LNG", Some(defaults.center.lng))?,
        );
        let zoom = env_zoom("MAP_SYNC_ZOOM", defaults.zoom)?;
        let primary_max_zoom = env_zoom("MAP_SYNC_PRIMARY_MAX_ZOOM", defaults.primary_max_zoom)?;
        let secondary_max_zoom =
            env_zoom("MAP_SYNC_SECONDARY_MAX_ZOOM", defaults.secondary_max_zoom)?;

        let viewport = ViewportSize::new(
            env_u32("MAP_SYNC_VIEWPORT_WIDTH", defaults.viewport.width)?,
            env_u32("MAP_SYNC_VIEWPORT_HEIGHT", defaults.viewport.height)?,
        );

        let skip_initial_load = match env_optional("MAP_SYNC_SKIP_INITIAL_LOAD") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("invalid MAP_SYNC_SKIP_INITIAL_LOAD {raw:?}"))?,
            None => defaults.skip_initial_load,
        };

        let config = Self {
            store_url,
            request_timeout,
            center,
            zoom,
            primary_max_zoom,
            secondary_max_zoom,
            viewport,
            skip_initial_load,
        };
        config.validate()?;
        Ok(config)
    }

    /// Command-line flags win over the environment.
    pub fn apply_args(mut self, args: &Args) -> Result<Self> {
        if let Some(url) = args.store_url.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.store_url = url.to_string();
        }
        if args.skip_initial_load {
            self.skip_initial_load = true;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.store_url).context("invalid MAP_SYNC_STORE_URL")?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("store url must be http(s), got {}", url.scheme()));
        }
        if !(-90.0..=90.0).contains(&self.center.lat) || !(-180.0..=180.0).contains(&self.center.lng) {
            return Err(anyhow!(
                "initial center ({}, {}) is outside lat/lng range",
                self.center.lat,
                self.center.lng
            ));
        }
        Ok(())
    }

    /// Street view: OpenStreetMap tiles with the zoom control shown.
    pub fn primary_view(&self) -> ViewOptions {
        ViewOptions {
            label: "street".to_string(),
            base_layer: BaseLayer::Street,
            center: self.center,
            zoom: self.zoom,
            min_zoom: 0,
            max_zoom: self.primary_max_zoom,
            zoom_control: true,
            viewport: self.viewport,
        }
    }

    /// Satellite view: ESRI imagery, no zoom control of its own.
    pub fn secondary_view(&self) -> ViewOptions {
        ViewOptions {
            label: "satellite".to_string(),
            base_layer: BaseLayer::Satellite,
            center: self.center,
            zoom: self.zoom,
            min_zoom: 0,
            max_zoom: self.secondary_max_zoom,
            zoom_control: false,
            viewport: self.viewport,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_f64(key: &str, default: Option<f64>) -> Result<f64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_zoom(key: &str, default: u8) -> Result<u8> {
    let raw = env_u64(key, Some(u64::from(default)))?;
    u8::try_from(raw).with_context(|| format!("{key} out of range"))
}

fn env_u32(key: &str, default: u32) -> Result<u32> {
    let raw = env_u64(key, Some(u64::from(default)))?;
    u32::try_from(raw).with_context(|| format!("{key} out of range"))
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_street_and_satellite_views() {
        let config = Config::default();
        let primary = config.primary_view();
        let secondary = config.secondary_view();

        assert_eq!(primary.base_layer, BaseLayer::Street);
        assert!(primary.zoom_control);
        assert_eq!(secondary.base_layer, BaseLayer::Satellite);
        assert!(!secondary.zoom_control);
        assert_eq!(primary.center, LatLng::new(17.48342, 78.5173));
        assert_eq!(primary.center, secondary.center);
        assert_eq!((primary.zoom, secondary.max_zoom), (18, 18));
    }

    #[test]
    fn args_override_and_are_validated() {
        let args = Args {
            store_url: Some("http://store.local:8080".to_string()),
            skip_initial_load: true,
        };
        let config = Config::default().apply_args(&args).unwrap();
        assert_eq!(config.store_url, "http://store.local:8080");
        assert!(config.skip_initial_load);

        let args = Args {
            store_url: Some("ftp://store.local".to_string()),
            skip_initial_load: false,
        };
        assert!(Config::default().apply_args(&args).is_err());
    }

    #[test]
    fn out_of_range_center_is_rejected() {
        let config = Config {
            center: LatLng::new(95.0, 0.0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_viewport_is_rejected_instead_of_truncated() {
        let key = "MAP_SYNC_TEST_VIEWPORT_WIDTH";
        env::set_var(key, "4294967296");
        let err = env_u32(key, 800).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        env::set_var(key, " 1024 ");
        assert_eq!(env_u32(key, 800).unwrap(), 1024);
        env::remove_var(key);
        assert_eq!(env_u32(key, 800).unwrap(), 800);
    }

    #[test]
    fn request_timeout_is_off_by_default() {
        assert_eq!(Config::default().request_timeout, None);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
