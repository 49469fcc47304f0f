//! Configuration loading from TOML files
//!
//! The file path comes from the `--config` argument (default `config/dev.toml`).

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_server_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// ArcGIS REST query endpoint for the StrataHub feature layer
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Records requested per page (resultRecordCount)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause between consecutive page requests
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

fn default_upstream_url() -> String {
    "https://portal.spatial.nsw.gov.au/server/rest/services/StrataHub/FeatureServer/0/query"
        .to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_page_delay_ms() -> u64 {
    100
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerConfig {
    /// Semicolon-delimited suburb list
    #[serde(default = "default_gazetteer_path")]
    pub path: String,
    #[serde(default = "default_name_column")]
    pub name_column: String,
}

fn default_gazetteer_path() -> String {
    "data/nsw_suburbs_opendatasoft.csv".to_string()
}

fn default_name_column() -> String {
    "Official Name Suburb".to_string()
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self { path: default_gazetteer_path(), name_column: default_name_column() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Minimum weighted-ratio score (0-100) for a fuzzy suburb match
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Ambiguous suburbs that fall back to a postcode search (e.g. MANLY = 2095)
    #[serde(default = "default_postcode_fallbacks")]
    pub postcode_fallbacks: BTreeMap<String, u32>,
}

fn default_fuzzy_threshold() -> f64 {
    85.0
}

fn default_postcode_fallbacks() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("MANLY".to_string(), 2095),
        ("CREMORNE".to_string(), 2090),
        ("NEWINGTON".to_string(), 2127),
        ("NEUTRAL BAY".to_string(), 2089),
    ])
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            postcode_fallbacks: default_postcode_fallbacks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewsConfig {
    /// Lot threshold for the *_ge20_lots views
    #[serde(default = "default_min_lots")]
    pub min_lots: u64,
}

fn default_min_lots() -> u64 {
    20
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self { min_lots: default_min_lots() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub gazetteer: GazetteerConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    upstream_url: String,
    page_size: u32,
    timeout_secs: u64,
    page_delay_ms: u64,
    gazetteer_path: String,
    gazetteer_name_column: String,
    fuzzy_threshold: f64,
    postcode_fallbacks: BTreeMap<String, u32>,
    min_lots: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        // Keys are compared against upper-cased user input
        let postcode_fallbacks = toml_config
            .resolver
            .postcode_fallbacks
            .into_iter()
            .map(|(suburb, postcode)| (suburb.trim().to_uppercase(), postcode))
            .collect();

        Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            upstream_url: toml_config.upstream.url,
            page_size: toml_config.upstream.page_size.max(1),
            timeout_secs: toml_config.upstream.timeout_secs,
            page_delay_ms: toml_config.upstream.page_delay_ms,
            gazetteer_path: toml_config.gazetteer.path,
            gazetteer_name_column: toml_config.gazetteer.name_column,
            fuzzy_threshold: toml_config.resolver.fuzzy_threshold,
            postcode_fallbacks,
            min_lots: toml_config.views.min_lots,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration from an explicit path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn page_delay_ms(&self) -> u64 {
        self.page_delay_ms
    }

    pub fn gazetteer_path(&self) -> &str {
        &self.gazetteer_path
    }

    pub fn gazetteer_name_column(&self) -> &str {
        &self.gazetteer_name_column
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    pub fn postcode_fallbacks(&self) -> &BTreeMap<String, u32> {
        &self.postcode_fallbacks
    }

    pub fn min_lots(&self) -> u64 {
        self.min_lots
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to point at a fixture gazetteer
    pub fn with_gazetteer_path(mut self, path: &str) -> Self {
        self.gazetteer_path = path.to_string();
        self
    }

    /// Builder method for tests to point at a local upstream
    pub fn with_upstream_url(mut self, url: &str) -> Self {
        self.upstream_url = url.to_string();
        self
    }

    /// Builder method for tests to disable the inter-page pause
    pub fn with_page_delay_ms(mut self, ms: u64) -> Self {
        self.page_delay_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.page_size(), 1000);
        assert_eq!(config.timeout_secs(), 60);
        assert_eq!(config.page_delay_ms(), 100);
        assert_eq!(config.fuzzy_threshold(), 85.0);
        assert_eq!(config.min_lots(), 20);
        assert_eq!(config.gazetteer_name_column(), "Official Name Suburb");
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_postcode_fallbacks_default() {
        let config = Config::default();
        let fallbacks = config.postcode_fallbacks();
        assert_eq!(fallbacks.get("MANLY"), Some(&2095));
        assert_eq!(fallbacks.get("CREMORNE"), Some(&2090));
        assert_eq!(fallbacks.get("NEWINGTON"), Some(&2127));
        assert_eq!(fallbacks.get("NEUTRAL BAY"), Some(&2089));
        assert_eq!(fallbacks.get("SYDNEY"), None);
        assert_eq!(fallbacks.get("manly"), None);
    }

    #[test]
    fn test_postcode_fallback_keys_are_uppercased() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[resolver.postcode_fallbacks]
"Dee Why" = 2099
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline");
        assert_eq!(config.postcode_fallbacks().get("DEE WHY"), Some(&2099));
        // Replacing the table drops the built-in entries
        assert_eq!(config.postcode_fallbacks().get("MANLY"), None);
    }

    #[test]
    fn test_zero_page_size_clamped() {
        let toml_config: TomlConfig = toml::from_str("[upstream]\npage_size = 0\n").unwrap();
        let config = Config::from_toml(toml_config, "inline");
        assert_eq!(config.page_size(), 1);
    }
}
