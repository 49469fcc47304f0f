//! Integration tests for configuration loading

use std::io::Write;
use strata_insights::infra::Config;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[server]
bind_address = "127.0.0.1"
port = 9090

[upstream]
url = "http://localhost:7000/query"
page_size = 250
timeout_secs = 5
page_delay_ms = 0

[gazetteer]
path = "fixtures/suburbs.csv"
name_column = "Suburb"

[resolver]
fuzzy_threshold = 90.0

[resolver.postcode_fallbacks]
manly = 2095
"Dee Why" = 2099

[views]
min_lots = 50
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 9090);
    assert_eq!(config.upstream_url(), "http://localhost:7000/query");
    assert_eq!(config.page_size(), 250);
    assert_eq!(config.timeout_secs(), 5);
    assert_eq!(config.page_delay_ms(), 0);
    assert_eq!(config.gazetteer_path(), "fixtures/suburbs.csv");
    assert_eq!(config.gazetteer_name_column(), "Suburb");
    assert_eq!(config.fuzzy_threshold(), 90.0);
    assert_eq!(config.postcode_fallbacks().get("MANLY"), Some(&2095));
    assert_eq!(config.postcode_fallbacks().get("DEE WHY"), Some(&2099));
    assert_eq!(config.postcode_fallbacks().len(), 2);
    assert_eq!(config.min_lots(), 50);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server]\nport = 3000\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.port(), 3000);
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.page_size(), 1000);
    assert_eq!(config.postcode_fallbacks().get("NEUTRAL BAY"), Some(&2089));
    assert_eq!(config.min_lots(), 20);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/strata.toml");
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.port(), 8080);
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server\nport = \"eighty\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
    let config = Config::load_from_path(temp_file.path().to_str().unwrap());
    assert_eq!(config.config_file(), "default");
}
