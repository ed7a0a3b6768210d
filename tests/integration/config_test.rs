use envdash::core::config::{Config, DEFAULT_HISTORY_URL};
use envdash::core::dashboard::LiveReadingPolicy;
use tempfile::TempDir;

#[test]
fn test_config_missing_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&temp_dir.path().join("config.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.set_value("push-url", "ws://10.0.0.5:4000").unwrap();
    config.set_value("live-policy", "presence").unwrap();
    config.set_value("history-capacity", "1000").unwrap();
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.live_reading_policy, LiveReadingPolicy::Presence);
    assert_eq!(loaded.store_options().capacity, Some(1000));
    assert_eq!(loaded.history_url, DEFAULT_HISTORY_URL);
}

#[test]
fn test_config_empty_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "  \n").unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_config_corrupt_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "{\"push_url\": 42").unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}
