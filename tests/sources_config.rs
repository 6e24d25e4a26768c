// tests/sources_config.rs
use std::{env, fs};

use finance_news_relay::config::sources::ENV_SOURCES_PATH;
use finance_news_relay::config::{load_env_file, Settings, SourceLists};

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_SOURCES_PATH);

    // 1) Nothing on disk: built-in list.
    let builtin = SourceLists::load_default().unwrap();
    assert_eq!(builtin, SourceLists::builtin().unwrap());
    assert!(!builtin.feeds.is_empty());

    // 2) ./config/sources.json
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("sources.json"),
        r#"{"feeds":["https://json.test/rss"],"keywords":{"negative":[" Gossip "]}}"#,
    )
    .unwrap();
    let from_json = SourceLists::load_default().unwrap();
    assert_eq!(from_json.feeds, vec!["https://json.test/rss"]);
    assert_eq!(from_json.negative_keywords, vec!["gossip"]);

    // 3) ./config/sources.toml wins over json
    fs::write(
        cfg_dir.join("sources.toml"),
        "feeds = [\"https://toml.test/rss\"]\n[whitelist]\ndomains = [\"www.FT.com\"]\n",
    )
    .unwrap();
    let from_toml = SourceLists::load_default().unwrap();
    assert_eq!(from_toml.feeds, vec!["https://toml.test/rss"]);
    assert_eq!(from_toml.whitelist_domains, vec!["ft.com"]);

    // 4) env path wins over everything
    let p_env = tmp.path().join("custom.toml");
    fs::write(&p_env, "feeds = [\"https://env.test/rss\"]\n").unwrap();
    env::set_var(ENV_SOURCES_PATH, &p_env);
    let from_env = SourceLists::load_default().unwrap();
    assert_eq!(from_env.feeds, vec!["https://env.test/rss"]);

    // 5) env path pointing nowhere is an error
    env::set_var(ENV_SOURCES_PATH, tmp.path().join("missing.toml"));
    assert!(SourceLists::load_default().is_err());

    env::remove_var(ENV_SOURCES_PATH);
    env::set_current_dir(old).unwrap();
}

#[serial_test::serial]
#[test]
fn settings_from_env_reads_process_environment() {
    let keys = ["FEEDS", "POST_LIMIT_PER_RUN", "DRY_RUN", "TIMEZONE", "CACHE_PATH"];
    env::set_var("FEEDS", "https://one.test/rss,https://two.test/rss");
    env::set_var("POST_LIMIT_PER_RUN", "2");
    env::set_var("DRY_RUN", "no");
    env::set_var("TIMEZONE", "UTC");
    env::set_var("CACHE_PATH", "/tmp/relay-cache.json");

    let s = Settings::from_env().unwrap();
    assert_eq!(s.feeds.len(), 2);
    assert_eq!(s.run.post_limit, 2);
    assert!(!s.publish.dry_run);
    assert_eq!(s.run.timezone, chrono_tz::UTC);
    assert_eq!(s.run.cache_path.to_str(), Some("/tmp/relay-cache.json"));

    env::set_var("TIMEZONE", "Not/AZone");
    assert!(Settings::from_env().is_err());

    for k in keys {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn env_file_overrides_inherited_values() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join(".env");
    fs::write(&file, "DRY_RUN=false\nPOST_LIMIT_PER_RUN=4\n").unwrap();

    env::set_var("DRY_RUN", "true");
    env::remove_var("POST_LIMIT_PER_RUN");
    assert!(load_env_file(&file));
    let dry = env::var("DRY_RUN").unwrap();
    let limit = env::var("POST_LIMIT_PER_RUN").unwrap();
    env::remove_var("DRY_RUN");
    env::remove_var("POST_LIMIT_PER_RUN");

    assert_eq!(dry, "false");
    assert_eq!(limit, "4");
    assert!(!load_env_file(&tmp.path().join("missing.env")));
}
