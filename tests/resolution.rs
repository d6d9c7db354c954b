//! End-to-end resolution tests
//!
//! Exercises the full file-layer pipeline: load base + publish TOML
//! layers, fold, validate, and hand out one immutable configuration.

use siteconf::{Layer, LoadError, ResolveError, ResolvedConfig, Schema, ValidationError};
use std::fs;
use tempfile::TempDir;

/// Write a layer file into the temp dir and load it
fn file_layer(dir: &TempDir, name: &str, contents: &str) -> Layer {
    let path = dir.path().join(format!("{}.toml", name));
    fs::write(&path, contents).unwrap();
    Layer::from_toml_file(name, &path).unwrap()
}

const BASE_CONF: &str = r#"
author = "Lee Johnson"
site_name = "Tech Journal"
site_subtitle = "Journal on automation technology and beyond"
site_url = ""
content_path = "content"
timezone = "America/New_York"
default_lang = "en"
pagination_size = 10
show_feed = false
markup = ["md", "ipynb"]
plugin_paths = ["./plugins", "./plugins/pelican-plugins"]
plugins = ["render_math", "liquid_tags", "summary", "feed_summary"]
theme_path = "./theme"
static_paths = ["images", "figures", "videos", "downloads", "favicon.ico"]
license = "MIT"
"#;

const PUBLISH_CONF: &str = r#"
site_url = "https://example.org"
relative_urls = false
show_feed = true
feed_all_atom = "feeds/all.atom.xml"
category_feed_atom = "feeds/{slug}.atom.xml"
delete_output_directory = true
disqus_site_name = "example-site"
google_analytics = "UA-000000-1"
"#;

#[test]
fn test_publish_overlay_overrides_base() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let publish = file_layer(&dir, "publish", PUBLISH_CONF);

    let schema = Schema::site();
    let config = ResolvedConfig::resolve(&schema, &base, &[publish]).unwrap();

    // Publish wins for the keys it touches
    assert_eq!(config.get_str("site_url"), Some("https://example.org"));
    assert_eq!(config.get_bool("show_feed"), Some(true));
    assert_eq!(config.get_str("feed_all_atom"), Some("feeds/all.atom.xml"));

    // Untouched base values survive unchanged
    assert_eq!(config.get_u64("pagination_size"), Some(10));
    assert_eq!(config.get_str("author"), Some("Lee Johnson"));
    assert_eq!(
        config.get_str_list("plugins"),
        Some(vec!["render_math", "liquid_tags", "summary", "feed_summary"])
    );

    // Keys no layer touched take the schema default
    assert_eq!(config.get_bool("show_archives"), Some(true));
    assert_eq!(config.get_bool("enable_mathjax"), Some(true));
}

#[test]
fn test_duplicate_plugin_path_rejected() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let broken = file_layer(
        &dir,
        "broken",
        r#"
site_url = "https://example.org"
plugin_paths = ["./plugins", "./plugins", "./other"]
"#,
    );

    let schema = Schema::site();
    let err = ResolvedConfig::resolve(&schema, &base, &[broken]).unwrap_err();

    match err {
        ResolveError::Validation(ValidationError::DuplicateEntry { key, value }) => {
            assert_eq!(key, "plugin_paths");
            assert_eq!(value, "./plugins");
        }
        other => panic!("expected duplicate-entry error, got {:?}", other),
    }
}

#[test]
fn test_unknown_key_rejected() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let publish = file_layer(
        &dir,
        "publish",
        "site_url = \"https://example.org\"\nfeed_everything = true\n",
    );

    let schema = Schema::site();
    let err = ResolvedConfig::resolve(&schema, &base, &[publish]).unwrap_err();

    match &err {
        ResolveError::UnknownSetting { layer, source } => {
            assert_eq!(layer, "publish");
            assert_eq!(source.key, "feed_everything");
        }
        other => panic!("expected unknown-setting error, got {:?}", other),
    }
}

#[test]
fn test_resolution_is_deterministic_across_runs() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::site();

    let run = || {
        let base = file_layer(&dir, "base", BASE_CONF);
        let publish = file_layer(&dir, "publish", PUBLISH_CONF);
        ResolvedConfig::resolve(&schema, &base, &[publish]).unwrap()
    };

    let a = run();
    let b = run();
    assert_eq!(a.settings(), b.settings());
}

#[test]
fn test_resolved_config_round_trips_as_layer() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let publish = file_layer(&dir, "publish", PUBLISH_CONF);

    let schema = Schema::site();
    let first = ResolvedConfig::resolve(&schema, &base, &[publish]).unwrap();
    let second = ResolvedConfig::resolve(&schema, &first.to_layer("resolved"), &[]).unwrap();

    assert_eq!(first.settings(), second.settings());
}

#[test]
fn test_header_include_becomes_setting_value() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("_nb_header.html"),
        "<link rel=\"stylesheet\" href=\"nb.css\">",
    )
    .unwrap();

    let base = file_layer(
        &dir,
        "base",
        r#"
site_name = "Tech Journal"
site_url = "https://example.org"
header_include = "_nb_header.html"
"#,
    );

    let schema = Schema::site();
    let config = ResolvedConfig::resolve(&schema, &base, &[]).unwrap();

    assert_eq!(
        config.get_str("extra_header"),
        Some("<link rel=\"stylesheet\" href=\"nb.css\">")
    );
}

#[test]
fn test_malformed_layer_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "site_name = [unterminated").unwrap();

    let err = Layer::from_toml_file("bad", &path).unwrap_err();
    assert!(matches!(err, LoadError::Toml(_)));
}

#[test]
fn test_provenance_records_file_digests() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let publish = file_layer(&dir, "publish", PUBLISH_CONF);

    let schema = Schema::site();
    let config = ResolvedConfig::resolve(&schema, &base, &[publish]).unwrap();

    assert_eq!(config.sources().len(), 2);
    for source in config.sources() {
        assert!(source.path.as_deref().unwrap().ends_with(".toml"));
        assert_eq!(source.digest.as_deref().unwrap().len(), 64);
    }

    // Re-loading the same bytes yields the same digest
    let again = file_layer(&dir, "base", BASE_CONF);
    assert_eq!(
        config.sources()[0].digest,
        again.provenance().digest
    );
}

#[test]
fn test_env_layer_has_final_say() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let publish = file_layer(&dir, "publish", PUBLISH_CONF);

    std::env::set_var("SITECONF_E2E_SITE_URL", "https://staging.example.org");
    let env_layer = Layer::from_env("env", "SITECONF_E2E");
    std::env::remove_var("SITECONF_E2E_SITE_URL");

    let schema = Schema::site();
    let config = ResolvedConfig::resolve(&schema, &base, &[publish, env_layer]).unwrap();

    assert_eq!(config.get_str("site_url"), Some("https://staging.example.org"));
    // Publish overrides not touched by env survive
    assert_eq!(config.get_bool("show_feed"), Some(true));
}

#[test]
fn test_base_alone_fails_required_site_url() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);

    let schema = Schema::site();
    let err = ResolvedConfig::resolve(&schema, &base, &[]).unwrap_err();

    match err {
        ResolveError::Validation(ValidationError::MissingRequired { key }) => {
            assert_eq!(key, "site_url");
        }
        other => panic!("expected missing-required error, got {:?}", other),
    }
}

#[test]
fn test_written_config_is_readable_json() {
    let dir = TempDir::new().unwrap();
    let base = file_layer(&dir, "base", BASE_CONF);
    let publish = file_layer(&dir, "publish", PUBLISH_CONF);

    let schema = Schema::site();
    let config = ResolvedConfig::resolve(&schema, &base, &[publish]).unwrap();

    let out = dir.path().join("resolved.json");
    config.write_to_file(&out).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["settings"]["site_url"], "https://example.org");
    assert_eq!(value["sources"][1]["name"], "publish");
}
