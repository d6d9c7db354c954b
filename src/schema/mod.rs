//! Setting schema
//!
//! The exhaustive registry of recognized setting names, their declared
//! types, defaults, and validation flags. Adding a recognized key is a
//! schema change, never a layer change.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

/// Declared type of a setting's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    /// UTF-8 string
    Str,
    /// Boolean toggle
    Bool,
    /// Signed integer
    Int,
    /// List of strings
    StrList,
    /// Nested string-keyed mapping
    Map,
}

impl SettingKind {
    /// Returns the string representation of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::Str => "string",
            SettingKind::Bool => "boolean",
            SettingKind::Int => "integer",
            SettingKind::StrList => "list of strings",
            SettingKind::Map => "mapping",
        }
    }
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recognized setting
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    /// Setting name as it appears in layers
    pub name: &'static str,

    /// Declared value type
    pub kind: SettingKind,

    /// Value taken when no layer touches this key
    pub default: Value,

    /// Must be present and non-empty in the resolved configuration
    pub required: bool,

    /// Null is an accepted value (e.g. "feed disabled")
    pub nullable: bool,

    /// Value is checked for valid path syntax
    pub path: bool,
}

impl Setting {
    fn new(name: &'static str, kind: SettingKind, default: Value) -> Self {
        Self {
            name,
            kind,
            default,
            required: false,
            nullable: false,
            path: false,
        }
    }

    fn string(name: &'static str, default: &str) -> Self {
        Self::new(name, SettingKind::Str, Value::String(default.to_string()))
    }

    fn flag(name: &'static str, default: bool) -> Self {
        Self::new(name, SettingKind::Bool, Value::Bool(default))
    }

    fn int(name: &'static str, default: i64) -> Self {
        Self::new(name, SettingKind::Int, json!(default))
    }

    fn list(name: &'static str, default: &[&str]) -> Self {
        Self::new(name, SettingKind::StrList, json!(default))
    }

    fn map(name: &'static str) -> Self {
        Self::new(name, SettingKind::Map, json!({}))
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Nullable with a null default (feed-style settings)
    fn optional(name: &'static str) -> Self {
        let mut s = Self::new(name, SettingKind::Str, Value::Null);
        s.nullable = true;
        s
    }

    fn path(mut self) -> Self {
        self.path = true;
        self
    }
}

/// Error for a key not present in the schema
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized setting '{key}'")]
pub struct UnknownSetting {
    /// The offending key
    pub key: String,
}

/// The setting registry
#[derive(Debug, Clone)]
pub struct Schema {
    settings: BTreeMap<&'static str, Setting>,
}

impl Schema {
    /// The full site-configuration schema
    pub fn site() -> Self {
        let mut schema = Schema {
            settings: BTreeMap::new(),
        };

        // Site identity
        schema.add(Setting::string("site_name", "").required());
        schema.add(Setting::string("site_subtitle", ""));
        schema.add(Setting::string("site_url", "").required());
        schema.add(Setting::string("author", ""));
        schema.add(Setting::string("timezone", "UTC"));
        schema.add(Setting::string("default_lang", "en"));

        // Content layout
        schema.add(Setting::string("content_path", "content").required().path());
        schema.add(Setting::int("pagination_size", 10));
        schema.add(Setting::string(
            "article_url",
            "blog/{date:%Y}/{date:%m}/{date:%d}/{slug}/",
        ));
        schema.add(Setting::string(
            "article_save_as",
            "blog/{date:%Y}/{date:%m}/{date:%d}/{slug}/index.html",
        ));
        schema.add(Setting::flag("relative_urls", false));
        schema.add(Setting::list("markup", &["md"]));
        schema.add(Setting::list("ignore_files", &[".ipynb_checkpoints"]));
        schema.add(Setting::list("static_paths", &["images"]).path());
        schema.add(Setting::flag("delete_output_directory", false));

        // Plugins
        schema.add(Setting::list("plugins", &[]));
        schema.add(Setting::list("plugin_paths", &["./plugins"]).path());
        schema.add(Setting::list("liquid_tags", &[]));
        schema.add(Setting::string("code_dir", "downloads/code").path());
        schema.add(Setting::string("notebook_dir", "downloads/notebooks").path());
        schema.add(Setting::flag("enable_mathjax", true));

        // Theme
        schema.add(Setting::string("theme_path", "./theme").path());
        schema.add(Setting::optional("header_include").path());
        schema.add(Setting::string("extra_header", ""));
        schema.add(Setting::string("about_page", ""));
        schema.add(Setting::flag("show_archives", true));

        // Feeds
        schema.add(Setting::flag("show_feed", false));
        schema.add(Setting::flag("feed_use_summary", true));
        schema.add(Setting::optional("feed_all_atom"));
        schema.add(Setting::optional("category_feed_atom"));
        schema.add(Setting::optional("translation_feed_atom"));
        schema.add(Setting::optional("author_feed_atom"));
        schema.add(Setting::optional("author_feed_rss"));

        // Author links and social handles
        schema.add(Setting::string("author_website", ""));
        schema.add(Setting::string("author_blog", ""));
        schema.add(Setting::string("author_cv", ""));
        schema.add(Setting::string("twitter_username", ""));
        schema.add(Setting::string("github_username", ""));
        schema.add(Setting::string("linkedin_username", ""));
        schema.add(Setting::string("stackoverflow_url", ""));

        // Footer and integrations
        schema.add(Setting::string("license", ""));
        schema.add(Setting::string("license_url", ""));
        schema.add(Setting::string("disqus_site_name", ""));
        schema.add(Setting::string("google_analytics", ""));
        schema.add(Setting::map("sitemap"));

        schema
    }

    fn add(&mut self, setting: Setting) {
        self.settings.insert(setting.name, setting);
    }

    /// Look up a setting by name
    pub fn describe(&self, name: &str) -> Result<&Setting, UnknownSetting> {
        self.settings.get(name).ok_or_else(|| UnknownSetting {
            key: name.to_string(),
        })
    }

    /// Whether the schema recognizes this key
    pub fn contains(&self, name: &str) -> bool {
        self.settings.contains_key(name)
    }

    /// All settings in name order
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.values()
    }

    /// Number of recognized settings
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Whether the schema is empty
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Name-to-default map used to seed resolution
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.settings
            .values()
            .map(|s| (s.name.to_string(), s.default.clone()))
            .collect()
    }
}
