//! Loader for scraper configuration with YAML + environment overlays.
//!
//! Selector strings are configuration, not code: every entity module reads
//! its locators from the [`Selectors`] maps defined here, so a site redesign
//! is a config change. `${VAR}` placeholders are expanded recursively before
//! the strongly typed structs are materialised.
use config::{Config, ConfigError, Environment, File};
use lattice_common::BrowserEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Top-level configuration consumed by the session manager and the root
/// client.
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Which browser backend to launch.
    #[serde(default)]
    pub engine: BrowserEngine,
    /// WebDriver endpoint override. When unset, the engine's conventional
    /// local port is used.
    #[serde(default)]
    pub webdriver_url: Option<String>,
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Browser window size as `(width, height)`.
    #[serde(default)]
    pub window_size: Option<(u32, u32)>,
    /// Landing page the session navigates to right after launch.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Where the authenticated session snapshot lives. When the file exists
    /// the session restores it and interactive login becomes a no-op.
    #[serde(default)]
    pub auth_state_path: Option<PathBuf>,
    /// Abort non-essential resource requests (images, media, fonts).
    #[serde(default = "default_true")]
    pub block_resources: bool,
    /// Bounded wait applied to selector lookups, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub selector_timeout_ms: u64,
    #[serde(default)]
    pub selectors: Selectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::default(),
            webdriver_url: None,
            headless: true,
            window_size: None,
            base_url: default_base_url(),
            auth_state_path: None,
            block_resources: true,
            selector_timeout_ms: default_timeout_ms(),
            selectors: Selectors::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://www.linkedin.com".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Per-entity selector maps. Each field binds a locator string (CSS or
/// XPath) to a semantic role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default)]
    pub login: LoginSelectors,
    #[serde(default)]
    pub user_profile: UserProfileSelectors,
    #[serde(default)]
    pub group: GroupSelectors,
    #[serde(default)]
    pub job_listing: JobListingSelectors,
}

impl Selectors {
    /// Load selector maps alone from a YAML file, bypassing the full config
    /// pipeline. Handy when only the site's locators changed.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSelectors {
    pub username: String,
    pub password: String,
    pub submit: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: "#username".into(),
            password: "#password".into(),
            submit: "button[type='submit']".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileSelectors {
    pub full_name: String,
    pub bio: String,
    pub about: String,
    /// Relative locator for the "show more" control inside the about block;
    /// appended to `about` when filtering its label out of the text.
    pub about_show_more: String,
    pub avatar: String,
}

impl Default for UserProfileSelectors {
    fn default() -> Self {
        Self {
            full_name: "//h1[contains(@class,'text-heading-xlarge')]".into(),
            bio: "//div[contains(@class,'text-body-medium')]".into(),
            about: "//section[contains(@class,'pv-about-section')]//div[contains(@class,'inline-show-more-text')]".into(),
            about_show_more: "//span[contains(@class,'inline-show-more-text__button')]".into(),
            avatar: "img.pv-top-card-profile-picture__image".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSelectors {
    pub name: String,
    pub member_count: String,
    pub post: String,
    pub post_author: String,
    pub post_body: String,
    /// "See more" control expanded before reading post bodies.
    pub post_see_more: String,
}

impl Default for GroupSelectors {
    fn default() -> Self {
        Self {
            name: "//h1[contains(@class,'groups-entity__name')]".into(),
            member_count: "//div[contains(@class,'groups-info-metadata')]//span".into(),
            post: "//div[contains(@class,'feed-shared-update-v2')]".into(),
            post_author: ".//span[contains(@class,'update-components-actor__name')]".into(),
            post_body: ".//div[contains(@class,'update-components-text')]".into(),
            post_see_more: "//button[contains(@class,'see-more')]".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListingSelectors {
    pub list: String,
    pub container: String,
    pub pagination: String,
    pub item: String,
    pub pagination_item: String,
    pub item_title: String,
    pub item_company: String,
    pub item_location: String,
}

impl Default for JobListingSelectors {
    fn default() -> Self {
        Self {
            list: "//ul[contains(@class,'scaffold-layout__list-container')]".into(),
            container: "//div[contains(@class,'jobs-search-results-list')]".into(),
            pagination: "//ul[contains(@class,'artdeco-pagination__pages')]".into(),
            item: "//li[contains(@class,'jobs-search-results__list-item')]".into(),
            pagination_item: "//li[contains(@class,'artdeco-pagination__indicator')]".into(),
            item_title: ".//a[contains(@class,'job-card-list__title')]".into(),
            item_company: ".//span[contains(@class,'job-card-container__primary-description')]".into(),
            item_location: ".//li[contains(@class,'job-card-container__metadata-item')]".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct LatticeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for LatticeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LatticeConfigLoader {
    /// Start with sensible defaults: YAML file + `LATTICE_` env overrides.
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("LATTICE").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Merge an inline YAML snippet (tests, embedding callers).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into the
    /// strongly typed config, expanding `${VAR}` placeholders first.
    ///
    /// With no sources beyond the environment this yields the documented
    /// defaults (Firefox engine, headless, resource blocking on).
    pub fn load(self) -> Result<ScraperConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
