//! Browser session manager.
//!
//! A session is one WebDriver-driven browser process with one cookie/storage
//! jar and one root page. Extra pages (windows) can be handed out for
//! isolated extraction targets; they share the session's cookies. The
//! session restores a persisted auth snapshot when one exists, installs the
//! resource filter before first navigation, and tears everything down in
//! reverse order of acquisition.

use crate::auth_state::{self, PersistedAuthState};
use crate::filter::ResourceFilter;
use crate::pacing::Pacer;
use crate::page::{wd_err, Page};
use fantoccini::ClientBuilder;
use lattice_common::{BrowserEngine, LatticeError, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use webdriver::capabilities::Capabilities;

/// Everything needed to open a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub engine: BrowserEngine,
    /// WebDriver endpoint; defaults to the engine's conventional local port.
    pub webdriver_url: Option<String>,
    pub headless: bool,
    pub window_size: Option<(u32, u32)>,
    /// Landing page navigated to right after the session is assembled.
    pub base_url: Url,
    pub auth_state_path: Option<PathBuf>,
    pub block_resources: bool,
    pub resource_filter: ResourceFilter,
    pub selector_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::default(),
            webdriver_url: None,
            headless: true,
            window_size: None,
            base_url: Url::parse("https://www.linkedin.com").expect("static url"),
            auth_state_path: None,
            block_resources: true,
            resource_filter: ResourceFilter::default(),
            selector_timeout: Duration::from_secs(10),
        }
    }
}

/// Conventional local endpoint for each engine's driver binary.
pub fn default_webdriver_endpoint(engine: BrowserEngine) -> &'static str {
    match engine {
        BrowserEngine::Chromium => "http://localhost:9515",
        BrowserEngine::Firefox => "http://localhost:4444",
        BrowserEngine::Webkit => "http://localhost:4723",
    }
}

fn build_capabilities(config: &SessionConfig) -> Capabilities {
    let mut caps = Capabilities::new();
    match config.engine {
        BrowserEngine::Chromium => {
            let mut args: Vec<String> = vec!["--disable-dev-shm-usage".into()];
            if config.headless {
                args.push("--headless=new".into());
                args.push("--disable-gpu".into());
            }
            if let Some((w, h)) = config.window_size {
                args.push(format!("--window-size={w},{h}"));
            }
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserEngine::Firefox => {
            let mut args: Vec<String> = Vec::new();
            if config.headless {
                args.push("-headless".into());
            }
            if let Some((w, h)) = config.window_size {
                args.push("-width".into());
                args.push(w.to_string());
                args.push("-height".into());
                args.push(h.to_string());
            }
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
        // safaridriver/webkitwebdriver take no vendor options we rely on.
        BrowserEngine::Webkit => {}
    }
    caps
}

/// One browser process + cookie jar + root page, as a unit.
pub struct Session {
    client: fantoccini::Client,
    page: Page,
    pacer: Arc<Pacer>,
    engine: BrowserEngine,
    base_url: Url,
    auth_state_path: Option<PathBuf>,
    resource_filter: ResourceFilter,
    resource_blocking_enabled: bool,
    loaded_from_persisted_state: bool,
}

impl Session {
    /// Launch the backend, assemble the session, and land on the base URL.
    ///
    /// A connect failure is fatal and not retried: a failed process launch
    /// is not transient. A persisted auth snapshot at the configured path is
    /// restored before the caller sees the session; a corrupt snapshot
    /// aborts the open.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let endpoint = config
            .webdriver_url
            .clone()
            .unwrap_or_else(|| default_webdriver_endpoint(config.engine).to_string());

        let client = ClientBuilder::native()
            .capabilities(build_capabilities(&config))
            .connect(&endpoint)
            .await
            .map_err(|e| LatticeError::Launch(format!("{endpoint}: {e}")))?;
        debug!(?config.engine, endpoint, "webdriver session established");

        let window = client.window().await.map_err(wd_err)?;
        let page = Page::new(client.clone(), window, config.selector_timeout);

        let mut resource_blocking_enabled = false;
        if config.block_resources {
            resource_blocking_enabled =
                install_resource_filter(&client, &config.resource_filter, config.engine).await?;
        }

        page.goto(config.base_url.as_str()).await?;

        let mut loaded_from_persisted_state = false;
        if let Some(path) = &config.auth_state_path {
            if auth_state::state_file_exists(path) {
                let state = PersistedAuthState::read_from(path)?;
                state.replay(&page).await?;
                loaded_from_persisted_state = true;
            }
        }

        info!(
            engine = ?config.engine,
            restored = loaded_from_persisted_state,
            blocking = resource_blocking_enabled,
            "session open"
        );

        Ok(Self {
            client,
            page,
            pacer: Arc::new(Pacer::new()),
            engine: config.engine,
            base_url: config.base_url,
            auth_state_path: config.auth_state_path,
            resource_filter: config.resource_filter,
            resource_blocking_enabled,
            loaded_from_persisted_state,
        })
    }

    /// The session's root page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn pacer_handle(&self) -> Arc<Pacer> {
        Arc::clone(&self.pacer)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth_state_path(&self) -> Option<&Path> {
        self.auth_state_path.as_deref()
    }

    pub fn loaded_from_persisted_state(&self) -> bool {
        self.loaded_from_persisted_state
    }

    pub fn resource_blocking_enabled(&self) -> bool {
        self.resource_blocking_enabled
    }

    /// Open a fresh window sharing this session's cookies, for an isolated
    /// extraction target.
    pub async fn new_page(&self) -> Result<Page> {
        let response = self.client.new_window(true).await.map_err(wd_err)?;
        self.client
            .switch_to_window(response.handle.clone())
            .await
            .map_err(wd_err)?;
        if self.resource_blocking_enabled {
            // Blocked-URL state is per target; the fresh window needs its own.
            install_resource_filter(&self.client, &self.resource_filter, self.engine).await?;
        }
        Ok(Page::new(
            self.client.clone(),
            response.handle,
            self.page.selector_timeout(),
        ))
    }

    /// Persist the current authenticated state to the configured path.
    /// Call only after a successful login.
    pub async fn save_auth_state(&self) -> Result<()> {
        let path = self.auth_state_path.as_deref().ok_or_else(|| {
            LatticeError::Config("no auth_state_path configured for this session".into())
        })?;
        auth_state::save(&self.page, path).await?;
        info!(path = %path.display(), "saved auth state");
        Ok(())
    }

    /// Tear down windows, then the WebDriver session (context + browser
    /// process), in that order. Best-effort: individual failures are
    /// reported through logs, not propagated, so a caller's batch flow can
    /// finish cleanly.
    pub async fn close(self) {
        match self.client.windows().await {
            Ok(windows) => {
                for window in windows {
                    if window == *self.page.window_handle() {
                        continue;
                    }
                    let switched = self.client.switch_to_window(window.clone()).await;
                    if let Err(e) = switched {
                        warn!(error = %e, "failed to focus window during close");
                        continue;
                    }
                    if let Err(e) = self.client.close_window().await {
                        warn!(error = %e, "failed to close window");
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to enumerate windows during close"),
        }

        if let Err(e) = self.client.close().await {
            warn!(error = %e, "failed to end webdriver session");
        }
    }
}

async fn install_resource_filter(
    client: &fantoccini::Client,
    filter: &ResourceFilter,
    engine: BrowserEngine,
) -> Result<bool> {
    match engine {
        BrowserEngine::Chromium => {
            filter.install(client).await?;
            debug!("resource filter installed");
            Ok(true)
        }
        _ => {
            warn!(
                ?engine,
                "resource blocking needs the chromium CDP bridge; continuing unfiltered"
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_match_driver_conventions() {
        assert_eq!(
            default_webdriver_endpoint(BrowserEngine::Chromium),
            "http://localhost:9515"
        );
        assert_eq!(
            default_webdriver_endpoint(BrowserEngine::Firefox),
            "http://localhost:4444"
        );
        assert_eq!(
            default_webdriver_endpoint(BrowserEngine::Webkit),
            "http://localhost:4723"
        );
    }

    #[test]
    fn chromium_capabilities_carry_headless_args() {
        let config = SessionConfig {
            engine: BrowserEngine::Chromium,
            window_size: Some((1280, 800)),
            ..SessionConfig::default()
        };
        let caps = build_capabilities(&config);
        let args = caps["goog:chromeOptions"]["args"]
            .as_array()
            .expect("chrome args");
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1280,800"));
    }

    #[test]
    fn firefox_headed_has_no_headless_arg() {
        let config = SessionConfig {
            engine: BrowserEngine::Firefox,
            headless: false,
            ..SessionConfig::default()
        };
        let caps = build_capabilities(&config);
        let args = caps["moz:firefoxOptions"]["args"]
            .as_array()
            .expect("firefox args");
        assert!(args.iter().all(|a| a != "-headless"));
    }

    #[test]
    fn webkit_capabilities_are_bare() {
        let config = SessionConfig {
            engine: BrowserEngine::Webkit,
            ..SessionConfig::default()
        };
        assert!(build_capabilities(&config).is_empty());
    }
}
