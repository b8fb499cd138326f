//! Persisted session state: cookies plus the origin's local storage.
//!
//! The snapshot is written only after a successful login and, once present,
//! makes interactive login a no-op. Only existence and readability are
//! checked before use; a file that exists but fails to parse is a fatal
//! configuration error, not something to silently regenerate.

use crate::page::Page;
use fantoccini::cookies::Cookie;
use lattice_common::{LatticeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// One cookie in wire-independent form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub http_only: Option<bool>,
    /// Unix timestamp in seconds; `None` for session cookies.
    #[serde(default)]
    pub expires_unix: Option<i64>,
}

impl PersistedCookie {
    fn from_wire(cookie: &Cookie<'_>) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
            expires_unix: cookie.expires_datetime().map(|t| t.unix_timestamp()),
        }
    }

    fn to_wire(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        if let Some(secure) = self.secure {
            cookie.set_secure(secure);
        }
        if let Some(http_only) = self.http_only {
            cookie.set_http_only(http_only);
        }
        if let Some(expires) = self
            .expires_unix
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
        {
            cookie.set_expires(expires);
        }
        cookie
    }
}

/// Serialized authenticated-session snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistedAuthState {
    pub cookies: Vec<PersistedCookie>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

impl PersistedAuthState {
    /// Snapshot the page's current cookies and local storage.
    pub async fn capture(page: &Page) -> Result<Self> {
        let cookies = page
            .client()
            .get_all_cookies()
            .await
            .map_err(|e| LatticeError::Driver(e.into()))?
            .iter()
            .map(PersistedCookie::from_wire)
            .collect();

        let dump = page
            .execute(
                "var out = {}; \
                 for (var i = 0; i < localStorage.length; i++) { \
                     var k = localStorage.key(i); out[k] = localStorage.getItem(k); \
                 } \
                 return out;",
                vec![],
            )
            .await?;
        let local_storage = serde_json::from_value(dump).unwrap_or_default();

        Ok(Self {
            cookies,
            local_storage,
        })
    }

    /// Replay the snapshot against the page's current origin and reload so
    /// the site sees the authenticated state. The page must already be on
    /// the target site's base URL: WebDriver only accepts cookies for the
    /// current domain.
    pub async fn replay(&self, page: &Page) -> Result<()> {
        for cookie in &self.cookies {
            if let Err(e) = page.client().add_cookie(cookie.to_wire()).await {
                // Cookies for foreign domains are rejected; the rest of the
                // snapshot is still worth replaying.
                warn!(name = %cookie.name, error = %e, "skipping cookie during restore");
            }
        }

        if !self.local_storage.is_empty() {
            let entries = serde_json::to_value(&self.local_storage)
                .map_err(|e| LatticeError::Driver(e.into()))?;
            page.execute(
                "var entries = arguments[0]; \
                 for (var k in entries) { localStorage.setItem(k, entries[k]); }",
                vec![entries],
            )
            .await?;
        }

        page.refresh().await?;
        debug!(
            cookies = self.cookies.len(),
            storage_keys = self.local_storage.len(),
            "restored persisted auth state"
        );
        Ok(())
    }

    /// Write the snapshot, overwriting any existing file at `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LatticeError::Driver(e.into()))?;
        }
        let raw = serde_json::to_vec_pretty(self).map_err(|e| LatticeError::Driver(e.into()))?;
        fs::write(path, raw).map_err(|e| LatticeError::Driver(e.into()))
    }

    /// Parse a snapshot from disk. A present-but-corrupt file is fatal.
    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| LatticeError::CorruptAuthState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&raw).map_err(|e| LatticeError::CorruptAuthState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Pure existence/readability check used to decide whether interactive
/// login can be skipped. Content is not parsed here.
pub fn state_file_exists(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Capture the page's session state and persist it. Call only after a
/// successful authentication step.
pub async fn save(page: &Page, path: &Path) -> Result<()> {
    let state = PersistedAuthState::capture(page).await?;
    state.write_to(path)
}
