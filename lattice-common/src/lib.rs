//! Common types shared across Lattice crates.
//!
//! This crate defines the workspace error taxonomy, the browser engine
//! selector, and centralised observability helpers. It is intentionally
//! lightweight so every crate can depend on it without pulling in the
//! browser automation stack.
//!
//! # Overview
//!
//! - [`BrowserEngine`]: which WebDriver-driven backend a session launches
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`LatticeError`] and [`Result`]: shared error handling
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod observability;

/// Browser backend driving a session.
///
/// Each engine maps to a WebDriver endpoint (chromedriver, geckodriver,
/// webkitwebdriver). Firefox is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    Chromium,
    #[default]
    Firefox,
    Webkit,
}

/// Error types used across the Lattice system.
///
/// The taxonomy distinguishes fatal failures (launch, corrupt persisted
/// state) from bounded-search failures (a selector genuinely absent after a
/// full scroll sweep). Transient DOM failures never appear here: the
/// resilient accessors degrade to empty values instead of erroring.
#[derive(thiserror::Error, Debug)]
pub enum LatticeError {
    /// The browser backend could not be launched or connected to. Fatal.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// A persisted auth state file existed but could not be parsed or
    /// replayed. Fatal: a corrupt state file is a configuration error.
    #[error("persisted auth state at {path} could not be restored: {reason}")]
    CorruptAuthState { path: PathBuf, reason: String },

    /// A target-seeking scroll exhausted its search budget. The selector is
    /// structurally absent, not merely slow to render.
    #[error("{selector} does not exist on the current page")]
    SelectorNotFound { selector: String },

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation exceeded its bounded wait.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// The WebDriver backend reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`LatticeError`].
pub type Result<T> = std::result::Result<T, LatticeError>;
