//! Root client: session lifecycle, login, and entity module construction.

use crate::context::Navigable;
use crate::group::GroupModule;
use crate::job_listing::JobListingModule;
use crate::user_profile::UserProfileModule;
use lattice_browser::auth_state;
use lattice_browser::{Page, Session, SessionConfig};
use lattice_common::{LatticeError, Result};
use lattice_config::{ScraperConfig, Selectors};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// The one handle callers hold. Owns the browser session and hands out
/// entity modules bound to it.
pub struct LatticeClient {
    session: Session,
    selectors: Selectors,
}

impl LatticeClient {
    /// Launch a session per the given configuration and land on the base
    /// URL, restoring any persisted auth state on the way.
    pub async fn open(config: ScraperConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LatticeError::Config(format!("bad base_url {}: {e}", config.base_url)))?;
        let session = Session::open(SessionConfig {
            engine: config.engine,
            webdriver_url: config.webdriver_url,
            headless: config.headless,
            window_size: config.window_size,
            base_url,
            auth_state_path: config.auth_state_path,
            block_resources: config.block_resources,
            selector_timeout: Duration::from_millis(config.selector_timeout_ms),
            ..SessionConfig::default()
        })
        .await?;
        Ok(Self {
            session,
            selectors: config.selectors,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Perform the interactive login flow, typing credentials at a human
    /// cadence.
    ///
    /// A no-op when a persisted auth snapshot was already restored into this
    /// session: the cookies are live and re-submitting the form would only
    /// trip the site's defenses. With `remember` set, a successful login is
    /// snapshotted to the configured auth state path.
    pub async fn login(&self, username: &str, password: &str, remember: bool) -> Result<()> {
        if !login_required(self.session.loaded_from_persisted_state()) {
            info!("session restored from persisted state; skipping login");
            return Ok(());
        }

        let page = self.session.page();
        let pacer = self.session.pacer();
        let login = &self.selectors.login;

        let login_url = self
            .session
            .base_url()
            .join("login")
            .map_err(|e| LatticeError::Config(format!("bad login path: {e}")))?;
        page.goto(login_url.as_str()).await?;

        let username_field = page.wait_for(&login.username).await?;
        username_field.clear().await?;
        pacer.type_text_human_like(&username_field, username).await?;

        let password_field = page.wait_for(&login.password).await?;
        password_field.clear().await?;
        pacer.type_text_human_like(&password_field, password).await?;

        page.wait_for(&login.submit).await?.click().await?;
        debug!("login form submitted");

        if remember {
            self.session.save_auth_state().await?;
        }
        Ok(())
    }

    /// Whether a later [`login`](Self::login) call would actually submit the
    /// form, given the configured auth state path.
    pub fn needs_login(&self) -> bool {
        login_required(self.session.loaded_from_persisted_state())
    }

    /// A module for the user profile at `in/{id}`. Isolated modules get
    /// their own window; shared ones drive the session's root page.
    pub async fn user(&self, id: &str, isolated: bool) -> Result<UserProfileModule> {
        let module = UserProfileModule::new(
            self.page_for(isolated).await?,
            self.session.pacer_handle(),
            self.session.base_url(),
            id,
            self.selectors.user_profile.clone(),
            isolated,
        )?;
        module.init().await?;
        Ok(module)
    }

    /// A module for the group at `groups/{id}`.
    pub async fn group(&self, id: &str, isolated: bool) -> Result<GroupModule> {
        let module = GroupModule::new(
            self.page_for(isolated).await?,
            self.session.pacer_handle(),
            self.session.base_url(),
            id,
            self.selectors.group.clone(),
            isolated,
        )?;
        module.init().await?;
        Ok(module)
    }

    /// A module for the job collections listing.
    pub async fn jobs(&self, isolated: bool) -> Result<JobListingModule> {
        let module = JobListingModule::new(
            self.page_for(isolated).await?,
            self.session.pacer_handle(),
            self.session.base_url(),
            self.selectors.job_listing.clone(),
            isolated,
        )?;
        module.init().await?;
        Ok(module)
    }

    async fn page_for(&self, isolated: bool) -> Result<Page> {
        if isolated {
            self.session.new_page().await
        } else {
            Ok(self.session.page().clone())
        }
    }

    /// Tear the session down. Best-effort; failures are logged, not raised.
    pub async fn close(self) {
        self.session.close().await;
    }
}

/// The login decision, kept pure so it can be exercised without a browser:
/// a session restored from a persisted snapshot never logs in again.
fn login_required(restored_from_state: bool) -> bool {
    !restored_from_state
}

/// Whether a persisted auth snapshot exists at `path`. Presence alone is
/// enough to skip login on the next open; validity is checked at restore
/// time.
pub fn auth_state_available(path: Option<&Path>) -> bool {
    path.is_some_and(auth_state::state_file_exists)
}
