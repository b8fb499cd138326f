//! Shared context and capability traits for extraction modules.
//!
//! Modules compose a [`ModuleContext`] value instead of inheriting
//! behavior: the context owns the page handle and knows the entity URL, the
//! capability traits ([`Navigable`], [`FieldReadable`], [`Listable`]) add
//! the behavior each module variant needs.

use async_trait::async_trait;
use lattice_browser::{Dom, Page, Pacer, ScrollEngine};
use lattice_common::{LatticeError, Result};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Build an entity URL under the configured base.
pub fn entity_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| LatticeError::Config(format!("bad entity path {path}: {e}")))
}

/// URL equality that ignores a trailing slash, which browsers add or drop
/// freely.
pub fn same_page(current: &Url, entity: &Url) -> bool {
    current.as_str().trim_end_matches('/') == entity.as_str().trim_end_matches('/')
}

/// Everything an entity module needs: the page it drives, the pacing
/// source, and where its entity lives.
pub struct ModuleContext {
    page: Page,
    pacer: Arc<Pacer>,
    entity_url: Url,
    /// Match the entity URL as a prefix instead of exactly. List pages grow
    /// query parameters while staying "the same page".
    prefix_match: bool,
    /// Isolated contexts own their window and close it on dispose.
    isolated: bool,
}

impl ModuleContext {
    pub fn new(page: Page, pacer: Arc<Pacer>, entity_url: Url, isolated: bool) -> Self {
        Self {
            page,
            pacer,
            entity_url,
            prefix_match: false,
            isolated,
        }
    }

    pub fn with_prefix_match(mut self) -> Self {
        self.prefix_match = true;
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn entity_url(&self) -> &Url {
        &self.entity_url
    }

    pub fn dom(&self) -> Dom<'_> {
        Dom::new(&self.page)
    }

    pub fn scroll(&self) -> ScrollEngine<'_, Page> {
        ScrollEngine::new(&self.page, &self.pacer)
    }

    /// Navigate to the entity URL unless the page is already there.
    pub async fn init(&self) -> Result<()> {
        let current = self.page.current_url().await?;
        let already_there = if self.prefix_match {
            current.as_str().starts_with(self.entity_url.as_str())
        } else {
            same_page(&current, &self.entity_url)
        };
        if already_there {
            return Ok(());
        }
        self.page.goto(self.entity_url.as_str()).await?;
        debug!(url = %self.entity_url, "navigated to entity page");
        Ok(())
    }

    /// Release the context. Isolated contexts close their window; shared
    /// ones leave the caller's page alone.
    pub async fn dispose(self) -> Result<()> {
        if self.isolated {
            self.page.close().await?;
        }
        Ok(())
    }
}

/// Modules that know how to reach their entity's page.
#[async_trait]
pub trait Navigable: Send + Sync {
    fn context(&self) -> &ModuleContext;

    /// Idempotent navigation: a no-op when the page is already on the
    /// entity URL.
    async fn init(&self) -> Result<()> {
        self.context().init().await
    }
}

/// Modules that read individual fields off their entity's page. Reads
/// lazily re-navigate, then degrade to the empty string per the resilient
/// accessor contract.
#[async_trait]
pub trait FieldReadable: Navigable {
    async fn read_text(&self, selector: &str) -> Result<String> {
        self.init().await?;
        Ok(self
            .context()
            .dom()
            .text_content_or_empty(selector, None)
            .await)
    }

    async fn read_attribute(&self, selector: &str, attribute: &str) -> Result<String> {
        self.init().await?;
        Ok(self
            .context()
            .dom()
            .attribute_or_empty(selector, attribute, None)
            .await)
    }
}

/// Modules that enumerate sub-items (lists, feeds, paginated results).
#[async_trait]
pub trait Listable: Navigable {
    type Item;

    async fn items(&self) -> Result<Vec<Self::Item>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_urls_join_under_the_base() {
        let base = Url::parse("https://www.linkedin.com").unwrap();
        assert_eq!(
            entity_url(&base, "in/jane-doe").unwrap().as_str(),
            "https://www.linkedin.com/in/jane-doe"
        );
        assert_eq!(
            entity_url(&base, "groups/12345").unwrap().as_str(),
            "https://www.linkedin.com/groups/12345"
        );
    }

    #[test]
    fn same_page_ignores_trailing_slash() {
        let a = Url::parse("https://www.linkedin.com/in/jane-doe/").unwrap();
        let b = Url::parse("https://www.linkedin.com/in/jane-doe").unwrap();
        assert!(same_page(&a, &b));

        let c = Url::parse("https://www.linkedin.com/in/someone-else").unwrap();
        assert!(!same_page(&a, &c));
    }
}
