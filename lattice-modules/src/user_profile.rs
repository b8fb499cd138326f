//! User profile extraction.

use crate::context::{entity_url, FieldReadable, ModuleContext, Navigable};
use crate::records::UserProfile;
use async_trait::async_trait;
use lattice_browser::{Pacer, Page};
use lattice_common::Result;
use lattice_config::UserProfileSelectors;
use std::sync::Arc;
use url::Url;

pub struct UserProfileModule {
    context: ModuleContext,
    selectors: UserProfileSelectors,
    id: String,
}

impl UserProfileModule {
    pub(crate) fn new(
        page: Page,
        pacer: Arc<Pacer>,
        base_url: &Url,
        id: &str,
        selectors: UserProfileSelectors,
        isolated: bool,
    ) -> Result<Self> {
        let url = entity_url(base_url, &format!("in/{id}"))?;
        Ok(Self {
            context: ModuleContext::new(page, pacer, url, isolated),
            selectors,
            id: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn full_name(&self) -> Result<String> {
        self.read_text(&self.selectors.full_name).await
    }

    pub async fn bio(&self) -> Result<String> {
        self.read_text(&self.selectors.bio).await
    }

    /// The about section with the "show more" control's label filtered out
    /// of the text.
    pub async fn about(&self) -> Result<String> {
        self.init().await?;
        Ok(self
            .context
            .dom()
            .filtered_text_content(&self.selectors.about, &self.selectors.about_show_more, None)
            .await)
    }

    pub async fn avatar_url(&self) -> Result<String> {
        self.read_attribute(&self.selectors.avatar, "src").await
    }

    /// Read every profile field, with a lazy scroll between reads so the
    /// access pattern stays human-paced.
    pub async fn snapshot(&self) -> Result<UserProfile> {
        self.init().await?;
        let scroll = self.context.scroll();

        let full_name = self.full_name().await?;
        scroll.lazy_scroll().await?;
        let bio = self.bio().await?;
        scroll.lazy_scroll().await?;
        let about = self.about().await?;
        scroll.lazy_scroll().await?;
        let avatar_url = self.avatar_url().await?;

        Ok(UserProfile {
            id: self.id.clone(),
            full_name,
            bio,
            about,
            avatar_url,
        })
    }

    /// Release the module; closes the window when the target was isolated.
    pub async fn dispose(self) -> Result<()> {
        self.context.dispose().await
    }
}

#[async_trait]
impl Navigable for UserProfileModule {
    fn context(&self) -> &ModuleContext {
        &self.context
    }
}

#[async_trait]
impl FieldReadable for UserProfileModule {}
