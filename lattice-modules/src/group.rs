//! Group extraction: name, membership size, and the post feed.

use crate::context::{entity_url, FieldReadable, ModuleContext, Navigable};
use crate::records::GroupPost;
use async_trait::async_trait;
use lattice_browser::dom::DEFAULT_CLICK_CAP;
use lattice_browser::{Pacer, Page};
use lattice_common::Result;
use lattice_config::GroupSelectors;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub struct GroupModule {
    context: ModuleContext,
    selectors: GroupSelectors,
    id: String,
}

impl GroupModule {
    pub(crate) fn new(
        page: Page,
        pacer: Arc<Pacer>,
        base_url: &Url,
        id: &str,
        selectors: GroupSelectors,
        isolated: bool,
    ) -> Result<Self> {
        let url = entity_url(base_url, &format!("groups/{id}"))?;
        Ok(Self {
            context: ModuleContext::new(page, pacer, url, isolated),
            selectors,
            id: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn name(&self) -> Result<String> {
        self.read_text(&self.selectors.name).await
    }

    pub async fn member_count(&self) -> Result<Option<u64>> {
        let text = self.read_text(&self.selectors.member_count).await?;
        Ok(parse_member_count(&text))
    }

    /// Reveal the whole feed and enumerate its posts.
    ///
    /// A group whose feed never renders is a reported, non-fatal extraction
    /// failure: we log it and hand back no posts so a batch run can move on.
    /// The exhaustive scroll has no built-in cap; a feed that keeps lazy-
    /// loading keeps this call alive.
    pub async fn posts(&self) -> Result<Vec<GroupPost>> {
        self.init().await?;
        let dom = self.context.dom();

        if !dom.element_present(&self.selectors.post, None).await {
            warn!(group = %self.id, "post feed never rendered; returning no posts");
            return Ok(Vec::new());
        }

        self.context.scroll().scroll_until_end_of_page().await?;
        let sweep = dom
            .click_until_gone(&self.selectors.post_see_more, None, DEFAULT_CLICK_CAP)
            .await;
        debug!(group = %self.id, clicks = sweep.clicks(), "expanded collapsed posts");

        let elements = match self.context.page().find_all(&self.selectors.post).await {
            Ok(elements) => elements,
            Err(e) => {
                warn!(group = %self.id, error = %e, "post enumeration failed; returning no posts");
                return Ok(Vec::new());
            }
        };

        let mut posts = Vec::with_capacity(elements.len());
        for element in &elements {
            let author = dom
                .text_content_or_empty(&self.selectors.post_author, Some(element))
                .await;
            let body = dom
                .text_content_or_empty(&self.selectors.post_body, Some(element))
                .await;
            if author.is_empty() && body.is_empty() {
                continue;
            }
            posts.push(GroupPost { author, body });
        }
        Ok(posts)
    }

    pub async fn dispose(self) -> Result<()> {
        self.context.dispose().await
    }
}

#[async_trait]
impl Navigable for GroupModule {
    fn context(&self) -> &ModuleContext {
        &self.context
    }
}

#[async_trait]
impl FieldReadable for GroupModule {}

/// Pull the leading number out of a blurb like "1,234 members".
fn parse_member_count(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_member_counts_with_separators() {
        assert_eq!(parse_member_count("1,234 members"), Some(1_234));
        assert_eq!(parse_member_count("Members: 56"), Some(56));
        assert_eq!(parse_member_count("12,345,678 members"), Some(12_345_678));
    }

    #[test]
    fn absent_counts_parse_to_none() {
        assert_eq!(parse_member_count(""), None);
        assert_eq!(parse_member_count("private group"), None);
    }
}
