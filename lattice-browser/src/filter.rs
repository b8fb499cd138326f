//! Resource filter: aborts non-essential requests to speed up page loads.
//!
//! The policy itself is a plain value with a pure [`ResourceFilter::decision`]
//! so it can be tested without a browser. Installation goes through the
//! chromedriver CDP passthrough; engines without a CDP bridge run unfiltered.

use crate::cdp::CdpCommand;
use fantoccini::Client;
use lattice_common::{LatticeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

/// Declared type of an outgoing request, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Script,
    Image,
    Media,
    Font,
    Xhr,
    Fetch,
    Websocket,
    Other,
}

/// Outcome of the filter for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Continue,
    Abort,
}

/// Blocking policy for one page, applied before navigation and active for
/// the page's lifetime.
#[derive(Debug, Clone)]
pub struct ResourceFilter {
    blocked_types: HashSet<ResourceType>,
    image_url_pattern: Regex,
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self::new([ResourceType::Image, ResourceType::Media, ResourceType::Font])
    }
}

impl ResourceFilter {
    pub fn new(blocked: impl IntoIterator<Item = ResourceType>) -> Self {
        Self {
            blocked_types: blocked.into_iter().collect(),
            // Image URLs are aborted by extension even when the declared
            // resource type claims otherwise.
            image_url_pattern: Regex::new(r"\.(jpe?g|png|gif)").expect("static regex"),
        }
    }

    /// Decide the fate of a request: abort when its declared type is blocked
    /// or its URL carries an image extension, continue otherwise.
    pub fn decision(&self, resource_type: ResourceType, url: &str) -> RouteDecision {
        if self.blocked_types.contains(&resource_type) || self.image_url_pattern.is_match(url) {
            RouteDecision::Abort
        } else {
            RouteDecision::Continue
        }
    }

    /// URL patterns equivalent to this policy in CDP `Network.setBlockedURLs`
    /// form. Resource types are approximated by their common extensions,
    /// since the blocked-URL API only understands patterns.
    pub fn cdp_url_patterns(&self) -> Vec<String> {
        let mut patterns = vec![
            "*.jpg".to_string(),
            "*.jpeg".to_string(),
            "*.png".to_string(),
            "*.gif".to_string(),
        ];
        if self.blocked_types.contains(&ResourceType::Media) {
            patterns.extend(["*.mp4", "*.webm", "*.mp3", "*.m3u8"].map(String::from));
        }
        if self.blocked_types.contains(&ResourceType::Font) {
            patterns.extend(["*.woff", "*.woff2", "*.ttf", "*.otf"].map(String::from));
        }
        if self.blocked_types.contains(&ResourceType::Stylesheet) {
            patterns.push("*.css".to_string());
        }
        patterns
    }

    /// Install the policy on the driver's current target through the CDP
    /// passthrough endpoint. Chromium-family drivers only.
    pub async fn install(&self, client: &Client) -> Result<()> {
        client
            .issue_cmd(CdpCommand::new("Network.enable", json!({})))
            .await
            .map_err(|e| LatticeError::Driver(e.into()))?;
        client
            .issue_cmd(CdpCommand::new(
                "Network.setBlockedURLs",
                json!({ "urls": self.cdp_url_patterns() }),
            ))
            .await
            .map_err(|e| LatticeError::Driver(e.into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_declared_types() {
        let filter = ResourceFilter::default();
        assert_eq!(
            filter.decision(ResourceType::Image, "https://cdn.example.com/a"),
            RouteDecision::Abort
        );
        assert_eq!(
            filter.decision(ResourceType::Font, "https://cdn.example.com/f"),
            RouteDecision::Abort
        );
        assert_eq!(
            filter.decision(ResourceType::Document, "https://example.com/feed"),
            RouteDecision::Continue
        );
    }

    #[test]
    fn image_urls_abort_regardless_of_declared_type() {
        let filter = ResourceFilter::default();
        for url in [
            "https://cdn.example.com/avatar.png",
            "https://cdn.example.com/banner.jpg?w=200",
            "https://cdn.example.com/photo.jpeg",
            "https://cdn.example.com/anim.gif",
        ] {
            assert_eq!(
                filter.decision(ResourceType::Xhr, url),
                RouteDecision::Abort,
                "expected abort for {url}"
            );
        }
    }

    #[test]
    fn plain_requests_continue() {
        let filter = ResourceFilter::default();
        for url in [
            "https://example.com/in/someone",
            "https://example.com/api/graphql",
            "https://example.com/jpg-index.html",
        ] {
            assert_eq!(filter.decision(ResourceType::Fetch, url), RouteDecision::Continue);
        }
    }

    #[test]
    fn custom_block_set_is_honored() {
        let filter = ResourceFilter::new([ResourceType::Stylesheet]);
        assert_eq!(
            filter.decision(ResourceType::Stylesheet, "https://x/site.css"),
            RouteDecision::Abort
        );
        assert_eq!(
            filter.decision(ResourceType::Media, "https://x/clip.webm"),
            RouteDecision::Continue
        );
        assert!(filter.cdp_url_patterns().contains(&"*.css".to_string()));
    }
}
