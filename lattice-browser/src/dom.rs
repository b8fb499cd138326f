//! Resilient DOM reads.
//!
//! Lazily-rendered pages routinely lack an element at query time, so these
//! primitives degrade instead of erroring: text and attribute reads fall
//! back to the empty string, presence checks to `false`. Callers must treat
//! an empty string as "absent or unreadable", not as a meaningful value.
//!
//! Every operation takes an optional element scope so the same primitive
//! works at page level or within a previously-located subtree. The accessor
//! talks to a [`DomSurface`] rather than to the page directly so the
//! degrade contract is testable against a stub.

use crate::page::{Page, PageElement};
use async_trait::async_trait;
use lattice_common::Result;
use std::time::Duration;
use tracing::debug;

/// Hard cap for [`Dom::click_until_gone`]. A site that never removes the
/// clicked control would otherwise keep the sweep alive forever.
pub const DEFAULT_CLICK_CAP: u32 = 50;

/// Outcome of a click sweep over a "show more" style control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickSweep {
    /// The control disappeared after this many clicks; the content is fully
    /// expanded.
    ElementGone { clicks: u32 },
    /// The iteration cap fired first; the page may still hold collapsed
    /// content.
    CapReached { clicks: u32 },
}

impl ClickSweep {
    pub fn clicks(&self) -> u32 {
        match *self {
            ClickSweep::ElementGone { clicks } | ClickSweep::CapReached { clicks } => clicks,
        }
    }
}

/// The minimal lookup surface the accessor needs from a page.
#[async_trait]
pub trait DomSurface {
    type Node: DomNode + Send + Sync;

    /// Page-level lookup, waiting out the bounded selector timeout.
    async fn resolve_selector(&self, selector: &str) -> Option<Self::Node>;

    /// Bounded presence probe at page or subtree scope.
    async fn probe(&self, selector: &str, scope: Option<&Self::Node>, timeout: Duration) -> bool;

    fn default_timeout(&self) -> Duration;
}

/// A resolved node the accessor can read or click.
#[async_trait]
pub trait DomNode: Sized {
    /// Immediate lookup within this node's subtree.
    async fn resolve_child(&self, selector: &str) -> Option<Self>;
    async fn text(&self) -> Result<String>;
    async fn attr(&self, attribute: &str) -> Result<Option<String>>;
    async fn click(&self) -> Result<()>;
}

#[async_trait]
impl DomSurface for Page {
    type Node = PageElement;

    async fn resolve_selector(&self, selector: &str) -> Option<PageElement> {
        // Page-level reads wait out the bounded selector timeout, the way a
        // freshly navigated page needs them to.
        self.wait_for(selector).await.ok()
    }

    async fn probe(&self, selector: &str, scope: Option<&PageElement>, timeout: Duration) -> bool {
        match scope {
            None => self.wait_for_within(selector, timeout).await.is_ok(),
            Some(parent) => parent.wait_for_within(selector, timeout).await.is_ok(),
        }
    }

    fn default_timeout(&self) -> Duration {
        self.selector_timeout()
    }
}

#[async_trait]
impl DomNode for PageElement {
    async fn resolve_child(&self, selector: &str) -> Option<PageElement> {
        // Scoped reads resolve against an already-located subtree and fail
        // fast.
        self.find(selector).await.ok()
    }

    async fn text(&self) -> Result<String> {
        PageElement::text(self).await
    }

    async fn attr(&self, attribute: &str) -> Result<Option<String>> {
        PageElement::attr(self, attribute).await
    }

    async fn click(&self) -> Result<()> {
        PageElement::click(self).await
    }
}

/// Retrying, fault-tolerant read primitives over one page.
pub struct Dom<'p, S: DomSurface + Sync = Page> {
    page: &'p S,
}

impl<'p, S: DomSurface + Sync> Dom<'p, S> {
    pub fn new(page: &'p S) -> Self {
        Self { page }
    }

    async fn resolve(&self, selector: &str, scope: Option<&S::Node>) -> Option<S::Node> {
        match scope {
            None => self.page.resolve_selector(selector).await,
            Some(parent) => parent.resolve_child(selector).await,
        }
    }

    /// Text of the selected element, or the empty string when the selector
    /// is missing, detached, or times out.
    pub async fn text_content_or_empty(
        &self,
        selector: &str,
        scope: Option<&S::Node>,
    ) -> String {
        match self.resolve(selector, scope).await {
            Some(element) => element.text().await.unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Text of the selected element with the ignored sub-element's label
    /// removed. Removes the LAST occurrence of the label, preserving earlier
    /// legitimate content when the fragment repeats.
    pub async fn filtered_text_content(
        &self,
        selector: &str,
        ignored_sub_selector: &str,
        scope: Option<&S::Node>,
    ) -> String {
        let text = self.text_content_or_empty(selector, scope).await;
        if text.is_empty() {
            return text;
        }
        let combined = format!("{selector}{ignored_sub_selector}");
        let ignored = self.text_content_or_empty(&combined, scope).await;
        strip_last_occurrence(&text, &ignored)
    }

    /// Attribute value of the selected element, or the empty string.
    pub async fn attribute_or_empty(
        &self,
        selector: &str,
        attribute: &str,
        scope: Option<&S::Node>,
    ) -> String {
        match self.resolve(selector, scope).await {
            Some(element) => element
                .attr(attribute)
                .await
                .ok()
                .flatten()
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Whether the selector appears within the page's bounded timeout.
    /// Never errors.
    pub async fn element_present(&self, selector: &str, scope: Option<&S::Node>) -> bool {
        self.element_present_within(selector, scope, self.page.default_timeout())
            .await
    }

    /// Presence check with an explicit bounded wait.
    pub async fn element_present_within(
        &self,
        selector: &str,
        scope: Option<&S::Node>,
        timeout: Duration,
    ) -> bool {
        self.page.probe(selector, scope, timeout).await
    }

    /// Click the selector until it disappears, up to `cap` clicks. Used for
    /// "show more" controls that must be fully expanded before reading.
    /// Termination relies on each click removing or replacing the target,
    /// hence the cap.
    pub async fn click_until_gone(
        &self,
        selector: &str,
        scope: Option<&S::Node>,
        cap: u32,
    ) -> ClickSweep {
        let mut clicks = 0;
        while clicks < cap {
            let target = self.resolve(selector, scope).await;
            let clicked = match target {
                Some(element) => element.click().await.is_ok(),
                None => false,
            };
            if !clicked {
                return ClickSweep::ElementGone { clicks };
            }
            clicks += 1;
        }
        debug!(selector, cap, "click sweep hit its iteration cap");
        ClickSweep::CapReached { clicks }
    }
}

/// Remove the last occurrence of `needle` from `text`. Empty or unmatched
/// needles leave the text untouched.
pub fn strip_last_occurrence(text: &str, needle: &str) -> String {
    if needle.is_empty() {
        return text.to_string();
    }
    match text.rfind(needle) {
        Some(index) => {
            let mut out = String::with_capacity(text.len() - needle.len());
            out.push_str(&text[..index]);
            out.push_str(&text[index + needle.len()..]);
            out
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_common::LatticeError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// A node whose reads are scripted. `text: None` simulates an element
    /// that detached between lookup and read.
    #[derive(Clone, Default)]
    struct StubNode {
        text: Option<String>,
        attr: Option<String>,
        clicks: Arc<AtomicU32>,
    }

    #[async_trait]
    impl DomNode for StubNode {
        async fn resolve_child(&self, _selector: &str) -> Option<StubNode> {
            None
        }

        async fn text(&self) -> Result<String> {
            self.text
                .clone()
                .ok_or_else(|| LatticeError::Timeout("stale element".into()))
        }

        async fn attr(&self, _attribute: &str) -> Result<Option<String>> {
            Ok(self.attr.clone())
        }

        async fn click(&self) -> Result<()> {
            self.clicks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubSurface {
        nodes: HashMap<String, StubNode>,
        clicks: Arc<AtomicU32>,
        /// When set, every selector stops resolving once this many clicks
        /// have landed.
        vanish_after: Option<u32>,
    }

    impl StubSurface {
        fn with_text(mut self, selector: &str, text: &str) -> Self {
            self.nodes.insert(
                selector.into(),
                StubNode {
                    text: Some(text.into()),
                    ..StubNode::default()
                },
            );
            self
        }

        fn with_control(mut self, selector: &str, vanish_after: Option<u32>) -> Self {
            self.nodes.insert(
                selector.into(),
                StubNode {
                    clicks: Arc::clone(&self.clicks),
                    ..StubNode::default()
                },
            );
            self.vanish_after = vanish_after;
            self
        }
    }

    #[async_trait]
    impl DomSurface for StubSurface {
        type Node = StubNode;

        async fn resolve_selector(&self, selector: &str) -> Option<StubNode> {
            if self
                .vanish_after
                .is_some_and(|n| self.clicks.load(Ordering::SeqCst) >= n)
            {
                return None;
            }
            self.nodes.get(selector).cloned()
        }

        async fn probe(
            &self,
            selector: &str,
            scope: Option<&StubNode>,
            _timeout: Duration,
        ) -> bool {
            match scope {
                None => self.resolve_selector(selector).await.is_some(),
                Some(parent) => parent.resolve_child(selector).await.is_some(),
            }
        }

        fn default_timeout(&self) -> Duration {
            Duration::from_millis(10)
        }
    }

    #[tokio::test]
    async fn absent_selectors_degrade_to_empty_reads() {
        let surface = StubSurface::default();
        let dom = Dom::new(&surface);

        assert_eq!(dom.text_content_or_empty("#missing", None).await, "");
        assert_eq!(dom.attribute_or_empty("#missing", "src", None).await, "");
        assert_eq!(dom.filtered_text_content("#missing", " .more", None).await, "");
        assert!(!dom.element_present("#missing", None).await);
    }

    #[tokio::test]
    async fn unreadable_nodes_degrade_to_empty() {
        // Resolution succeeds but the read fails: same contract.
        let surface = StubSurface::default().with_control("#flaky", None);
        let dom = Dom::new(&surface);

        assert_eq!(dom.text_content_or_empty("#flaky", None).await, "");
        assert_eq!(dom.attribute_or_empty("#flaky", "href", None).await, "");
    }

    #[tokio::test]
    async fn filtered_text_strips_the_control_label() {
        let surface = StubSurface::default()
            .with_text("#about", "A show-more B show-more")
            .with_text("#about .more", "show-more");
        let dom = Dom::new(&surface);

        assert_eq!(
            dom.filtered_text_content("#about", " .more", None).await,
            "A show-more B "
        );
    }

    #[tokio::test]
    async fn click_sweep_stops_when_the_control_vanishes() {
        let surface = StubSurface::default().with_control("#more", Some(3));
        let dom = Dom::new(&surface);

        assert_eq!(
            dom.click_until_gone("#more", None, DEFAULT_CLICK_CAP).await,
            ClickSweep::ElementGone { clicks: 3 }
        );
    }

    #[tokio::test]
    async fn click_sweep_hits_the_cap_on_a_sticky_control() {
        let surface = StubSurface::default().with_control("#more", None);
        let dom = Dom::new(&surface);

        assert_eq!(
            dom.click_until_gone("#more", None, 5).await,
            ClickSweep::CapReached { clicks: 5 }
        );
    }

    #[test]
    fn strips_only_the_last_occurrence() {
        assert_eq!(
            strip_last_occurrence("A show-more B show-more", "show-more"),
            "A show-more B "
        );
    }

    #[test]
    fn single_occurrence_is_removed() {
        assert_eq!(
            strip_last_occurrence("Great role at Corp…see more", "…see more"),
            "Great role at Corp"
        );
    }

    #[test]
    fn unmatched_needle_leaves_text_untouched() {
        assert_eq!(strip_last_occurrence("unchanged text", "absent"), "unchanged text");
    }

    #[test]
    fn empty_needle_leaves_text_untouched() {
        assert_eq!(strip_last_occurrence("anything", ""), "anything");
    }

    #[test]
    fn click_sweep_reports_click_count() {
        assert_eq!(ClickSweep::ElementGone { clicks: 3 }.clicks(), 3);
        assert_eq!(ClickSweep::CapReached { clicks: 50 }.clicks(), 50);
    }
}
