//! Page and element handles over the WebDriver client.
//!
//! A WebDriver session has one cookie jar shared by all of its windows, so a
//! "page" here is one window handle. Every operation re-focuses its window
//! first, which keeps the one-page-one-caller discipline intact even when
//! several [`Page`] handles share the client.

use fantoccini::elements::Element;
use fantoccini::{Client, Locator};
use lattice_common::{LatticeError, Result};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Map a selector string to a locator. Selectors beginning with an XPath
/// axis are treated as XPath, everything else as CSS.
pub fn locator(selector: &str) -> Locator<'_> {
    if selector.starts_with('/') || selector.starts_with("./") || selector.starts_with('(') {
        Locator::XPath(selector)
    } else {
        Locator::Css(selector)
    }
}

pub(crate) fn wd_err(e: fantoccini::error::CmdError) -> LatticeError {
    LatticeError::Driver(e.into())
}

/// One browser window within a session.
#[derive(Debug, Clone)]
pub struct Page {
    client: Client,
    window: fantoccini::wd::WindowHandle,
    selector_timeout: Duration,
}

impl Page {
    pub(crate) fn new(
        client: Client,
        window: fantoccini::wd::WindowHandle,
        selector_timeout: Duration,
    ) -> Self {
        Self {
            client,
            window,
            selector_timeout,
        }
    }

    pub fn selector_timeout(&self) -> Duration {
        self.selector_timeout
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn window_handle(&self) -> &fantoccini::wd::WindowHandle {
        &self.window
    }

    /// Re-focus this page's window if another handle moved the driver away.
    async fn focus(&self) -> Result<()> {
        let current = self.client.window().await.map_err(wd_err)?;
        if current != self.window {
            self.client
                .switch_to_window(self.window.clone())
                .await
                .map_err(wd_err)?;
        }
        Ok(())
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.focus().await?;
        self.client.goto(url).await.map_err(wd_err)
    }

    pub async fn current_url(&self) -> Result<url::Url> {
        self.focus().await?;
        self.client.current_url().await.map_err(wd_err)
    }

    pub async fn refresh(&self) -> Result<()> {
        self.focus().await?;
        self.client.refresh().await.map_err(wd_err)
    }

    /// Find a single element without waiting.
    pub async fn find(&self, selector: &str) -> Result<PageElement> {
        self.focus().await?;
        let element = self.client.find(locator(selector)).await.map_err(wd_err)?;
        Ok(PageElement { element })
    }

    /// Find zero or more elements without waiting.
    pub async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>> {
        self.focus().await?;
        let elements = self
            .client
            .find_all(locator(selector))
            .await
            .map_err(wd_err)?;
        Ok(elements
            .into_iter()
            .map(|element| PageElement { element })
            .collect())
    }

    /// Wait for an element with the page's default bounded timeout.
    pub async fn wait_for(&self, selector: &str) -> Result<PageElement> {
        self.wait_for_within(selector, self.selector_timeout).await
    }

    /// Wait for an element with an explicit bounded timeout.
    pub async fn wait_for_within(&self, selector: &str, timeout: Duration) -> Result<PageElement> {
        self.focus().await?;
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await
            .map_err(|_| LatticeError::Timeout(selector.to_string()))?;
        Ok(PageElement { element })
    }

    /// Run a script in the page. Element arguments can be passed through
    /// `serde_json::to_value(&element)`.
    pub async fn execute(
        &self,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        self.focus().await?;
        self.client.execute(script, args).await.map_err(wd_err)
    }

    /// Scroll an overflow container by its own scroll height.
    pub async fn scroll_element(&self, element: &PageElement) -> Result<()> {
        let handle = serde_json::to_value(&element.element)
            .map_err(|e| LatticeError::Driver(e.into()))?;
        self.execute(
            "var n = arguments[0]; n.scrollBy(0, n.scrollHeight);",
            vec![handle],
        )
        .await?;
        Ok(())
    }

    /// True once a container's scroll position has reached its bottom.
    pub async fn element_completely_scrolled(&self, element: &PageElement) -> Result<bool> {
        let handle = serde_json::to_value(&element.element)
            .map_err(|e| LatticeError::Driver(e.into()))?;
        let value = self
            .execute(
                "var n = arguments[0]; \
                 return n.scrollHeight - Math.abs(n.scrollTop) === n.clientHeight;",
                vec![handle],
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Close this window. The session and its other windows stay alive.
    pub async fn close(self) -> Result<()> {
        self.focus().await?;
        self.client.close_window().await.map_err(wd_err)
    }
}

/// A resolved element, scoping further lookups to its subtree.
#[derive(Debug, Clone)]
pub struct PageElement {
    element: Element,
}

impl PageElement {
    pub async fn find(&self, selector: &str) -> Result<PageElement> {
        let element = self.element.find(locator(selector)).await.map_err(wd_err)?;
        Ok(PageElement { element })
    }

    pub async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>> {
        let elements = self
            .element
            .find_all(locator(selector))
            .await
            .map_err(wd_err)?;
        Ok(elements
            .into_iter()
            .map(|element| PageElement { element })
            .collect())
    }

    /// Poll for a descendant until the timeout elapses. Element handles have
    /// no wait built in, so this is a 100 ms polling loop.
    pub async fn wait_for_within(&self, selector: &str, timeout: Duration) -> Result<PageElement> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(found) = self.find(selector).await {
                return Ok(found);
            }
            if Instant::now() >= deadline {
                return Err(LatticeError::Timeout(selector.to_string()));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    pub async fn text(&self) -> Result<String> {
        self.element.text().await.map_err(wd_err)
    }

    pub async fn attr(&self, attribute: &str) -> Result<Option<String>> {
        self.element.attr(attribute).await.map_err(wd_err)
    }

    pub async fn click(&self) -> Result<()> {
        self.element.clone().click().await.map_err(wd_err)?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.element.clone().clear().await.map_err(wd_err)
    }

    pub async fn send_keys(&self, text: &str) -> Result<()> {
        self.element.send_keys(text).await.map_err(wd_err)
    }

    pub(crate) fn raw(&self) -> &Element {
        &self.element
    }
}
