//! Scroll engine: reveals lazily-loaded content.
//!
//! Two strategies with different termination guarantees:
//!
//! - target-seeking scroll stops hard with a "not found" failure once the
//!   cumulative position exceeds the scrollable height;
//! - exhaustive scroll keeps going while content remains below the viewport,
//!   so a perpetually lazy-loading page keeps it alive. Callers that need a
//!   hard cap impose one themselves.
//!
//! The algorithms talk to a [`ScrollSurface`] rather than to the page
//! directly so their termination behavior is testable against a mock.

use crate::pacing::Pacer;
use crate::page::Page;
use async_trait::async_trait;
use lattice_common::{LatticeError, Result};
use std::time::Duration;
use tracing::debug;

/// The minimal scrolling surface the engine needs from a page.
#[async_trait]
pub trait ScrollSurface {
    async fn scrollable_height(&self) -> Result<f64>;
    async fn scroll_y(&self) -> Result<f64>;
    async fn scroll_to(&self, y: f64) -> Result<()>;
    async fn scroll_by(&self, dy: f64) -> Result<()>;
    /// Bounded presence probe.
    async fn element_exists(&self, selector: &str, timeout: Duration) -> bool;
    async fn scroll_into_view(&self, selector: &str) -> Result<()>;
}

#[async_trait]
impl ScrollSurface for Page {
    async fn scrollable_height(&self) -> Result<f64> {
        let value = self
            .execute("return document.body.scrollHeight;", vec![])
            .await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    async fn scroll_y(&self) -> Result<f64> {
        let value = self.execute("return window.scrollY;", vec![]).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        self.execute("window.scroll(0, arguments[0]);", vec![y.into()])
            .await?;
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<()> {
        self.execute("window.scrollBy(0, arguments[0]);", vec![dy.into()])
            .await?;
        Ok(())
    }

    async fn element_exists(&self, selector: &str, timeout: Duration) -> bool {
        self.wait_for_within(selector, timeout).await.is_ok()
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        let handle = serde_json::to_value(element.raw())
            .map_err(|e| LatticeError::Driver(e.into()))?;
        self.execute("arguments[0].scrollIntoView();", vec![handle])
            .await?;
        Ok(())
    }
}

/// Drives incremental page-height growth until content stabilises or a
/// target element appears. One engine per page; scroll reads and actions
/// within a call are strictly sequential.
pub struct ScrollEngine<'a, S: ScrollSurface + Sync> {
    surface: &'a S,
    pacer: &'a Pacer,
    /// Short wait used for the per-step presence probe of the
    /// target-seeking scroll.
    probe_timeout: Duration,
}

impl<'a, S: ScrollSurface + Sync> ScrollEngine<'a, S> {
    pub fn new(surface: &'a S, pacer: &'a Pacer) -> Self {
        Self {
            surface,
            pacer,
            probe_timeout: Duration::from_millis(500),
        }
    }

    /// Scroll in tenth-of-height steps until `selector` appears, then bring
    /// it into view. The step and the budget are re-measured each iteration
    /// because content growth changes both. Fails with
    /// [`LatticeError::SelectorNotFound`] once the cumulative position
    /// exceeds the scrollable height.
    pub async fn scroll_until_element_appears(&self, selector: &str) -> Result<()> {
        if !self
            .surface
            .element_exists(selector, self.probe_timeout)
            .await
        {
            self.surface.scroll_to(0.0).await?;
        }

        let mut position = 0.0_f64;
        let mut budget = self.surface.scrollable_height().await?;
        while position <= budget {
            if self
                .surface
                .element_exists(selector, self.probe_timeout)
                .await
            {
                self.surface.scroll_into_view(selector).await?;
                return Ok(());
            }
            position += self.surface.scrollable_height().await? / 10.0;
            budget = self.surface.scrollable_height().await?;
            self.surface.scroll_to(position).await?;
        }

        Err(LatticeError::SelectorNotFound {
            selector: selector.to_string(),
        })
    }

    /// Scroll until no content remains below the viewport. Each cycle jumps
    /// by a random factor of the current height and settles for a random
    /// interval; the jitter is an automation-signature countermeasure, not
    /// cosmetic. Returns the number of scroll+sleep cycles performed.
    pub async fn scroll_until_end_of_page(&self) -> Result<u32> {
        let mut cycles = 0_u32;
        loop {
            let factor = self.pacer.scroll_factor();
            debug!(factor, "scroll cycle");
            let height = self.surface.scrollable_height().await?;
            self.surface.scroll_to(height * factor).await?;
            cycles += 1;
            self.pacer.settle_delay().await;

            let remaining =
                self.surface.scrollable_height().await? - self.surface.scroll_y().await?;
            if remaining <= 0.0 {
                return Ok(cycles);
            }
        }
    }

    /// One small randomized scroll plus a short sleep; paces discrete
    /// extraction steps rather than revealing content exhaustively.
    pub async fn lazy_scroll(&self) -> Result<()> {
        let coefficient = self.pacer.lazy_coefficient();
        let height = self.surface.scrollable_height().await?;
        self.surface.scroll_by(height * coefficient).await?;
        self.pacer.random_delay(0, 100).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock surface with a scriptable height progression.
    struct MockSurface {
        state: Mutex<MockState>,
    }

    struct MockState {
        height: f64,
        max_height: f64,
        growth: f64,
        scroll_y: f64,
        scrolls: u32,
        target_present: bool,
    }

    impl MockSurface {
        fn fixed(height: f64) -> Self {
            Self {
                state: Mutex::new(MockState {
                    height,
                    max_height: height,
                    growth: 0.0,
                    scroll_y: 0.0,
                    scrolls: 0,
                    target_present: false,
                }),
            }
        }

        fn growing(initial: f64, growth: f64, max: f64) -> Self {
            Self {
                state: Mutex::new(MockState {
                    height: initial,
                    max_height: max,
                    growth,
                    scroll_y: 0.0,
                    scrolls: 0,
                    target_present: false,
                }),
            }
        }

        fn scrolls(&self) -> u32 {
            self.state.lock().unwrap().scrolls
        }
    }

    #[async_trait]
    impl ScrollSurface for MockSurface {
        async fn scrollable_height(&self) -> Result<f64> {
            Ok(self.state.lock().unwrap().height)
        }

        async fn scroll_y(&self) -> Result<f64> {
            Ok(self.state.lock().unwrap().scroll_y)
        }

        async fn scroll_to(&self, y: f64) -> Result<()> {
            let mut s = self.state.lock().unwrap();
            s.scrolls += 1;
            s.scroll_y = y.min(s.height);
            if s.height < s.max_height {
                // Lazy loading: content appears below the fold.
                s.height = (s.height + s.growth).min(s.max_height);
            } else {
                // Fully loaded: the browser clamps the jump to the bottom.
                s.scroll_y = s.height;
            }
            Ok(())
        }

        async fn scroll_by(&self, dy: f64) -> Result<()> {
            let mut s = self.state.lock().unwrap();
            s.scrolls += 1;
            s.scroll_y = (s.scroll_y + dy).min(s.height);
            Ok(())
        }

        async fn element_exists(&self, _selector: &str, _timeout: Duration) -> bool {
            self.state.lock().unwrap().target_present
        }

        async fn scroll_into_view(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn target_seek_fails_hard_on_a_fixed_page() {
        let surface = MockSurface::fixed(1000.0);
        let pacer = Pacer::seeded(1);
        let engine = ScrollEngine::new(&surface, &pacer);

        let err = engine
            .scroll_until_element_appears("#missing")
            .await
            .expect_err("selector never appears");
        assert!(matches!(
            err,
            LatticeError::SelectorNotFound { ref selector } if selector == "#missing"
        ));
        // Tenth-of-height steps over a fixed 1000px page: the sweep is
        // bounded, not infinite.
        assert!(surface.scrolls() <= 12, "took {} scrolls", surface.scrolls());
    }

    #[tokio::test(start_paused = true)]
    async fn target_seek_finds_present_element_without_scrolling() {
        let surface = MockSurface::fixed(1000.0);
        surface.state.lock().unwrap().target_present = true;
        let pacer = Pacer::seeded(1);
        let engine = ScrollEngine::new(&surface, &pacer);

        engine
            .scroll_until_element_appears("#present")
            .await
            .expect("element is on the page");
        assert_eq!(surface.scrolls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustive_scroll_stops_after_three_growth_cycles() {
        // Page grows 1000 -> 2000 -> 3000, then the third jump lands at the
        // bottom: exactly three scroll+sleep cycles.
        let surface = MockSurface::growing(1000.0, 1000.0, 3000.0);
        let pacer = Pacer::seeded(99);
        let engine = ScrollEngine::new(&surface, &pacer);

        let cycles = engine.scroll_until_end_of_page().await.expect("terminates");
        assert_eq!(cycles, 3);
        assert_eq!(surface.scrolls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn lazy_scroll_advances_by_a_fraction_of_height() {
        let surface = MockSurface::fixed(2000.0);
        let pacer = Pacer::seeded(5);
        let engine = ScrollEngine::new(&surface, &pacer);

        engine.lazy_scroll().await.expect("lazy scroll");
        let y = surface.state.lock().unwrap().scroll_y;
        assert!((200.0..400.0).contains(&y), "scrolled {y}");
    }
}
