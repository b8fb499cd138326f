//! Job listing extraction: a paginated list revealed by scrolling its own
//! container.

use crate::context::{entity_url, Listable, ModuleContext, Navigable};
use crate::records::{JobListingPage, JobPosting};
use async_trait::async_trait;
use lattice_browser::{Pacer, Page};
use lattice_common::Result;
use lattice_config::JobListingSelectors;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// How many container scrolls to attempt before declaring the pagination
/// indicator structurally absent.
const SCROLL_ATTEMPT_CAP: u32 = 40;

pub struct JobListingModule {
    context: ModuleContext,
    selectors: JobListingSelectors,
}

impl JobListingModule {
    pub(crate) fn new(
        page: Page,
        pacer: Arc<Pacer>,
        base_url: &Url,
        selectors: JobListingSelectors,
        isolated: bool,
    ) -> Result<Self> {
        let url = entity_url(base_url, "jobs/collections")?;
        Ok(Self {
            // The site decorates this URL with query parameters; prefix
            // matching keeps init() idempotent anyway.
            context: ModuleContext::new(page, pacer, url, isolated).with_prefix_match(),
            selectors,
        })
    }

    /// Enumerate the visible job cards and the last advertised pagination
    /// index.
    ///
    /// Containers that never appear within the wait budget are a reported,
    /// non-fatal failure: batch callers must tolerate a constant share of
    /// unrenderable pages, so this logs and returns an empty page instead
    /// of erroring.
    pub async fn listing(&self) -> Result<JobListingPage> {
        self.init().await?;
        let page = self.context.page();
        let dom = self.context.dom();

        if !dom.element_present(&self.selectors.list, None).await
            || !dom.element_present(&self.selectors.container, None).await
        {
            warn!("job list containers missing within the wait budget; returning empty page");
            return Ok(JobListingPage::default());
        }

        let container = match page.find(&self.selectors.container).await {
            Ok(container) => container,
            Err(e) => {
                warn!(error = %e, "results container vanished after appearing; returning empty page");
                return Ok(JobListingPage::default());
            }
        };

        // The pagination bar only renders once the container has been
        // scrolled through; push it down until the bar shows up. A container
        // scrolled to its bottom cannot reveal anything more, so it ends the
        // sweep early.
        let probe = Duration::from_millis(500);
        let mut attempts = 0;
        loop {
            let pagination_present = dom
                .element_present_within(&self.selectors.pagination, None, probe)
                .await;
            let exhausted = page.element_completely_scrolled(&container).await?;
            match container_sweep_step(pagination_present, exhausted, attempts, SCROLL_ATTEMPT_CAP)
            {
                ContainerSweep::PaginationVisible => break,
                ContainerSweep::Exhausted => {
                    warn!(
                        attempts,
                        "container scrolled to its end without a pagination bar; returning empty page"
                    );
                    return Ok(JobListingPage::default());
                }
                ContainerSweep::CapReached => {
                    warn!(
                        attempts,
                        "pagination indicator never appeared; returning empty page"
                    );
                    return Ok(JobListingPage::default());
                }
                ContainerSweep::KeepScrolling => {
                    page.scroll_element(&container).await?;
                    attempts += 1;
                }
            }
        }
        debug!(attempts, "pagination indicator present");

        let list = match page.find(&self.selectors.list).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "job list vanished after appearing; returning empty page");
                return Ok(JobListingPage::default());
            }
        };

        let items = list.find_all(&self.selectors.item).await.unwrap_or_default();
        let mut postings = Vec::with_capacity(items.len());
        for item in &items {
            let title = dom
                .text_content_or_empty(&self.selectors.item_title, Some(item))
                .await;
            let company = dom
                .text_content_or_empty(&self.selectors.item_company, Some(item))
                .await;
            let location = dom
                .text_content_or_empty(&self.selectors.item_location, Some(item))
                .await;
            if title.is_empty() && company.is_empty() && location.is_empty() {
                continue;
            }
            postings.push(JobPosting {
                title: title.trim().to_string(),
                company: company.trim().to_string(),
                location: location.trim().to_string(),
            });
        }

        let mut page_texts = Vec::new();
        if let Ok(pagination) = page.find(&self.selectors.pagination).await {
            if let Ok(indicators) = pagination.find_all(&self.selectors.pagination_item).await {
                for indicator in &indicators {
                    page_texts.push(indicator.text().await.unwrap_or_default());
                }
            }
        }
        let last_page = parse_last_page(&page_texts);

        debug!(jobs = postings.len(), ?last_page, "job listing extracted");
        Ok(JobListingPage {
            postings,
            last_page,
        })
    }

    pub async fn dispose(self) -> Result<()> {
        self.context.dispose().await
    }
}

#[async_trait]
impl Navigable for JobListingModule {
    fn context(&self) -> &ModuleContext {
        &self.context
    }
}

#[async_trait]
impl Listable for JobListingModule {
    type Item = JobPosting;

    async fn items(&self) -> Result<Vec<JobPosting>> {
        Ok(self.listing().await?.postings)
    }
}

/// Next action for the container-scroll sweep.
#[derive(Debug, PartialEq, Eq)]
enum ContainerSweep {
    PaginationVisible,
    Exhausted,
    CapReached,
    KeepScrolling,
}

/// A visible pagination bar always wins; a fully scrolled container ends
/// the sweep before the attempt cap does.
fn container_sweep_step(
    pagination_present: bool,
    container_exhausted: bool,
    attempts: u32,
    cap: u32,
) -> ContainerSweep {
    if pagination_present {
        ContainerSweep::PaginationVisible
    } else if container_exhausted {
        ContainerSweep::Exhausted
    } else if attempts >= cap {
        ContainerSweep::CapReached
    } else {
        ContainerSweep::KeepScrolling
    }
}

/// The deepest page number among the pagination indicators. The site ends
/// the bar with the total page count, so the last parseable text wins.
fn parse_last_page(texts: &[String]) -> Option<u32> {
    texts.iter().rev().find_map(|t| t.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_numeric_indicator_wins() {
        let texts = vec![
            "1".to_string(),
            "2".to_string(),
            "…".to_string(),
            "14".to_string(),
        ];
        assert_eq!(parse_last_page(&texts), Some(14));
    }

    #[test]
    fn ellipsis_tail_falls_back_to_previous_number() {
        let texts = vec!["1".to_string(), "9".to_string(), "…".to_string()];
        assert_eq!(parse_last_page(&texts), Some(9));
    }

    #[test]
    fn no_indicators_yield_none() {
        assert_eq!(parse_last_page(&[]), None);
        assert_eq!(parse_last_page(&["…".to_string()]), None);
    }

    #[test]
    fn visible_pagination_ends_the_sweep_regardless_of_other_signals() {
        assert_eq!(
            container_sweep_step(true, true, 40, 40),
            ContainerSweep::PaginationVisible
        );
        assert_eq!(
            container_sweep_step(true, false, 0, 40),
            ContainerSweep::PaginationVisible
        );
    }

    #[test]
    fn fully_scrolled_container_gives_up_before_the_cap() {
        assert_eq!(
            container_sweep_step(false, true, 0, 40),
            ContainerSweep::Exhausted
        );
        assert_eq!(
            container_sweep_step(false, true, 12, 40),
            ContainerSweep::Exhausted
        );
    }

    #[test]
    fn cap_fires_only_while_content_remains_below() {
        assert_eq!(
            container_sweep_step(false, false, 40, 40),
            ContainerSweep::CapReached
        );
        assert_eq!(
            container_sweep_step(false, false, 39, 40),
            ContainerSweep::KeepScrolling
        );
    }
}
