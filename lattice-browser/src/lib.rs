//! Resilient page-interaction engine for session-gated sites.
//!
//! This crate owns the browser session and the primitives extraction
//! modules build on:
//!
//! - [`session::Session`]: one browser process + cookie jar + root page
//! - [`auth_state`]: persisted authenticated-session snapshots
//! - [`dom::Dom`]: retrying, degrade-to-empty DOM reads
//! - [`scroll::ScrollEngine`]: infinite-scroll termination algorithms
//! - [`filter::ResourceFilter`]: abort non-essential resource requests
//! - [`pacing::Pacer`]: injectable jittered delays and scroll distances
//!
//! Concurrency model: one page, one caller, no interleaving. All operations
//! are async and may suspend, but nothing here is safe for concurrent use
//! against the same page.

pub mod auth_state;
mod cdp;
pub mod dom;
pub mod filter;
pub mod pacing;
pub mod page;
pub mod scroll;
pub mod session;

pub use dom::{ClickSweep, Dom, DomNode, DomSurface};
pub use filter::{ResourceFilter, ResourceType, RouteDecision};
pub use pacing::Pacer;
pub use page::{Page, PageElement};
pub use scroll::{ScrollEngine, ScrollSurface};
pub use session::{Session, SessionConfig};
