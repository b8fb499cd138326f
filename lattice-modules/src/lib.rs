//! Entity extraction modules for the lattice scraper.
//!
//! Each module binds a page handle to one entity URL and exposes typed
//! reads over it. Modules compose a [`context::ModuleContext`] and pick up
//! behavior from the capability traits; the [`LatticeClient`] is the root
//! handle that owns the session and constructs modules bound to it.

pub mod client;
pub mod context;
pub mod group;
pub mod job_listing;
pub mod records;
pub mod user_profile;

pub use client::{auth_state_available, LatticeClient};
pub use context::{FieldReadable, Listable, ModuleContext, Navigable};
pub use group::GroupModule;
pub use job_listing::JobListingModule;
pub use records::{GroupPost, JobListingPage, JobPosting, UserProfile};
pub use user_profile::UserProfileModule;
