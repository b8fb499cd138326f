//! Plain records returned to callers.
//!
//! Empty strings mean "absent or unreadable": the resilient accessors
//! cannot distinguish a missing field from a legitimately empty one, and
//! these records inherit that ambiguity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub bio: String,
    pub about: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPost {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
}

/// One visible page of job results plus the deepest pagination index the
/// site advertises.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobListingPage {
    pub postings: Vec<JobPosting>,
    pub last_page: Option<u32>,
}
