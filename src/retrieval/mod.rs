//! Public-source retrieval.
//!
//! Retrieval is an external collaborator: the engine only sees the
//! `RetrievalCollaborator` contract and uses the outcome's status to gate
//! AI requests. `FanOutRetriever` is the bundled implementation over
//! injected `PublicSource`s with a shared TTL cache.

mod cache;
mod fanout;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;
use crate::frame::RetrievalStatus;
use crate::identity::ShipIdentity;

pub use cache::{Clock, InMemoryTtlCache, TtlCache};
pub use fanout::FanOutRetriever;

/// One text snippet from a public source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicSnippet {
    /// Source identifier.
    pub source: String,
    /// Page URL (also the locator AI answers may cite).
    pub url: String,
    /// Page title.
    pub title: String,
    /// Extracted text.
    pub snippet: String,
}

/// Result of a retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// `ok` when at least one snippet was found.
    pub status: RetrievalStatus,
    /// Snippets in source order.
    pub snippets: Vec<PublicSnippet>,
}

impl RetrievalOutcome {
    /// Outcome with no snippets.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: RetrievalStatus::Empty,
            snippets: Vec::new(),
        }
    }

    /// Outcome for a set of snippets; the status follows emptiness.
    #[must_use]
    pub fn from_snippets(snippets: Vec<PublicSnippet>) -> Self {
        let status = if snippets.is_empty() {
            RetrievalStatus::Empty
        } else {
            RetrievalStatus::Ok
        };
        Self { status, snippets }
    }
}

/// Retrieval limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOptions {
    /// Maximum number of sources queried.
    pub max_sources: usize,
    /// Maximum snippets kept per source.
    pub max_per_source: usize,
    /// Cache lifetime of a non-empty outcome.
    pub ttl: Duration,
    /// Deadline for each source.
    pub per_source_timeout: Duration,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            max_sources: 4,
            max_per_source: 3,
            ttl: Duration::from_secs(6 * 60 * 60),
            per_source_timeout: Duration::from_millis(6000),
        }
    }
}

impl RetrievalOptions {
    /// Cache key for `identity` under these caps.
    ///
    /// Outcomes gathered with different caps never share an entry.
    #[must_use]
    pub fn cache_key(&self, identity: &ShipIdentity) -> String {
        format!(
            "{}:{}:{}",
            identity.cache_key(),
            self.max_sources,
            self.max_per_source
        )
    }
}

/// Retrieval collaborator contract.
pub trait RetrievalCollaborator: Send + Sync {
    /// Fetches public snippets about a ship. Never fails: failures show up
    /// as an empty outcome.
    fn fetch_public_sources(
        &self,
        identity: &ShipIdentity,
        options: &RetrievalOptions,
    ) -> RetrievalOutcome;
}

/// A single allow-listed public source.
pub trait PublicSource: Send + Sync {
    /// Stable identifier used in logs and snippets.
    fn id(&self) -> &str;

    /// Fetches at most `limit` snippets.
    ///
    /// # Errors
    ///
    /// Returns a `RetrievalError` on failure; the source is then skipped.
    fn fetch(&self, identity: &ShipIdentity, limit: usize) -> Result<Vec<PublicSnippet>, RetrievalError>;
}
