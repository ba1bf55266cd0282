//! Bounded fan-out over public sources.
//!
//! Each source runs on its own worker thread and reports through a bounded
//! channel. The join waits until a single deadline; sources that fail or
//! miss it are skipped and never block the others. Nothing is retried.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::contacts::DomainAllowList;
use crate::error::RetrievalError;
use crate::identity::ShipIdentity;
use crate::retrieval::{
    InMemoryTtlCache, PublicSnippet, PublicSource, RetrievalCollaborator, RetrievalOptions,
    RetrievalOutcome, TtlCache,
};

type SourceReply = (usize, Result<Vec<PublicSnippet>, RetrievalError>);

/// Retrieval collaborator over a fixed set of public sources.
pub struct FanOutRetriever {
    sources: Vec<Arc<dyn PublicSource>>,
    cache: Arc<dyn TtlCache<Vec<PublicSnippet>>>,
    url_allow_list: Option<DomainAllowList>,
}

impl fmt::Debug for FanOutRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.sources.iter().map(|s| s.id()).collect();
        f.debug_struct("FanOutRetriever")
            .field("sources", &ids)
            .field("url_allow_list", &self.url_allow_list)
            .finish_non_exhaustive()
    }
}

impl FanOutRetriever {
    /// Creates a retriever with a private in-memory cache.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn PublicSource>>) -> Self {
        Self {
            sources,
            cache: Arc::new(InMemoryTtlCache::new()),
            url_allow_list: None,
        }
    }

    /// Uses a shared cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TtlCache<Vec<PublicSnippet>>>) -> Self {
        self.cache = cache;
        self
    }

    /// Drops snippets whose URL is not on the allow-list.
    #[must_use]
    pub fn with_url_allow_list(mut self, allow_list: DomainAllowList) -> Self {
        self.url_allow_list = Some(allow_list);
        self
    }

    fn spawn_source(
        idx: usize,
        source: Arc<dyn PublicSource>,
        identity: ShipIdentity,
        limit: usize,
        reply: crossbeam_channel::Sender<SourceReply>,
    ) -> Result<(), RetrievalError> {
        let source_id = source.id().to_string();
        thread::Builder::new()
            .name(format!("ship-parties-retrieval-{idx}"))
            .spawn(move || {
                let result = source.fetch(&identity, limit);
                // The receiver is gone once the deadline passed.
                let _ = reply.send((idx, result));
            })
            .map(|_| ())
            .map_err(|e| RetrievalError::Source {
                source_id,
                message: format!("failed to spawn worker: {e}"),
            })
    }

    fn collect(
        &self,
        identity: &ShipIdentity,
        options: &RetrievalOptions,
    ) -> Vec<Option<Result<Vec<PublicSnippet>, RetrievalError>>> {
        let sources: Vec<Arc<dyn PublicSource>> = self
            .sources
            .iter()
            .take(options.max_sources)
            .cloned()
            .collect();
        let mut results: Vec<Option<Result<Vec<PublicSnippet>, RetrievalError>>> =
            (0..sources.len()).map(|_| None).collect();

        let (tx, rx) = bounded::<SourceReply>(sources.len().max(1));
        for (idx, source) in sources.into_iter().enumerate() {
            if let Err(err) =
                Self::spawn_source(idx, source, identity.clone(), options.max_per_source, tx.clone())
            {
                results[idx] = Some(Err(err));
            }
        }
        drop(tx);

        let deadline = Instant::now() + options.per_source_timeout;
        loop {
            match rx.recv_deadline(deadline) {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        results
    }

    fn timeout_ms(timeout: Duration) -> u64 {
        u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl RetrievalCollaborator for FanOutRetriever {
    fn fetch_public_sources(
        &self,
        identity: &ShipIdentity,
        options: &RetrievalOptions,
    ) -> RetrievalOutcome {
        let key = options.cache_key(identity);
        if let Some(snippets) = self.cache.get(&key) {
            tracing::debug!(ship = %identity.label(), snippets = snippets.len(), "retrieval cache hit");
            return RetrievalOutcome::from_snippets(snippets);
        }

        let results = self.collect(identity, options);
        let mut snippets = Vec::new();

        for (idx, result) in results.into_iter().enumerate() {
            let source_id = self.sources[idx].id();
            let err = match result {
                Some(Ok(found)) => {
                    let kept = found
                        .into_iter()
                        .filter(|s| {
                            self.url_allow_list
                                .as_ref()
                                .map_or(true, |allow| allow.is_official(&s.url))
                        })
                        .take(options.max_per_source);
                    snippets.extend(kept);
                    continue;
                }
                Some(Err(err)) => err,
                None => RetrievalError::Timeout {
                    source_id: source_id.to_string(),
                    timeout_ms: Self::timeout_ms(options.per_source_timeout),
                },
            };
            tracing::warn!(source = source_id, error = %err, "public source skipped");
        }

        let outcome = RetrievalOutcome::from_snippets(snippets);
        if !outcome.snippets.is_empty() {
            self.cache.put(key, outcome.snippets.clone(), options.ttl);
        }
        tracing::debug!(
            ship = %identity.label(),
            status = %outcome.status,
            snippets = outcome.snippets.len(),
            "retrieval finished"
        );
        outcome
    }
}
