//! AI collaborator contract.
//!
//! The engine never depends on prompts or models, only on this contract:
//! given the identity, the candidates established so far and the public
//! snippets, return per-role guesses as JSON or fail. The call is a single
//! round trip bounded by a deadline and is never retried.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cancel::CancelToken;
use crate::error::AiInferenceError;
use crate::identity::ShipIdentity;
use crate::pool::PartyCandidate;
use crate::retrieval::{PublicSnippet, TtlCache};
use crate::role::Role;

/// How often a waiting call re-checks cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Input handed to the AI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiRequest {
    /// Ship being resolved.
    pub identity: ShipIdentity,
    /// Roles the gate asks about.
    pub roles: Vec<Role>,
    /// Deterministic candidates per role, for context and citation.
    pub evidence_so_far: BTreeMap<Role, Vec<PartyCandidate>>,
    /// Public snippets; their URLs are citable.
    pub public_evidence: Vec<PublicSnippet>,
    /// Bypass any memoized answer.
    #[serde(skip)]
    pub force_refresh: bool,
}

impl AiRequest {
    /// blake3 digest of everything except `force_refresh`.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

/// AI inference contract.
pub trait AiCollaborator: Send + Sync {
    /// Name of the collaborator (for audit/debugging).
    fn name(&self) -> &str;

    /// Returns raw per-role guesses; the engine parses them strictly.
    ///
    /// # Errors
    ///
    /// Returns an `AiInferenceError` on any failure.
    fn infer_parties(&self, request: &AiRequest) -> Result<JsonValue, AiInferenceError>;
}

impl<T: AiCollaborator + ?Sized> AiCollaborator for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn infer_parties(&self, request: &AiRequest) -> Result<JsonValue, AiInferenceError> {
        (**self).infer_parties(request)
    }
}

/// Memoizes successful answers per request fingerprint.
///
/// `AiRequest::force_refresh` skips the lookup and overwrites the entry.
pub struct CachedAiCollaborator<C> {
    inner: C,
    cache: Arc<dyn TtlCache<JsonValue>>,
    ttl: Duration,
}

impl<C: AiCollaborator> fmt::Debug for CachedAiCollaborator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedAiCollaborator")
            .field("inner", &self.inner.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<C: AiCollaborator> CachedAiCollaborator<C> {
    /// Wraps `inner` with a memo cache.
    pub fn new(inner: C, cache: Arc<dyn TtlCache<JsonValue>>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

impl<C: AiCollaborator> AiCollaborator for CachedAiCollaborator<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn infer_parties(&self, request: &AiRequest) -> Result<JsonValue, AiInferenceError> {
        let key = request.fingerprint();
        if !request.force_refresh {
            if let Some(hit) = self.cache.get(&key) {
                tracing::debug!(collaborator = self.inner.name(), "reusing memoized AI answer");
                return Ok(hit);
            }
        }

        let answer = self.inner.infer_parties(request)?;
        self.cache.put(key, answer.clone(), self.ttl);
        Ok(answer)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Runs one AI round trip on a worker thread, bounded by `timeout`.
///
/// Returns `Cancelled` as soon as `cancel` trips. An abandoned worker
/// finishes in the background and its answer is discarded.
///
/// # Errors
///
/// Propagates the collaborator's error, or `Timeout` / `Cancelled`.
pub fn infer_with_deadline(
    collaborator: Arc<dyn AiCollaborator>,
    request: AiRequest,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<JsonValue, AiInferenceError> {
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("ship-parties-ai".to_string())
        .spawn(move || {
            let _ = tx.send(collaborator.infer_parties(&request));
        })
        .map_err(|e| AiInferenceError::Collaborator {
            message: format!("failed to spawn worker: {e}"),
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(AiInferenceError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(AiInferenceError::Timeout {
                timeout_ms: millis(timeout),
            });
        }
        match rx.recv_timeout(CANCEL_POLL.min(deadline - now)) {
            Ok(result) => return result,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(AiInferenceError::Collaborator {
                    message: "worker exited without answering".to_string(),
                })
            }
        }
    }
}
