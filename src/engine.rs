//! Resolution engine.
//!
//! Runs one request through the pipeline: normalize, pool, resolve, fetch
//! public evidence, gate AI, fold AI answers back through the same
//! resolver, then assemble and validate the result. The engine holds no
//! per-request state and can be shared across threads.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::contacts::{extract_contacts, DomainAllowList};
use crate::error::{AiInferenceError, EngineResult, PartiesError};
use crate::evidence::EvidenceItem;
use crate::frame::{AiStatus, PartiesReport, PartiesResult};
use crate::inference::{
    infer_with_deadline, merge_ai_response, plan_ai, AiCollaborator, AiPlan, AiRequest,
    AiResponse, CitationIndex, Mode, RoleState,
};
use crate::normalize::{normalize_ais_static, normalize_external};
use crate::pool::{PartyCandidate, PoolSet};
use crate::request::PartiesRequest;
use crate::resolver::{rank_candidates, resolve_pool, Resolution};
use crate::retrieval::{PublicSnippet, RetrievalCollaborator, RetrievalOptions, RetrievalOutcome};
use crate::role::Role;

/// Note recorded when AI is wanted but cannot be reached.
pub const AI_UNAVAILABLE: &str = "AI unavailable";

/// Ship parties resolution engine.
#[derive(Clone)]
pub struct PartiesEngine {
    retriever: Option<Arc<dyn RetrievalCollaborator>>,
    ai: Option<Arc<dyn AiCollaborator>>,
    retrieval_options: RetrievalOptions,
    domains: DomainAllowList,
    ai_timeout: Duration,
    default_mode: Mode,
}

impl Default for PartiesEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl std::fmt::Debug for PartiesEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartiesEngine")
            .field("retriever", &self.retriever.is_some())
            .field("ai", &self.ai.as_ref().map(|a| a.name().to_string()))
            .field("retrieval_options", &self.retrieval_options)
            .field("ai_timeout", &self.ai_timeout)
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

struct AiOutcome {
    status: AiStatus,
    notes: Vec<String>,
    errors: Vec<String>,
}

impl PartiesEngine {
    /// Deterministic-only engine with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine configured from `config`, with no collaborators.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            retriever: None,
            ai: None,
            retrieval_options: config.retrieval.options(),
            domains: config.domain_allow_list(),
            ai_timeout: config.ai_timeout(),
            default_mode: config.default_mode,
        }
    }

    /// Attaches a retrieval collaborator.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn RetrievalCollaborator>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Attaches an AI collaborator.
    #[must_use]
    pub fn with_ai(mut self, ai: Arc<dyn AiCollaborator>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Overrides the AI deadline.
    #[must_use]
    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    /// Overrides the contact allow-list.
    #[must_use]
    pub fn with_domains(mut self, domains: DomainAllowList) -> Self {
        self.domains = domains;
        self
    }

    /// Overrides the retrieval limits.
    #[must_use]
    pub fn with_retrieval_options(mut self, options: RetrievalOptions) -> Self {
        self.retrieval_options = options;
        self
    }

    /// Mode used by the transport when a request names none.
    #[must_use]
    pub const fn default_mode(&self) -> Mode {
        self.default_mode
    }

    /// Resolves a request without external cancellation.
    ///
    /// # Errors
    ///
    /// See [`PartiesEngine::resolve_with_cancel`].
    pub fn resolve(&self, request: &PartiesRequest) -> EngineResult<PartiesReport> {
        self.resolve_with_cancel(request, &CancelToken::new())
    }

    /// Resolves a request.
    ///
    /// Collaborator failures are downgraded to statuses; dropped evidence
    /// items are listed in `errors`.
    ///
    /// # Errors
    ///
    /// - `PartiesError::Cancelled` if `cancel` trips before the result is
    ///   assembled.
    /// - `PartiesError::Schema` if the assembled result breaks an output
    ///   invariant.
    pub fn resolve_with_cancel(
        &self,
        request: &PartiesRequest,
        cancel: &CancelToken,
    ) -> EngineResult<PartiesReport> {
        let ship = request.identity.label();
        let span = tracing::debug_span!("resolve_parties", ship = %ship, mode = %request.mode);
        let _entered = span.enter();

        let mut errors: Vec<String> = request.input_errors.iter().map(ToString::to_string).collect();

        let mut normalized = normalize_ais_static(&request.ais_static);
        normalized.extend(normalize_external(&request.external));
        errors.extend(normalized.errors.iter().map(ToString::to_string));
        tracing::debug!(
            claims = normalized.claims.len(),
            dropped = normalized.errors.len(),
            "normalized evidence"
        );

        let mut pools = PoolSet::from_claims(normalized.claims);
        let mut resolutions: BTreeMap<Role, Resolution> =
            pools.iter().map(|(role, pool)| (role, resolve_pool(pool))).collect();
        let mut states: BTreeMap<Role, RoleState> = resolutions
            .iter()
            .map(|(role, resolution)| (*role, RoleState::settle(resolution)))
            .collect();

        if cancel.is_cancelled() {
            return Err(PartiesError::Cancelled);
        }
        let retrieval = self.retrieve(request);

        let plan = plan_ai(request.mode, retrieval.status, &states);
        tracing::debug!(plan = ?plan, "AI gate decision");

        let ai = match plan {
            AiPlan::Skip { status, reason } => AiOutcome {
                status,
                notes: vec![format!("AI {status}: {reason}")],
                errors: Vec::new(),
            },
            AiPlan::Request(roles) => {
                for role in &roles {
                    if let Some(state) = states.get_mut(role) {
                        *state = state.request_ai();
                    }
                }
                let outcome =
                    self.run_ai(request, &roles, &mut pools, &retrieval.snippets, cancel)?;
                for role in &roles {
                    if let Some(pool) = pools.pool(*role) {
                        let resolution = resolve_pool(pool);
                        states.insert(*role, RoleState::settle(&resolution));
                        resolutions.insert(*role, resolution);
                    }
                }
                outcome
            }
        };
        errors.extend(ai.errors);
        debug_assert!(states.values().all(|s| *s != RoleState::AwaitingAi));

        if cancel.is_cancelled() {
            return Err(PartiesError::Cancelled);
        }

        let mut result = PartiesResult::empty(request.identity.clone());
        result.ai_status = ai.status;
        result.retrieval_status = retrieval.status;
        result.errors = errors;

        for (role, resolution) in resolutions {
            let (answer, candidates) = resolution.into_parts();
            if let Some(answer) = &answer {
                if !answer.is_confirmed() {
                    result.notes.push(format!(
                        "{}: AI answer '{}' has no citable evidence and is unverified",
                        role.label(),
                        answer.name
                    ));
                }
            }
            if let Some(candidates) = candidates {
                result.notes.push(format!(
                    "{}: {} conflicting candidates",
                    role.label(),
                    candidates.len()
                ));
                result.candidates.insert(role, candidates);
            }
            result.parties.insert(role, answer);
        }
        result.notes.extend(ai.notes);

        result.contacts = extract_contacts(Self::all_evidence(&result), &self.domains);

        if let Err(violation) = result.validate() {
            tracing::error!(ship = %ship, error = %violation, "assembled result violates an output invariant");
            return Err(PartiesError::Schema(violation));
        }

        tracing::info!(
            ship = %ship,
            ai_status = %result.ai_status,
            retrieval_status = %result.retrieval_status,
            confirmed = result.parties.values().flatten().filter(|a| a.is_confirmed()).count(),
            conflicted = result.candidates.len(),
            "resolved ship parties"
        );

        Ok(PartiesReport {
            result,
            public_evidence: retrieval.snippets,
        })
    }

    fn retrieve(&self, request: &PartiesRequest) -> RetrievalOutcome {
        match &self.retriever {
            Some(retriever) => {
                let outcome = retriever.fetch_public_sources(&request.identity, &self.retrieval_options);
                tracing::debug!(
                    status = %outcome.status,
                    snippets = outcome.snippets.len(),
                    "public retrieval finished"
                );
                outcome
            }
            None => RetrievalOutcome::empty(),
        }
    }

    fn run_ai(
        &self,
        request: &PartiesRequest,
        roles: &[Role],
        pools: &mut PoolSet,
        snippets: &[PublicSnippet],
        cancel: &CancelToken,
    ) -> EngineResult<AiOutcome> {
        let failed = |err: &AiInferenceError| {
            tracing::warn!(error = %err, "AI step failed, keeping deterministic results");
            AiOutcome {
                status: AiStatus::Failed,
                notes: Vec::new(),
                errors: vec![match err {
                    AiInferenceError::Unavailable => err.to_string(),
                    _ => format!("{AI_UNAVAILABLE}: {err}"),
                }],
            }
        };

        let Some(collaborator) = self.ai.clone() else {
            return Ok(failed(&AiInferenceError::Unavailable));
        };

        let evidence_so_far: BTreeMap<Role, Vec<PartyCandidate>> = pools
            .iter()
            .filter(|(_, pool)| !pool.is_empty())
            .map(|(role, pool)| (role, rank_candidates(pool.candidates())))
            .collect();
        let ai_request = AiRequest {
            identity: request.identity.clone(),
            roles: roles.to_vec(),
            evidence_so_far,
            public_evidence: snippets.to_vec(),
            force_refresh: request.force_ai,
        };

        if cancel.is_cancelled() {
            return Err(PartiesError::Cancelled);
        }
        let raw = match infer_with_deadline(collaborator, ai_request, self.ai_timeout, cancel) {
            Ok(raw) => raw,
            Err(AiInferenceError::Cancelled) => return Err(PartiesError::Cancelled),
            Err(err) => return Ok(failed(&err)),
        };
        let response = match AiResponse::parse(&raw) {
            Ok(response) => response,
            Err(err) => return Ok(failed(&err)),
        };

        let index = CitationIndex::build(pools, snippets);
        let report = merge_ai_response(pools, response, roles, &index);
        tracing::debug!(
            merged = report.merged.len(),
            declined = report.declined.len(),
            uncited = report.uncited.len(),
            "merged AI answer"
        );

        let mut notes = Vec::new();
        for role in &report.declined {
            notes.push(format!("{}: AI could not determine a party", role.label()));
        }
        for role in &report.unrequested {
            notes.push(format!(
                "{}: AI answered a role that was not requested; ignored",
                role.label()
            ));
        }

        Ok(AiOutcome {
            status: AiStatus::Ok,
            notes,
            errors: Vec::new(),
        })
    }

    fn all_evidence(
        result: &PartiesResult,
    ) -> impl Iterator<Item = (Role, &EvidenceItem)> {
        Role::ALL.into_iter().flat_map(move |role| {
            let answer = result.party(role).into_iter().flat_map(|a| a.evidence.iter());
            let candidates = result
                .candidates_for(role)
                .unwrap_or_default()
                .iter()
                .flat_map(|c| c.evidence.iter());
            answer.chain(candidates).map(move |item| (role, item))
        })
    }
}
