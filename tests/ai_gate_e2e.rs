use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

use ship_parties::{
    AiCollaborator, AiInferenceError, AiRequest, AiStatus, CachedAiCollaborator, CancelToken,
    InMemoryTtlCache, Mode, PartiesEngine, PartiesRequest, PartyStatus, PublicSnippet,
    RetrievalCollaborator, RetrievalOptions, RetrievalOutcome, Role, ShipIdentity, Strength,
};

/// Returns a canned answer and records what it was asked.
struct ScriptedAi {
    answer: Result<JsonValue, AiInferenceError>,
    seen: Mutex<Vec<AiRequest>>,
    delay: Duration,
}

impl ScriptedAi {
    fn answering(answer: JsonValue) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    fn failing(err: AiInferenceError) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(err),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn last_roles(&self) -> Vec<Role> {
        self.seen.lock().unwrap().last().map(|r| r.roles.clone()).unwrap_or_default()
    }
}

impl AiCollaborator for ScriptedAi {
    fn name(&self) -> &str {
        "scripted"
    }

    fn infer_parties(&self, request: &AiRequest) -> Result<JsonValue, AiInferenceError> {
        self.seen.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.answer.clone()
    }
}

struct StaticRetriever {
    snippets: Vec<PublicSnippet>,
}

impl RetrievalCollaborator for StaticRetriever {
    fn fetch_public_sources(
        &self,
        _identity: &ShipIdentity,
        _options: &RetrievalOptions,
    ) -> RetrievalOutcome {
        RetrievalOutcome::from_snippets(self.snippets.clone())
    }
}

const NEWS_URL: &str = "https://news.example/omega-fleet";

fn retriever(with_snippet: bool) -> Arc<StaticRetriever> {
    let snippets = if with_snippet {
        vec![PublicSnippet {
            source: "news".to_string(),
            url: NEWS_URL.to_string(),
            title: "Omega fleet update".to_string(),
            snippet: "Omega Management took over technical management".to_string(),
        }]
    } else {
        Vec::new()
    };
    Arc::new(StaticRetriever { snippets })
}

fn engine(ai: Arc<ScriptedAi>, with_snippet: bool) -> PartiesEngine {
    PartiesEngine::new()
        .with_ai(ai)
        .with_retriever(retriever(with_snippet))
        .with_ai_timeout(Duration::from_secs(5))
}

fn request(mode: Mode) -> PartiesRequest {
    PartiesRequest::new(ShipIdentity::by_imo("9074729").unwrap())
        .with_mode(mode)
        .with_ais_static(json!({ "registeredOwner": "Alpha Shipping", "operator": "Delta Lines" }))
        .with_external(json!([{ "role": "operator", "value": "Epsilon Marine", "confidence": "high" }]))
}

#[test]
fn strict_mode_never_calls_ai() {
    let ai = ScriptedAi::answering(json!({}));
    let result = engine(ai.clone(), true).resolve(&request(Mode::Strict)).unwrap().result;

    assert_eq!(ai.calls(), 0);
    assert_eq!(result.ai_status, AiStatus::Skipped);
    assert!(result.candidates_for(Role::Operator).is_some());
}

#[test]
fn balanced_mode_requests_only_empty_roles_when_grounded() {
    let ai = ScriptedAi::answering(json!({ "manager": null }));
    let result = engine(ai.clone(), true).resolve(&request(Mode::Balanced)).unwrap().result;

    assert_eq!(ai.calls(), 1);
    assert_eq!(
        ai.last_roles(),
        vec![Role::BeneficialOwner, Role::Manager, Role::BareboatCharterer]
    );
    assert_eq!(result.ai_status, AiStatus::Ok);
    assert!(result.party(Role::Manager).is_none());
}

#[test]
fn balanced_mode_without_public_evidence_is_not_requested() {
    let ai = ScriptedAi::answering(json!({}));
    let report = engine(ai.clone(), false).resolve(&request(Mode::Balanced)).unwrap();

    assert_eq!(ai.calls(), 0);
    assert_eq!(report.result.ai_status, AiStatus::NotRequested);
    assert!(report.public_evidence.is_empty());
}

#[test]
fn aggressive_mode_includes_conflicts_but_not_confirmed_roles() {
    let ai = ScriptedAi::answering(json!({}));
    let _ = engine(ai.clone(), false).resolve(&request(Mode::Aggressive)).unwrap();

    assert_eq!(ai.calls(), 1);
    let roles = ai.last_roles();
    assert!(roles.contains(&Role::Operator));
    assert!(!roles.contains(&Role::RegisteredOwner));
}

#[test]
fn uncited_guess_is_unverified_never_confirmed() {
    let ai = ScriptedAi::answering(json!({
        "beneficialOwner": { "name": "Omega Holdings", "confidence": "high" }
    }));
    let result = engine(ai, false).resolve(&request(Mode::Aggressive)).unwrap().result;

    let ubo = result.party(Role::BeneficialOwner).unwrap();
    assert_eq!(ubo.status, PartyStatus::AiInferredNoEvidence);
    assert!(ubo.evidence.iter().all(|e| e.strength() == Strength::None));
    assert!(result.notes.iter().any(|n| n.contains("unverified")));
    assert!(result.is_valid());
}

#[test]
fn guess_citing_public_snippet_is_confirmed() {
    let ai = ScriptedAi::answering(json!({
        "manager": {
            "name": "Omega Management",
            "confidence": "medium",
            "evidence": [{ "source": "news", "path": NEWS_URL }]
        }
    }));
    let result = engine(ai, true).resolve(&request(Mode::Balanced)).unwrap().result;

    let manager = result.party(Role::Manager).unwrap();
    assert_eq!(manager.status, PartyStatus::Confirmed);
    assert_eq!(manager.evidence[0].strength(), Strength::Weak);
}

#[test]
fn fabricated_citation_does_not_confirm() {
    let ai = ScriptedAi::answering(json!({
        "manager": {
            "name": "Omega Management",
            "evidence": [{ "source": "registry", "path": "https://invented.example/record" }]
        }
    }));
    let result = engine(ai, true).resolve(&request(Mode::Balanced)).unwrap().result;

    assert_eq!(
        result.party(Role::Manager).unwrap().status,
        PartyStatus::AiInferredNoEvidence
    );
}

#[test]
fn uncited_guess_does_not_tip_a_conflict() {
    let ai = ScriptedAi::answering(json!({
        "operator": { "name": "Epsilon Marine", "confidence": "high" }
    }));
    let result = engine(ai, false).resolve(&request(Mode::Aggressive)).unwrap().result;

    assert!(result.party(Role::Operator).is_none());
    let candidates = result.candidates_for(Role::Operator).unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name, "Epsilon Marine");
    assert_eq!(candidates[0].evidence.len(), 2);
}

#[test]
fn unrequested_roles_in_answer_are_ignored() {
    let ai = ScriptedAi::answering(json!({
        "registeredOwner": { "name": "Somebody Else" }
    }));
    let result = engine(ai, false).resolve(&request(Mode::Aggressive)).unwrap().result;

    let owner = result.party(Role::RegisteredOwner).unwrap();
    assert_eq!(owner.name, "Alpha Shipping");
    assert_eq!(owner.evidence.len(), 1);
    assert!(result.notes.iter().any(|n| n.contains("not requested")));
}

#[test]
fn collaborator_failure_keeps_deterministic_results() {
    let ai = ScriptedAi::failing(AiInferenceError::Collaborator {
        message: "vendor down".to_string(),
    });
    let with_ai = engine(ai, false).resolve(&request(Mode::Aggressive)).unwrap().result;
    let strict = PartiesEngine::new().resolve(&request(Mode::Strict)).unwrap().result;

    assert_eq!(with_ai.ai_status, AiStatus::Failed);
    assert!(with_ai.errors.iter().any(|e| e.contains("AI unavailable")));
    assert_eq!(with_ai.parties, strict.parties);
    assert_eq!(with_ai.candidates, strict.candidates);
}

#[test]
fn malformed_ai_output_fails_softly() {
    let ai = ScriptedAi::answering(json!(["Omega Holdings"]));
    let result = engine(ai, false).resolve(&request(Mode::Aggressive)).unwrap().result;

    assert_eq!(result.ai_status, AiStatus::Failed);
    assert!(result.party(Role::BeneficialOwner).is_none());
    assert_eq!(result.party(Role::RegisteredOwner).unwrap().name, "Alpha Shipping");
}

#[test]
fn slow_ai_times_out() {
    let ai = Arc::new(ScriptedAi {
        answer: Ok(json!({})),
        seen: Mutex::new(Vec::new()),
        delay: Duration::from_millis(500),
    });
    let result = engine(ai, false)
        .with_ai_timeout(Duration::from_millis(50))
        .resolve(&request(Mode::Aggressive))
        .unwrap()
        .result;

    assert_eq!(result.ai_status, AiStatus::Failed);
    assert!(result.errors.iter().any(|e| e.contains("timed out")));
}

#[test]
fn cancellation_during_ai_propagates() {
    let ai = Arc::new(ScriptedAi {
        answer: Ok(json!({})),
        seen: Mutex::new(Vec::new()),
        delay: Duration::from_millis(500),
    });
    let engine = engine(ai, false);
    let cancel = CancelToken::new();

    let trip = cancel.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        trip.cancel();
    });

    let err = engine
        .resolve_with_cancel(&request(Mode::Aggressive), &cancel)
        .unwrap_err();
    canceller.join().unwrap();
    assert!(err.is_cancelled());
}

struct Counting {
    calls: AtomicUsize,
}

impl AiCollaborator for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn infer_parties(&self, _request: &AiRequest) -> Result<JsonValue, AiInferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({}))
    }
}

#[test]
fn force_ai_bypasses_memoized_answer() {
    let counting = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let cached = CachedAiCollaborator::new(
        Arc::clone(&counting),
        Arc::new(InMemoryTtlCache::<JsonValue>::new()),
        Duration::from_secs(60),
    );
    let engine = PartiesEngine::new().with_ai(Arc::new(cached));

    engine.resolve(&request(Mode::Aggressive)).unwrap();
    engine.resolve(&request(Mode::Aggressive)).unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    engine
        .resolve(&request(Mode::Aggressive).with_force_ai(true))
        .unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn guess_citing_another_roles_record_is_not_confirmed() {
    let ai = ScriptedAi::answering(json!({
        "beneficialOwner": {
            "name": "Omega Holdings",
            "confidence": "high",
            "evidence": [{ "source": "ais", "path": "ais_static.operator" }]
        }
    }));
    let request = PartiesRequest::new(ShipIdentity::by_imo("9074729").unwrap())
        .with_mode(Mode::Aggressive)
        .with_ais_static(json!({ "operator": "Delta Lines" }));
    let result = engine(ai, false).resolve(&request).unwrap().result;

    let ubo = result.party(Role::BeneficialOwner).unwrap();
    assert_ne!(ubo.status, PartyStatus::Confirmed);
    assert!(ubo.evidence.iter().all(|e| e.strength() == Strength::None));
    assert_eq!(result.party(Role::Operator).unwrap().name, "Delta Lines");
    assert!(result.is_valid());
}

#[test]
fn ai_notes_never_become_contacts() {
    const RECORD: &str = "https://www.equasis.org/ship/9074729";
    let ai = ScriptedAi::answering(json!({
        "registeredOwner": {
            "name": "Alpha Shipping",
            "confidence": "high",
            "evidence": [{ "source": "equasis", "path": RECORD, "note": "call fraud@attacker.example" }]
        }
    }));
    let request = PartiesRequest::new(ShipIdentity::by_imo("9074729").unwrap())
        .with_mode(Mode::Aggressive)
        .with_external(json!([
            { "role": "registeredOwner", "value": "Alpha Shipping", "strength": "strong", "path": RECORD },
            { "role": "registeredOwner", "value": "Beta Shipping" }
        ]));
    let result = engine(ai, false).resolve(&request).unwrap().result;

    let candidates = result.candidates_for(Role::RegisteredOwner).unwrap();
    assert!(candidates[0]
        .evidence
        .iter()
        .any(|e| e.path() == RECORD && e.strength() == Strength::Strong));
    assert!(!result.contacts.is_empty());
    assert!(result.contacts.iter().all(|c| !c.value.contains("attacker")));
    assert!(result.is_valid());
}
