//! Contact extraction from official evidence.
//!
//! Contacts are only read from deterministic `strong` evidence whose
//! locator is an http(s) URL on an allow-listed official domain. AI items
//! never qualify, even when they cite an official record.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::evidence::EvidenceItem;
use crate::role::Role;
use crate::tier::Strength;

/// Default allow-list of official registry domains.
pub const DEFAULT_OFFICIAL_DOMAINS: &[&str] = &[
    "imo.org",
    "equasis.org",
    "marad.dot.gov",
    "register-iri.com",
    "liscr.com",
    "segumar.gob.pa",
];

/// Kind of contact detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// Official website origin.
    Website,
    /// Email address.
    Email,
    /// Telephone number.
    Phone,
}

/// A contact detail with its evidence locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contact {
    /// Role of the party the contact belongs to.
    pub role: Role,
    /// Kind of detail.
    pub kind: ContactKind,
    /// The detail itself.
    pub value: String,
    /// Locator of the strong evidence it was read from.
    pub source_path: String,
}

/// Allow-list of official domains, matched on whole host labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAllowList {
    domains: Vec<String>,
}

impl Default for DomainAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_OFFICIAL_DOMAINS.iter().copied())
    }
}

impl DomainAllowList {
    /// Builds an allow-list; entries are trimmed and lower-cased.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        domains.sort();
        domains.dedup();
        Self { domains }
    }

    /// Allowed domains.
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Parses `candidate` and returns it if it is an official http(s) URL.
    #[must_use]
    pub fn official_url(&self, candidate: &str) -> Option<Url> {
        let url = Url::parse(candidate).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        let allowed = self
            .domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")));
        allowed.then_some(url)
    }

    /// Returns true if `candidate` is an official http(s) URL.
    #[must_use]
    pub fn is_official(&self, candidate: &str) -> bool {
        self.official_url(candidate).is_some()
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("static regex")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().\-]{6,}\d").expect("static regex"))
}

/// Extracts contacts from `(role, evidence)` pairs.
///
/// Output is deduplicated and keeps input order.
pub fn extract_contacts<'a, I>(evidence: I, domains: &DomainAllowList) -> Vec<Contact>
where
    I: IntoIterator<Item = (Role, &'a EvidenceItem)>,
{
    let mut seen: HashSet<(Role, ContactKind, String)> = HashSet::new();
    let mut contacts = Vec::new();

    let mut push = |role: Role, kind: ContactKind, value: String, path: &str| {
        if seen.insert((role, kind, value.clone())) {
            contacts.push(Contact {
                role,
                kind,
                value,
                source_path: path.to_string(),
            });
        }
    };

    for (role, item) in evidence {
        if item.strength() != Strength::Strong || !item.source().is_deterministic() {
            continue;
        }
        let Some(url) = domains.official_url(item.path()) else {
            continue;
        };

        push(role, ContactKind::Website, url.origin().ascii_serialization(), item.path());

        if let Some(note) = item.note() {
            for m in email_re().find_iter(note) {
                push(role, ContactKind::Email, m.as_str().to_ascii_lowercase(), item.path());
            }
            for m in phone_re().find_iter(note) {
                push(role, ContactKind::Phone, m.as_str().trim().to_string(), item.path());
            }
        }
    }

    contacts
}
