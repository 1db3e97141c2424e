//! Executive candidate and contact record types shared across the pipeline.
//!
//! Candidates are created by the role classifier from raw research output,
//! may be cleared (reset to the empty sentinel) by the conflict or targeting
//! resolvers, and carry their contact record through enrichment. Resolution
//! is sequential per company, so no candidate is touched by two resolvers
//! at once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical executive role targeted by the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Cfo,
    Cro,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cfo => "cfo",
            Role::Cro => "cro",
        }
    }

    /// Exact canonical titles for this role (highest scoring bonus)
    pub fn exact_titles(&self) -> &'static [&'static str] {
        match self {
            Role::Cfo => &["chief financial officer", "cfo"],
            Role::Cro => &["chief revenue officer", "cro"],
        }
    }

    /// Known title synonyms for this role (smaller bonus)
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Role::Cfo => &[
                "controller",
                "vp finance",
                "vp of finance",
                "vice president finance",
                "vice president of finance",
                "chief accounting officer",
                "head of finance",
                "finance director",
                "treasurer",
            ],
            Role::Cro => &[
                "vp sales",
                "vp of sales",
                "vice president sales",
                "vice president of sales",
                "chief commercial officer",
                "chief sales officer",
                "head of revenue",
                "head of sales",
            ],
        }
    }

    /// Vocabulary a title must contain to count as positive evidence for
    /// this role. Stems, matched by lowercase substring.
    pub fn required_vocabulary(&self) -> &'static [&'static str] {
        match self {
            Role::Cfo => &["financ", "accounting", "controller", "treasur", "cfo"],
            Role::Cro => &["revenue", "sales", "commercial", "cro"],
        }
    }

    /// Loosened keywords used by the classifier's fallback pass
    pub fn fallback_keywords(&self) -> &'static [&'static str] {
        match self {
            Role::Cfo => &["finance", "financial"],
            Role::Cro => &["revenue", "sales", "commercial"],
        }
    }

    /// Terms that force a candidate's score to zero: opposite-domain titles
    /// and non-operational roles.
    pub fn exclusions(&self) -> &'static [&'static str] {
        match self {
            Role::Cfo => &[
                "chief executive", "ceo", "chairman", "board", "founder",
                "revenue", "sales", "marketing", "commercial",
            ],
            Role::Cro => &[
                "chief executive", "ceo", "chairman", "board", "founder",
                "financ", "accounting", "treasur", "cfo",
            ],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Check whether a title carries finance vocabulary
pub fn has_finance_vocabulary(title: &str) -> bool {
    let title = title.to_lowercase();
    Role::Cfo.required_vocabulary().iter().any(|kw| title.contains(kw))
}

/// Check whether a title carries revenue vocabulary
pub fn has_revenue_vocabulary(title: &str) -> bool {
    let title = title.to_lowercase();
    Role::Cro.required_vocabulary().iter().any(|kw| title.contains(kw))
}

/// Check whether a title reads as a finance title outright (used by the
/// conflict resolver's cross-role rule)
pub fn reads_as_finance_title(title: &str) -> bool {
    let title = title.to_lowercase();
    Role::Cfo.exact_titles().iter().any(|t| title.contains(t))
        || Role::Cfo.synonyms().iter().any(|t| title.contains(t))
}

/// Contact details attached to an executive candidate.
///
/// Fields start empty and are filled by the merge engine; the first
/// successful write per field wins. Email domain membership in the
/// company's allowed-domain set is enforced after enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    pub email: String,
    pub phone: String,
    pub linkedin_url: String,
    pub email_valid: bool,
    pub phone_valid: bool,
    pub country: String,
    /// Derived from appointment date or employment history when available.
    /// Never synthesized.
    pub time_in_role: String,
    /// Provider that supplied the first winning field
    pub source: String,
}

impl ContactRecord {
    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.phone.is_empty() && self.linkedin_url.is_empty()
    }
}

/// An unverified executive identification pulled from a research provider,
/// classified into a canonical role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveCandidate {
    pub name: String,
    /// Raw title as the research provider reported it
    pub title: String,
    pub role: Option<Role>,
    /// 1 = exact canonical title match, 2 = fallback/loose keyword match,
    /// 0 = empty sentinel
    pub tier: u8,
    /// 0-100; candidates below the configured gate never reach enrichment
    pub confidence: u8,
    /// Which research pass produced this candidate
    pub source: String,
    pub recent_appointment: bool,
    pub appointment_date: Option<NaiveDate>,
    /// Human-readable explanation of why this candidate was selected
    pub selection_reason: String,
    pub contact: ContactRecord,
}

impl ExecutiveCandidate {
    /// The empty sentinel a cleared candidate resets to
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            role: None,
            tier: 0,
            confidence: 0,
            source: String::new(),
            recent_appointment: false,
            appointment_date: None,
            selection_reason: String::new(),
            contact: ContactRecord::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Reset to the empty sentinel. Used by the conflict and targeting
    /// resolvers; offending candidates are cleared, never repaired.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }
}

impl Default for ExecutiveCandidate {
    fn default() -> Self {
        Self::empty()
    }
}
