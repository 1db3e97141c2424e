//! Candidate conflict resolver: deterministic sanity checks over the
//! (CFO, CRO) pair for one company. Pure functions, no I/O.
//!
//! Each rule unconditionally clears the offending candidate rather than
//! attempting repair. These cheap guards catch the two dominant upstream
//! failure modes: hallucinated duplicate people and misclassified titles.

use crate::candidate::{
    has_finance_vocabulary, has_revenue_vocabulary, reads_as_finance_title, ExecutiveCandidate,
};
use crate::domain_utils::email_domain_allowed;

/// Result of conflict resolution: the surviving pair plus the findings
/// recorded as validation notes.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub cfo: ExecutiveCandidate,
    pub cro: ExecutiveCandidate,
    pub notes: Vec<String>,
}

/// Apply the name- and title-level conflict rules, in order:
/// 1. same person in both slots clears the CRO
/// 2. a CRO whose title reads as a finance title is cleared
/// 3. a candidate whose title lacks its own role's vocabulary is cleared
///
/// Idempotent: applying twice yields the same result as applying once.
pub fn resolve(mut cfo: ExecutiveCandidate, mut cro: ExecutiveCandidate) -> Resolution {
    let mut notes = Vec::new();

    // Rule 1: same-person
    if !cfo.is_empty()
        && !cro.is_empty()
        && cfo.name.eq_ignore_ascii_case(&cro.name)
    {
        notes.push(format!(
            "duplicate person: '{}' held both CFO and CRO slots; CRO cleared",
            cro.name
        ));
        cro.clear();
    }

    // Rule 2: cross-role-title
    if !cro.is_empty() && reads_as_finance_title(&cro.title) {
        notes.push(format!(
            "cross-role title: CRO '{}' carries finance title '{}'; CRO cleared",
            cro.name, cro.title
        ));
        cro.clear();
    }

    // Rule 3: role-sanity
    if !cfo.is_empty() && !has_finance_vocabulary(&cfo.title) {
        notes.push(format!(
            "role sanity: CFO '{}' title '{}' lacks finance vocabulary; CFO cleared",
            cfo.name, cfo.title
        ));
        cfo.clear();
    }
    if !cro.is_empty() && !has_revenue_vocabulary(&cro.title) {
        notes.push(format!(
            "role sanity: CRO '{}' title '{}' lacks revenue vocabulary; CRO cleared",
            cro.name, cro.title
        ));
        cro.clear();
    }

    Resolution { cfo, cro, notes }
}

/// Rule 4: domain-consistency, applied after contact enrichment. An email
/// whose domain is outside the company's allowed-domain set is cleared from
/// the contact record; phone and profile URL are untouched.
///
/// Returns a validation note when a violation was cleared.
pub fn enforce_domain_consistency(
    candidate: &mut ExecutiveCandidate,
    allowed_domains: &[String],
) -> Option<String> {
    if candidate.is_empty() || candidate.contact.email.is_empty() {
        return None;
    }

    if email_domain_allowed(&candidate.contact.email, allowed_domains) {
        return None;
    }

    let note = format!(
        "domain mismatch: email '{}' for '{}' outside allowed domains {:?}; email cleared",
        candidate.contact.email, candidate.name, allowed_domains
    );
    candidate.contact.email.clear();
    candidate.contact.email_valid = false;
    Some(note)
}
