//! Role classifier: scores free-text job titles against canonical role
//! vocabulary and picks the best executive candidate for a role.
//!
//! Two-pass design, precision first: the strict pass requires positive
//! evidence and applies hard exclusions; only when no candidate clears the
//! score floor does a loosened fallback pass widen matching to loosely
//! related keywords before giving up.

use tracing::debug;

use crate::candidate::{ExecutiveCandidate, Role};
use crate::providers::RawCandidate;

/// Bonus for an exact canonical title match ("chief financial officer")
const EXACT_MATCH_BONUS: i32 = 100;
/// Bonus for a known synonym (controller, VP finance, ...)
const SYNONYM_BONUS: i32 = 60;
/// Bonus for a recently appointed candidate
const RECENCY_BONUS: i32 = 10;
/// Score assigned by the loosened fallback pass
const FALLBACK_SCORE: i32 = 40;

/// Outcome of scoring a single title for a role
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleScore {
    pub score: i32,
    /// 1 = exact canonical match, 2 = synonym/fallback match
    pub tier: u8,
}

/// Score a raw title against a role's vocabulary (strict pass).
///
/// Hard exclusions (opposite-domain or non-operational terms) force the
/// score to 0 regardless of other bonuses. A title containing none of the
/// role's required vocabulary also scores 0, so empty or irrelevant titles
/// never match by accident.
pub fn score_title(title: &str, role: Role, recent_appointment: bool) -> TitleScore {
    let title_lower = title.to_lowercase();

    if title_lower.trim().is_empty() {
        return TitleScore { score: 0, tier: 0 };
    }

    // Hard exclusions first: opposite-domain vocabulary and
    // non-operational roles (CEO, chairman, board, founder)
    if role.exclusions().iter().any(|term| title_lower.contains(term)) {
        return TitleScore { score: 0, tier: 0 };
    }

    // Positive-evidence requirement
    if !role.required_vocabulary().iter().any(|kw| title_lower.contains(kw)) {
        return TitleScore { score: 0, tier: 0 };
    }

    let mut score = 0;
    let mut tier = 2;

    if role.exact_titles().iter().any(|t| title_lower.contains(t)) {
        score += EXACT_MATCH_BONUS;
        tier = 1;
    } else if role.synonyms().iter().any(|t| title_lower.contains(t)) {
        score += SYNONYM_BONUS;
    }

    if score > 0 && recent_appointment {
        score += RECENCY_BONUS;
    }

    TitleScore { score, tier }
}

/// Loosened second-pass score: any loosely related keyword anywhere in the
/// title, still subject to hard exclusions.
fn score_title_fallback(title: &str, role: Role) -> i32 {
    let title_lower = title.to_lowercase();

    if role.exclusions().iter().any(|term| title_lower.contains(term)) {
        return 0;
    }

    if role.fallback_keywords().iter().any(|kw| title_lower.contains(kw)) {
        FALLBACK_SCORE
    } else {
        0
    }
}

/// Classify raw research candidates into the best executive candidate for
/// a role, or None when nothing matches.
pub fn classify(candidates: &[RawCandidate], role: Role, score_floor: i32) -> Option<ExecutiveCandidate> {
    // Strict pass
    let mut best: Option<(i32, u8, &RawCandidate)> = None;
    for candidate in candidates {
        let scored = score_title(&candidate.title, role, candidate.recent_appointment);
        if scored.score <= 0 {
            continue;
        }
        debug!(
            "{}: '{}' ({}) scored {} tier {}",
            role, candidate.name, candidate.title, scored.score, scored.tier
        );
        // Bonuses are distinct constants so ties are not expected;
        // first-seen wins if they happen anyway
        if best.map_or(true, |(s, _, _)| scored.score > s) {
            best = Some((scored.score, scored.tier, candidate));
        }
    }

    if let Some((score, tier, winner)) = best {
        if score >= score_floor {
            return Some(build_candidate(winner, role, tier, match tier {
                1 => "exact canonical title match",
                _ => "synonym title match",
            }));
        }
    }

    // Loosened fallback pass: favors recall once precision failed
    let mut fallback: Option<(i32, &RawCandidate)> = None;
    for candidate in candidates {
        let score = score_title_fallback(&candidate.title, role);
        if score <= 0 {
            continue;
        }
        if fallback.map_or(true, |(s, _)| score > s) {
            fallback = Some((score, candidate));
        }
    }

    fallback.map(|(_, winner)| {
        debug!("{}: fallback pass matched '{}' ({})", role, winner.name, winner.title);
        build_candidate(winner, role, 2, "loose keyword fallback match")
    })
}

fn build_candidate(raw: &RawCandidate, role: Role, tier: u8, reason: &str) -> ExecutiveCandidate {
    ExecutiveCandidate {
        name: raw.name.clone(),
        title: raw.title.clone(),
        role: Some(role),
        tier,
        confidence: raw.confidence.min(100),
        source: raw.source.clone(),
        recent_appointment: raw.recent_appointment,
        appointment_date: raw.appointment_date,
        selection_reason: reason.to_string(),
        contact: Default::default(),
    }
}
