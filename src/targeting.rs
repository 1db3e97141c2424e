//! Acquisition targeting resolver: decides whether executives are sourced
//! from the subsidiary, an acquiring parent, or both.
//!
//! The strategy is a pure function of corporate-structure facts; candidate
//! selection per role is a second pure function over the two research
//! outcomes. The processor owns the fallback semantics (a parent lookup
//! that yields nothing falls back to subsidiary research).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidate::ExecutiveCandidate;
use crate::company::{AcquisitionInfo, OperationalStatus};

/// How executives are sourced for an acquired (or independent) company
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetingStrategy {
    /// Prefer subsidiary-found executives; parent executives replace them
    /// only past the replacement margin
    SubsidiaryFirst,
    /// Parent is the primary source; subsidiary is the fallback
    ParentPrimary,
    /// Skip subsidiary research entirely when the parent yielded executives
    ParentOnly,
    /// Research both, keep the higher-confidence candidate per role
    DualTargeting,
    /// Ambiguous integration state: dual targeting while the acquisition
    /// settles
    TransitionalDualTargeting,
}

impl TargetingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetingStrategy::SubsidiaryFirst => "subsidiary_first",
            TargetingStrategy::ParentPrimary => "parent_primary",
            TargetingStrategy::ParentOnly => "parent_only",
            TargetingStrategy::DualTargeting => "dual_targeting",
            TargetingStrategy::TransitionalDualTargeting => "transitional_dual_targeting",
        }
    }

    /// Whether this strategy researches the parent at all
    pub fn targets_parent(&self) -> bool {
        !matches!(self, TargetingStrategy::SubsidiaryFirst)
    }
}

impl std::fmt::Display for TargetingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the targeting strategy from acquisition facts.
///
/// A manual override is honored unconditionally - it is the escape hatch
/// for known-bad automated classifications (e.g. a former executive
/// erroneously resurfacing from parent research).
pub fn resolve_strategy(
    acquisition: Option<&AcquisitionInfo>,
    parent_known: bool,
    manual_override: Option<TargetingStrategy>,
) -> TargetingStrategy {
    if let Some(forced) = manual_override {
        debug!("targeting override in effect: {}", forced);
        return forced;
    }

    let Some(acquisition) = acquisition else {
        return TargetingStrategy::SubsidiaryFirst;
    };

    if !acquisition.is_acquired {
        return TargetingStrategy::SubsidiaryFirst;
    }

    match acquisition.operational_status {
        OperationalStatus::OperatingIndependently => TargetingStrategy::SubsidiaryFirst,
        OperationalStatus::FullyAbsorbed => {
            if parent_known {
                TargetingStrategy::ParentOnly
            } else {
                TargetingStrategy::ParentPrimary
            }
        }
        OperationalStatus::Transitional => TargetingStrategy::TransitionalDualTargeting,
        OperationalStatus::Unknown => TargetingStrategy::DualTargeting,
    }
}

/// Pick the candidate for one role given subsidiary and parent research
/// outcomes under a strategy. Returns the winner (possibly empty), the
/// selection reason, and whether the winner came from parent research
/// (drives the allowed-email-domain set downstream).
pub fn select_candidate(
    strategy: TargetingStrategy,
    subsidiary: Option<ExecutiveCandidate>,
    parent: Option<ExecutiveCandidate>,
    replacement_margin: u8,
) -> (ExecutiveCandidate, &'static str, bool) {
    match strategy {
        TargetingStrategy::SubsidiaryFirst => {
            match (subsidiary, parent) {
                (Some(sub), Some(par)) => {
                    // Parent replaces subsidiary only past the fixed margin
                    if par.confidence >= sub.confidence.saturating_add(replacement_margin) {
                        (par, "parent executive exceeded subsidiary confidence margin", true)
                    } else {
                        (sub, "subsidiary executive preferred", false)
                    }
                }
                (Some(sub), None) => (sub, "subsidiary executive preferred", false),
                (None, Some(par)) => (par, "parent executive used, subsidiary search empty", true),
                (None, None) => (ExecutiveCandidate::empty(), "no executive found", false),
            }
        }
        TargetingStrategy::ParentPrimary | TargetingStrategy::ParentOnly => {
            match (subsidiary, parent) {
                // Parent lookup that yields nothing transparently falls
                // back to subsidiary research
                (_, Some(par)) => (par, "parent company controls operations", true),
                (Some(sub), None) => (sub, "subsidiary fallback, parent search empty", false),
                (None, None) => (ExecutiveCandidate::empty(), "no executive found", false),
            }
        }
        TargetingStrategy::DualTargeting | TargetingStrategy::TransitionalDualTargeting => {
            match (subsidiary, parent) {
                (Some(sub), Some(par)) => {
                    if par.confidence > sub.confidence {
                        (par, "higher-confidence parent executive", true)
                    } else {
                        (sub, "higher-confidence subsidiary executive", false)
                    }
                }
                (Some(sub), None) => (sub, "subsidiary executive, parent search empty", false),
                (None, Some(par)) => (par, "parent executive, subsidiary search empty", true),
                (None, None) => (ExecutiveCandidate::empty(), "no executive found", false),
            }
        }
    }
}
