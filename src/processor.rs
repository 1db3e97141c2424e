//! Per-company pipeline: corporate structure, targeting, research,
//! classification, conflict resolution, contact enrichment, validation.
//!
//! Errors here are soft. A failing provider degrades the result ("no data
//! from this stage") rather than failing the company; a failing company
//! produces an error-carrying result rather than failing the batch.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::candidate::{ExecutiveCandidate, Role};
use crate::classifier;
use crate::company::{
    AcquisitionInfo, Company, CompanyInput, ParentCompany, PipelineResult,
};
use crate::config::PipelineConfig;
use crate::conflict;
use crate::known_entities::{self, KnownEntityOverride};
use crate::merge::{self, ContactPayload};
use crate::providers::{CorporateStructure, Providers, ResearchFindings};
use crate::targeting::{self, TargetingStrategy};

pub struct CompanyProcessor {
    pipeline: PipelineConfig,
    providers: Providers,
    cache: ResponseCache,
}

impl CompanyProcessor {
    pub fn new(pipeline: PipelineConfig, providers: Providers, cache: ResponseCache) -> Self {
        Self {
            pipeline,
            providers,
            cache,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Process one company end to end. Never returns an error; failures
    /// are captured on the result so the batch keeps moving.
    pub async fn process(&self, input: &CompanyInput) -> PipelineResult {
        let started = Instant::now();
        let domain = input.domain();
        info!("Processing {} ({})", input.display_name(), domain);

        let mut company = Company::from_input(input);
        let mut notes: Vec<String> = Vec::new();

        let overrides = known_entities::lookup(&domain);
        if let Some(entry) = overrides {
            if let Some(org) = &entry.organization {
                company.name = org.clone();
            }
        }

        // Corporate structure, then the targeting decision
        let structure = self.corporate_structure(&company.name, &domain).await;
        if let Some(structure) = &structure {
            apply_structure(&mut company, structure);
        }

        let manual_override = overrides.and_then(|e| e.targeting);
        let parent_known = company.parent.is_some();
        let strategy = targeting::resolve_strategy(
            company.acquisition.as_ref(),
            parent_known,
            manual_override,
        );
        if strategy != TargetingStrategy::SubsidiaryFirst {
            notes.push(format!("targeting strategy: {}", strategy));
        }

        // Research, honoring the strategy's source preferences
        let (subsidiary_findings, parent_findings) = self
            .run_research(&company, strategy, manual_override.is_none())
            .await;

        let (mut cfo, cfo_from_parent) = self.select_for_role(
            Role::Cfo,
            strategy,
            &subsidiary_findings,
            parent_findings.as_ref(),
        );
        let (mut cro, cro_from_parent) = self.select_for_role(
            Role::Cro,
            strategy,
            &subsidiary_findings,
            parent_findings.as_ref(),
        );

        let resolution = conflict::resolve(cfo, cro);
        cfo = resolution.cfo;
        cro = resolution.cro;
        notes.extend(resolution.notes);

        // Curated last-resort entries fill only still-empty slots, and
        // never place the person already holding the other slot
        if let Some(entry) = overrides {
            let cro_name = cro.name.clone();
            fill_from_known_entity(&mut cfo, Role::Cfo, entry, &cro_name, &mut notes);
            let cfo_name = cfo.name.clone();
            fill_from_known_entity(&mut cro, Role::Cro, entry, &cfo_name, &mut notes);
        }

        // Contact enrichment behind the confidence gate. Parent-domain
        // emails are acceptable whenever a parent source was in play,
        // including a margin replacement under subsidiary_first.
        let parent_targeted =
            parent_known && (strategy.targets_parent() || cfo_from_parent || cro_from_parent);
        let allowed_domains = company.allowed_domains(parent_targeted);

        for (role, candidate) in [(Role::Cfo, &mut cfo), (Role::Cro, &mut cro)] {
            if candidate.is_empty() {
                continue;
            }
            if candidate.confidence < self.pipeline.confidence_gate {
                notes.push(format!(
                    "{} '{}' confidence {} below enrichment gate {}; contact enrichment skipped",
                    role, candidate.name, candidate.confidence, self.pipeline.confidence_gate
                ));
                continue;
            }

            self.enrich(candidate, &company, role).await;

            if let Some(note) = conflict::enforce_domain_consistency(candidate, &allowed_domains) {
                notes.push(note);
            }

            self.validate_contacts(candidate, role, &mut notes).await;
        }

        let overall_confidence =
            ((cfo.confidence as u16 + cro.confidence as u16) / 2) as u8;

        PipelineResult {
            company,
            cfo,
            cro,
            overall_confidence,
            validation_notes: notes,
            processing_time_ms: started.elapsed().as_millis() as u64,
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// First research provider with a readable corporate-structure answer
    /// wins; provider failures degrade to "no acquisition facts".
    async fn corporate_structure(&self, name: &str, domain: &str) -> Option<CorporateStructure> {
        for provider in &self.providers.research {
            let cache_key = format!("structure-{}", provider.name());
            match self
                .cache
                .get_or_fetch(&cache_key, domain, || {
                    provider.corporate_structure(name, domain)
                })
                .await
            {
                Ok(structure) => return Some(structure),
                Err(e) => {
                    warn!("Corporate structure via {} failed for {}: {:#}", provider.name(), domain, e);
                }
            }
        }
        None
    }

    /// Run subsidiary and (when the strategy calls for it) parent research.
    /// Under parent_only, subsidiary research runs only when the parent
    /// pass came back empty.
    ///
    /// An acquired company under subsidiary_first still gets a parent pass
    /// (when the strategy was derived, not manually pinned), so the
    /// replacement-margin comparison has a parent candidate to consider.
    async fn run_research(
        &self,
        company: &Company,
        strategy: TargetingStrategy,
        auto_strategy: bool,
    ) -> (ResearchFindings, Option<ResearchFindings>) {
        let parent = company.parent.as_ref().filter(|p| !p.domain.is_empty());

        if strategy == TargetingStrategy::ParentOnly {
            if let Some(parent) = parent {
                let parent_findings = self.research(&parent.name, &parent.domain).await;
                if !parent_findings.is_empty() {
                    return (ResearchFindings::default(), Some(parent_findings));
                }
                debug!("Parent research empty for {}; falling back to subsidiary", parent.domain);
                let subsidiary = self.research(&company.name, &company.domain).await;
                return (subsidiary, Some(parent_findings));
            }
        }

        let subsidiary = self.research(&company.name, &company.domain).await;
        let acquired = company
            .acquisition
            .as_ref()
            .map_or(false, |a| a.is_acquired);
        let research_parent = strategy.targets_parent() || (auto_strategy && acquired);
        let parent_findings = if research_parent {
            match parent {
                Some(parent) => Some(self.research(&parent.name, &parent.domain).await),
                None => None,
            }
        } else {
            None
        };

        (subsidiary, parent_findings)
    }

    /// Pool candidate lists across research providers for one company
    async fn research(&self, name: &str, domain: &str) -> ResearchFindings {
        let mut merged = ResearchFindings::default();
        for provider in &self.providers.research {
            let cache_key = format!("research-{}", provider.name());
            match self
                .cache
                .get_or_fetch(&cache_key, domain, || provider.research(name, domain))
                .await
            {
                Ok(findings) => {
                    merged.cfo_candidates.extend(findings.cfo_candidates);
                    merged.cro_candidates.extend(findings.cro_candidates);
                }
                Err(e) => {
                    warn!("Research via {} failed for {}: {:#}", provider.name(), domain, e);
                }
            }
        }
        merged
    }

    /// Classify both research outcomes for one role, then let the
    /// targeting rules pick between them. The returned flag marks a
    /// winner sourced from parent research.
    fn select_for_role(
        &self,
        role: Role,
        strategy: TargetingStrategy,
        subsidiary: &ResearchFindings,
        parent: Option<&ResearchFindings>,
    ) -> (ExecutiveCandidate, bool) {
        let floor = self.pipeline.classifier_score_floor;
        let candidates_of = |findings: &ResearchFindings| match role {
            Role::Cfo => findings.cfo_candidates.clone(),
            Role::Cro => findings.cro_candidates.clone(),
        };

        let from_subsidiary = classifier::classify(&candidates_of(subsidiary), role, floor);
        let from_parent =
            parent.and_then(|findings| classifier::classify(&candidates_of(findings), role, floor));

        let (mut winner, reason, won_from_parent) = targeting::select_candidate(
            strategy,
            from_subsidiary,
            from_parent,
            self.pipeline.parent_replacement_margin,
        );
        if !winner.is_empty() {
            // Targeting-level reason supersedes the classifier's when a
            // cross-source decision was actually made
            if strategy.targets_parent() || parent.is_some() {
                winner.selection_reason = reason.to_string();
            }
            debug!("{}: selected '{}' ({})", role, winner.name, winner.selection_reason);
        }
        (winner, won_from_parent)
    }

    /// Query contact providers in configured priority order and merge the
    /// payloads. A second, deeper pass runs only when both phone and
    /// profile URL are still missing.
    async fn enrich(&self, candidate: &mut ExecutiveCandidate, company: &Company, role: Role) {
        let mut payloads: Vec<ContactPayload> = Vec::new();
        let subject = format!("{}:{}:{}", company.domain, role.as_str(), candidate.name.to_lowercase());

        for provider in &self.providers.contact {
            let cache_key = format!("contact-{}", provider.name());
            match self
                .cache
                .get_or_fetch(&cache_key, &subject, || {
                    provider.lookup(&candidate.name, &company.name, &company.domain, role)
                })
                .await
            {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => {}
                Err(e) => {
                    warn!("Contact lookup via {} failed for '{}': {:#}", provider.name(), candidate.name, e);
                }
            }
        }

        let mut record = merge::merge(&candidate.name, role, &payloads);

        if record.phone.is_empty() && record.linkedin_url.is_empty() {
            debug!("Phone and profile URL missing for '{}'; running fallback lookups", candidate.name);
            for provider in &self.providers.contact {
                let cache_key = format!("contact-fallback-{}", provider.name());
                match self
                    .cache
                    .get_or_fetch(&cache_key, &subject, || {
                        provider.fallback_lookup(&candidate.name, &company.name, &company.domain, role)
                    })
                    .await
                {
                    Ok(Some(payload)) => payloads.push(payload),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Fallback lookup via {} failed for '{}': {:#}", provider.name(), candidate.name, e);
                    }
                }
            }
            record = merge::merge(&candidate.name, role, &payloads);
        }

        record.time_in_role = merge::derive_time_in_role(candidate.appointment_date);
        candidate.contact = record;
    }

    /// Flag deliverability of found contact fields. Values are flagged,
    /// never removed; only the domain-consistency rule clears data.
    async fn validate_contacts(
        &self,
        candidate: &mut ExecutiveCandidate,
        role: Role,
        notes: &mut Vec<String>,
    ) {
        let Some(validator) = &self.providers.validation else {
            return;
        };

        if !candidate.contact.email.is_empty() {
            let cache_key = format!("validate-email-{}", validator.name());
            let email = candidate.contact.email.clone();
            match self
                .cache
                .get_or_fetch(&cache_key, &email, || validator.validate_email(&email))
                .await
            {
                Ok(verdict) => {
                    candidate.contact.email_valid = verdict.is_valid;
                    if !verdict.is_valid {
                        notes.push(format!(
                            "{} email '{}' failed validation: {}",
                            role, email, verdict.reason
                        ));
                    }
                }
                Err(e) => warn!("Email validation failed for '{}': {:#}", email, e),
            }
        }

        if !candidate.contact.phone.is_empty() {
            let cache_key = format!("validate-phone-{}", validator.name());
            let phone = candidate.contact.phone.clone();
            match self
                .cache
                .get_or_fetch(&cache_key, &phone, || validator.validate_phone(&phone))
                .await
            {
                Ok(verdict) => {
                    candidate.contact.phone_valid = verdict.is_valid;
                    if !verdict.is_valid {
                        notes.push(format!(
                            "{} phone '{}' failed validation: {}",
                            role, phone, verdict.reason
                        ));
                    }
                }
                Err(e) => warn!("Phone validation failed for '{}': {:#}", phone, e),
            }
        }
    }
}

fn apply_structure(company: &mut Company, structure: &CorporateStructure) {
    company.acquisition = Some(AcquisitionInfo {
        is_acquired: structure.is_acquired,
        acquisition_date: structure.acquisition_date.clone(),
        acquisition_type: structure.acquisition_type.clone(),
        confidence: structure.confidence,
        operational_status: structure.operational_status,
    });

    if structure.is_acquired {
        if let (Some(name), Some(domain)) = (&structure.parent_name, &structure.parent_domain) {
            company.parent = Some(ParentCompany {
                name: name.clone(),
                domain: domain.to_lowercase(),
                domain_aliases: structure
                    .parent_domain_aliases
                    .iter()
                    .map(|d| d.to_lowercase())
                    .collect(),
            });
        }
    }
}

/// Curated entries are a floor under research, never a ceiling: they only
/// fill a role research left empty. A curated name matching the executive
/// in the other slot is skipped, so the same person never holds both roles.
fn fill_from_known_entity(
    candidate: &mut ExecutiveCandidate,
    role: Role,
    entry: &KnownEntityOverride,
    other_slot_name: &str,
    notes: &mut Vec<String>,
) {
    if !candidate.is_empty() {
        return;
    }
    let known = match role {
        Role::Cfo => entry.cfo.as_ref(),
        Role::Cro => entry.cro.as_ref(),
    };
    let Some(known) = known else {
        return;
    };
    if known.name.eq_ignore_ascii_case(other_slot_name) {
        notes.push(format!(
            "curated {} record skipped: '{}' already holds the other role slot",
            role, known.name
        ));
        return;
    }

    candidate.name = known.name.clone();
    candidate.title = known.title.clone();
    candidate.role = Some(role);
    candidate.tier = 2;
    candidate.confidence = 60;
    candidate.source = if known.source.is_empty() {
        "known_entities".to_string()
    } else {
        known.source.clone()
    };
    candidate.selection_reason = "curated known-entity record".to_string();
    if let Some(url) = &known.linkedin_url {
        candidate.contact.linkedin_url = url.clone();
    }
    notes.push(format!("{} filled from curated known-entity record", role));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::OperationalStatus;
    use crate::known_entities::KnownExecutive;

    #[test]
    fn test_apply_structure_sets_parent_only_when_acquired() {
        let mut company = Company::from_input(&CompanyInput::new("target.com"));
        let structure = CorporateStructure {
            is_acquired: false,
            parent_name: Some("ParentCo".to_string()),
            parent_domain: Some("ParentCo.com".to_string()),
            ..Default::default()
        };
        apply_structure(&mut company, &structure);
        assert!(company.parent.is_none());
        assert!(!company.acquisition.as_ref().unwrap().is_acquired);

        let structure = CorporateStructure {
            is_acquired: true,
            parent_name: Some("ParentCo".to_string()),
            parent_domain: Some("ParentCo.com".to_string()),
            operational_status: OperationalStatus::FullyAbsorbed,
            ..Default::default()
        };
        apply_structure(&mut company, &structure);
        assert_eq!(company.parent.as_ref().unwrap().domain, "parentco.com");
    }

    #[test]
    fn test_known_entity_fill_only_when_empty() {
        let entry = KnownEntityOverride {
            cfo: Some(KnownExecutive {
                name: "Jane Doe".to_string(),
                title: "Chief Financial Officer".to_string(),
                linkedin_url: Some("https://linkedin.com/in/janedoe".to_string()),
                source: "press_release".to_string(),
            }),
            ..Default::default()
        };

        let mut notes = Vec::new();
        let mut empty = ExecutiveCandidate::empty();
        fill_from_known_entity(&mut empty, Role::Cfo, &entry, "", &mut notes);
        assert_eq!(empty.name, "Jane Doe");
        assert_eq!(empty.selection_reason, "curated known-entity record");
        assert_eq!(notes.len(), 1);

        let mut researched = ExecutiveCandidate {
            name: "Research Winner".to_string(),
            ..ExecutiveCandidate::empty()
        };
        fill_from_known_entity(&mut researched, Role::Cfo, &entry, "", &mut notes);
        assert_eq!(researched.name, "Research Winner");
    }

    #[test]
    fn test_known_entity_fill_never_duplicates_other_slot() {
        let entry = KnownEntityOverride {
            cfo: Some(KnownExecutive {
                name: "Jane Doe".to_string(),
                title: "Chief Financial Officer".to_string(),
                linkedin_url: None,
                source: "press_release".to_string(),
            }),
            ..Default::default()
        };

        let mut notes = Vec::new();
        let mut cfo = ExecutiveCandidate::empty();
        // Research already placed the same person in the CRO slot
        fill_from_known_entity(&mut cfo, Role::Cfo, &entry, "jane doe", &mut notes);
        assert!(cfo.is_empty(), "curated fill must not duplicate the CRO");
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("already holds the other role slot"));
    }
}
