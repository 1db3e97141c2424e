//! End-to-end pipeline tests over scripted providers.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tempfile::TempDir;

use execfinder::cache::ResponseCache;
use execfinder::candidate::Role;
use execfinder::checkpoint::Checkpoint;
use execfinder::company::{CompanyInput, OperationalStatus};
use execfinder::config::{PipelineConfig, SchedulerConfig};
use execfinder::merge::{ContactFields, ContactPayload, RoleKeyedContacts};
use execfinder::processor::CompanyProcessor;
use execfinder::providers::{
    ContactProvider, CorporateStructure, Providers, RawCandidate, ResearchFindings,
    ResearchProvider, Validation, ValidationProvider,
};
use execfinder::scheduler::BatchScheduler;

fn raw(name: &str, title: &str, confidence: u8) -> RawCandidate {
    RawCandidate {
        name: name.to_string(),
        title: title.to_string(),
        confidence,
        source: "mock".to_string(),
        recent_appointment: false,
        appointment_date: None,
    }
}

#[derive(Default)]
struct MockResearch {
    findings: HashMap<String, ResearchFindings>,
    structures: HashMap<String, CorporateStructure>,
    slow_domain: Option<(String, Duration)>,
}

#[async_trait]
impl ResearchProvider for MockResearch {
    fn name(&self) -> &str {
        "mock-research"
    }

    async fn research(&self, _company_name: &str, website: &str) -> Result<ResearchFindings> {
        if let Some((domain, delay)) = &self.slow_domain {
            if website == domain {
                tokio::time::sleep(*delay).await;
            }
        }
        Ok(self.findings.get(website).cloned().unwrap_or_default())
    }

    async fn corporate_structure(
        &self,
        _company_name: &str,
        website: &str,
    ) -> Result<CorporateStructure> {
        Ok(self.structures.get(website).cloned().unwrap_or_default())
    }
}

/// Contact payloads keyed by lowercase executive name
#[derive(Default)]
struct MockContacts {
    payloads: HashMap<String, ContactPayload>,
}

#[async_trait]
impl ContactProvider for MockContacts {
    fn name(&self) -> &str {
        "mock-contacts"
    }

    async fn lookup(
        &self,
        executive_name: &str,
        _company_name: &str,
        _website: &str,
        _role: Role,
    ) -> Result<Option<ContactPayload>> {
        Ok(self.payloads.get(&executive_name.to_lowercase()).cloned())
    }
}

#[derive(Default)]
struct MockValidator {
    invalid_emails: HashSet<String>,
}

#[async_trait]
impl ValidationProvider for MockValidator {
    fn name(&self) -> &str {
        "mock-validator"
    }

    async fn validate_email(&self, email: &str) -> Result<Validation> {
        if self.invalid_emails.contains(email) {
            Ok(Validation {
                is_valid: false,
                reason: "mailbox does not exist".to_string(),
            })
        } else {
            Ok(Validation {
                is_valid: true,
                reason: String::new(),
            })
        }
    }

    async fn validate_phone(&self, _phone: &str) -> Result<Validation> {
        Ok(Validation {
            is_valid: true,
            reason: String::new(),
        })
    }
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        confidence_gate: 90,
        parent_replacement_margin: 20,
        classifier_score_floor: 50,
    }
}

fn role_keyed(role: Role, email: &str, phone: &str, linkedin: &str) -> ContactPayload {
    let fields = ContactFields {
        email: Some(email.to_string()),
        phone: Some(phone.to_string()).filter(|p| !p.is_empty()),
        linkedin_url: Some(linkedin.to_string()).filter(|l| !l.is_empty()),
        country: None,
        confidence: 85,
        generated: false,
        source: "mock-contacts".to_string(),
    };
    let contacts = match role {
        Role::Cfo => RoleKeyedContacts {
            cfo: Some(fields),
            cro: None,
        },
        Role::Cro => RoleKeyedContacts {
            cfo: None,
            cro: Some(fields),
        },
    };
    ContactPayload::RoleKeyed(contacts)
}

fn processor_with(providers: Providers, cache_dir: &std::path::Path) -> CompanyProcessor {
    CompanyProcessor::new(
        pipeline_config(),
        providers,
        ResponseCache::new(cache_dir, Duration::from_secs(3600)),
    )
}

#[tokio::test]
async fn test_ceo_never_reported_as_cfo() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "acme.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Marc Benioff", "Chief Executive Officer", 99)],
            cro_candidates: vec![],
        },
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("acme.com")).await;
    assert!(result.error.is_none());
    assert!(result.cfo.is_empty(), "CEO must never fill the CFO slot");
    assert_eq!(result.cfo.name, "");
}

#[tokio::test]
async fn test_duplicate_person_clears_cro() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "acme.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Jane Doe", "Chief Financial Officer", 95)],
            cro_candidates: vec![raw("Jane Doe", "Chief Revenue Officer", 93)],
        },
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("acme.com")).await;
    assert_eq!(result.cfo.name, "Jane Doe");
    assert!(result.cro.is_empty());
    assert!(result
        .validation_notes
        .iter()
        .any(|n| n.contains("duplicate person")));
}

#[tokio::test]
async fn test_fully_absorbed_company_uses_parent_executives() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.structures.insert(
        "acquired.com".to_string(),
        CorporateStructure {
            is_acquired: true,
            parent_name: Some("ParentCo".to_string()),
            parent_domain: Some("parentco.com".to_string()),
            parent_domain_aliases: vec![],
            acquisition_date: Some("2024-03-01".to_string()),
            acquisition_type: Some("full".to_string()),
            confidence: 95,
            operational_status: OperationalStatus::FullyAbsorbed,
        },
    );
    research.findings.insert(
        "parentco.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Parent CFO", "Chief Financial Officer", 94)],
            cro_candidates: vec![raw("Parent CRO", "Chief Revenue Officer", 92)],
        },
    );

    let mut contacts = MockContacts::default();
    contacts.payloads.insert(
        "parent cfo".to_string(),
        role_keyed(Role::Cfo, "cfo@parentco.com", "", ""),
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![Box::new(contacts)],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("acquired.com")).await;
    assert_eq!(result.cfo.name, "Parent CFO");
    assert_eq!(result.cro.name, "Parent CRO");
    assert_eq!(result.cfo.selection_reason, "parent company controls operations");
    // Parent-domain email is allowed because the parent was targeted
    assert_eq!(result.cfo.contact.email, "cfo@parentco.com");
    assert_eq!(result.company.parent.as_ref().unwrap().domain, "parentco.com");
}

#[tokio::test]
async fn test_curated_fill_never_duplicates_researched_executive() {
    // config/known_entities.json curates a CFO named Jane Doe for
    // example-acquired.com; research placing the same person in the CRO
    // slot must leave the CFO slot empty.
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "example-acquired.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![],
            cro_candidates: vec![raw("Jane Doe", "Chief Revenue Officer", 95)],
        },
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor
        .process(&CompanyInput::new("example-acquired.com"))
        .await;
    assert_eq!(result.cro.name, "Jane Doe");
    assert!(result.cfo.is_empty(), "one person must never hold both slots");
    assert!(result
        .validation_notes
        .iter()
        .any(|n| n.contains("already holds the other role slot")));
}

#[tokio::test]
async fn test_parent_replaces_subsidiary_only_past_margin() {
    // Acquired but operating independently: subsidiary_first still gets a
    // parent research pass, and the parent executive wins a role only when
    // beating the subsidiary's confidence by the replacement margin.
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.structures.insert(
        "indie.com".to_string(),
        CorporateStructure {
            is_acquired: true,
            parent_name: Some("ParentCo".to_string()),
            parent_domain: Some("parentco.com".to_string()),
            parent_domain_aliases: vec![],
            acquisition_date: Some("2023-06-01".to_string()),
            acquisition_type: Some("full".to_string()),
            confidence: 95,
            operational_status: OperationalStatus::OperatingIndependently,
        },
    );
    research.findings.insert(
        "indie.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Sub CFO", "Chief Financial Officer", 70)],
            cro_candidates: vec![raw("Sub CRO", "Chief Revenue Officer", 90)],
        },
    );
    research.findings.insert(
        "parentco.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Parent CFO", "Chief Financial Officer", 95)],
            cro_candidates: vec![raw("Parent CRO", "Chief Revenue Officer", 95)],
        },
    );

    let mut contacts = MockContacts::default();
    contacts.payloads.insert(
        "parent cfo".to_string(),
        role_keyed(Role::Cfo, "cfo@parentco.com", "", ""),
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![Box::new(contacts)],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("indie.com")).await;

    // CFO: 95 beats 70 by at least the 20-point margin
    assert_eq!(result.cfo.name, "Parent CFO");
    assert!(result.cfo.selection_reason.contains("margin"));
    // CRO: 95 does not beat 90 by the margin; subsidiary kept
    assert_eq!(result.cro.name, "Sub CRO");
    assert!(result.cro.selection_reason.contains("subsidiary"));
    // The margin winner keeps its parent-domain email
    assert_eq!(result.cfo.contact.email, "cfo@parentco.com");
}

#[tokio::test]
async fn test_foreign_email_cleared_but_other_fields_kept() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "target.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Jane Doe", "Chief Financial Officer", 95)],
            cro_candidates: vec![],
        },
    );

    let mut contacts = MockContacts::default();
    contacts.payloads.insert(
        "jane doe".to_string(),
        role_keyed(
            Role::Cfo,
            "jane@unrelated.com",
            "+1 555 0100",
            "https://linkedin.com/in/janedoe",
        ),
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![Box::new(contacts)],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("target.com")).await;
    assert_eq!(result.cfo.contact.email, "", "foreign-domain email must be cleared");
    assert_eq!(result.cfo.contact.phone, "+1 555 0100");
    assert_eq!(result.cfo.contact.linkedin_url, "https://linkedin.com/in/janedoe");
    assert!(result
        .validation_notes
        .iter()
        .any(|n| n.contains("domain mismatch")));
}

#[tokio::test]
async fn test_confidence_gate_skips_enrichment() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "acme.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Jane Doe", "Chief Financial Officer", 80)],
            cro_candidates: vec![],
        },
    );

    let mut contacts = MockContacts::default();
    contacts.payloads.insert(
        "jane doe".to_string(),
        role_keyed(Role::Cfo, "jane@acme.com", "", ""),
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![Box::new(contacts)],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("acme.com")).await;
    // Identification survives; enrichment does not run below the gate
    assert_eq!(result.cfo.name, "Jane Doe");
    assert!(result.cfo.contact.email.is_empty());
    assert!(result
        .validation_notes
        .iter()
        .any(|n| n.contains("below enrichment gate")));
}

#[tokio::test]
async fn test_invalid_email_flagged_but_kept() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "acme.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Jane Doe", "Chief Financial Officer", 95)],
            cro_candidates: vec![],
        },
    );

    let mut contacts = MockContacts::default();
    contacts.payloads.insert(
        "jane doe".to_string(),
        role_keyed(Role::Cfo, "jane@acme.com", "", ""),
    );

    let mut validator = MockValidator::default();
    validator.invalid_emails.insert("jane@acme.com".to_string());

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![Box::new(contacts)],
        validation: Some(Box::new(validator)),
    };
    let processor = processor_with(providers, temp.path());

    let result = processor.process(&CompanyInput::new("acme.com")).await;
    assert_eq!(result.cfo.contact.email, "jane@acme.com");
    assert!(!result.cfo.contact.email_valid);
    assert!(result
        .validation_notes
        .iter()
        .any(|n| n.contains("failed validation")));
}

#[tokio::test]
async fn test_batch_completeness_with_one_timeout() {
    let temp = TempDir::new().unwrap();

    let mut research = MockResearch::default();
    research.slow_domain = Some(("slow.com".to_string(), Duration::from_secs(10)));
    for i in 0..29 {
        research.findings.insert(
            format!("company{}.com", i),
            ResearchFindings {
                cfo_candidates: vec![raw("Jane Doe", "Chief Financial Officer", 95)],
                cro_candidates: vec![],
            },
        );
    }

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![],
        validation: None,
    };
    let processor = processor_with(providers, &temp.path().join("cache"));

    let scheduler_config = SchedulerConfig {
        batch_size: 25,
        checkpoint_interval: 10,
        inter_batch_delay_ms: 0,
        per_company_timeout_secs: 1,
    };
    let scheduler = BatchScheduler::new(&processor, scheduler_config);

    let mut inputs: Vec<CompanyInput> = (0..29)
        .map(|i| CompanyInput::new(format!("company{}.com", i)))
        .collect();
    inputs.insert(7, CompanyInput::new("slow.com"));

    let checkpoint = Checkpoint::new("test".to_string(), "hash".to_string());
    let (results, stats) = scheduler
        .run_all(&inputs, checkpoint, temp.path())
        .await
        .unwrap();

    // Every input yields exactly one result, failures included
    assert_eq!(results.len(), 30);
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].company.domain, "slow.com");
    assert!(failed[0].error.as_ref().unwrap().contains("timed out"));

    assert_eq!(stats.total_companies, 30);
    assert_eq!(stats.succeeded, 29);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.cfo_found, 29);
}

#[tokio::test]
async fn test_cache_serves_repeat_research() {
    let temp = TempDir::new().unwrap();
    let mut research = MockResearch::default();
    research.findings.insert(
        "acme.com".to_string(),
        ResearchFindings {
            cfo_candidates: vec![raw("Jane Doe", "Chief Financial Officer", 95)],
            cro_candidates: vec![],
        },
    );

    let providers = Providers {
        research: vec![Box::new(research)],
        contact: vec![],
        validation: None,
    };
    let processor = processor_with(providers, temp.path());

    let input = CompanyInput::new("acme.com");
    processor.process(&input).await;
    let misses_after_first = processor.cache().misses();
    assert!(misses_after_first > 0);

    processor.process(&input).await;
    // Second pass answers every provider call from cache
    assert_eq!(processor.cache().misses(), misses_after_first);
    assert!(processor.cache().hits() > 0);
}
