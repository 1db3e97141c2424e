//! External provider interfaces: AI-assisted research, contact directories,
//! and email/phone validators.
//!
//! Providers are thin I/O wrappers behind traits; everything downstream of
//! the response parsing is provider-agnostic. Provider failures are soft:
//! the processor treats them as "no data from this provider".

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::candidate::Role;
use crate::company::OperationalStatus;
use crate::config::{HttpConfig, ProviderEndpoint};
use crate::merge::{ContactFields, ContactPayload, DiscoveryHit, ExecutiveContact, RoleKeyedContacts};

/// A raw executive identification from a research provider, prior to
/// classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawCandidate {
    pub name: String,
    pub title: String,
    /// 0-100 as declared by the provider
    pub confidence: u8,
    pub source: String,
    #[serde(default)]
    pub recent_appointment: bool,
    #[serde(default)]
    pub appointment_date: Option<NaiveDate>,
}

/// Executive candidates one research pass produced for a company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchFindings {
    #[serde(default)]
    pub cfo_candidates: Vec<RawCandidate>,
    #[serde(default)]
    pub cro_candidates: Vec<RawCandidate>,
}

impl ResearchFindings {
    pub fn is_empty(&self) -> bool {
        self.cfo_candidates.is_empty() && self.cro_candidates.is_empty()
    }
}

/// Corporate-structure facts for a company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorporateStructure {
    pub is_acquired: bool,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub parent_domain: Option<String>,
    #[serde(default)]
    pub parent_domain_aliases: Vec<String>,
    #[serde(default)]
    pub acquisition_date: Option<String>,
    #[serde(default)]
    pub acquisition_type: Option<String>,
    #[serde(default)]
    pub confidence: u8,
    #[serde(default)]
    pub operational_status: OperationalStatus,
}

/// Email/phone validation verdict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Validation {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

/// Research providers establish executive candidates and corporate
/// structure for a company.
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn research(&self, company_name: &str, website: &str) -> Result<ResearchFindings>;

    async fn corporate_structure(&self, company_name: &str, website: &str) -> Result<CorporateStructure>;
}

/// Contact providers resolve contact details for a named executive.
#[async_trait]
pub trait ContactProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(
        &self,
        executive_name: &str,
        company_name: &str,
        website: &str,
        role: Role,
    ) -> Result<Option<ContactPayload>>;

    /// Targeted second lookup, attempted only for fields still empty after
    /// the primary merge. Providers without a fallback surface return None.
    async fn fallback_lookup(
        &self,
        _executive_name: &str,
        _company_name: &str,
        _website: &str,
        _role: Role,
    ) -> Result<Option<ContactPayload>> {
        Ok(None)
    }
}

/// Validation providers verify deliverability of an email or phone.
#[async_trait]
pub trait ValidationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn validate_email(&self, email: &str) -> Result<Validation>;

    async fn validate_phone(&self, phone: &str) -> Result<Validation>;
}

/// The provider set one pipeline run operates with
pub struct Providers {
    pub research: Vec<Box<dyn ResearchProvider>>,
    pub contact: Vec<Box<dyn ContactProvider>>,
    pub validation: Option<Box<dyn ValidationProvider>>,
}

impl Providers {
    pub fn empty() -> Self {
        Self {
            research: Vec::new(),
            contact: Vec::new(),
            validation: None,
        }
    }
}

fn build_client(http: &HttpConfig, timeout_secs: u64) -> Result<reqwest::Client> {
    let timeout = if timeout_secs > 0 {
        timeout_secs
    } else {
        http.request_timeout_secs
    };
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .user_agent(http.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

fn api_key(endpoint: &ProviderEndpoint) -> Option<String> {
    if endpoint.api_key_env.is_empty() {
        return None;
    }
    std::env::var(&endpoint.api_key_env).ok()
}

/// HTTP research provider speaking the generic research JSON interface
pub struct HttpResearchProvider {
    name: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpResearchProvider {
    pub fn from_endpoint(endpoint: &ProviderEndpoint, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            api_key: api_key(endpoint),
            client: build_client(http, endpoint.timeout_secs)?,
        })
    }

    async fn post(&self, body: serde_json::Value) -> Result<serde_json::Value> {
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await
            .with_context(|| format!("Research provider '{}' request failed", self.name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Research provider '{}' returned status {}",
                self.name,
                response.status()
            ));
        }

        response.json().await
            .with_context(|| format!("Research provider '{}' returned malformed JSON", self.name))
    }
}

#[async_trait]
impl ResearchProvider for HttpResearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn research(&self, company_name: &str, website: &str) -> Result<ResearchFindings> {
        debug!("Researching executives for {} via {}", website, self.name);
        let body = serde_json::json!({
            "companyName": company_name,
            "website": website,
        });
        let value = self.post(body).await?;
        parse_research_findings(&value, &self.name)
    }

    async fn corporate_structure(&self, company_name: &str, website: &str) -> Result<CorporateStructure> {
        debug!("Researching corporate structure for {} via {}", website, self.name);
        let body = serde_json::json!({
            "companyName": company_name,
            "website": website,
            "mode": "corporate_structure",
        });
        let value = self.post(body).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Provider '{}' corporate structure response malformed", self.name))
    }
}

/// HTTP contact provider. The response shape is detected and parsed into
/// one of the tagged payload variants.
pub struct HttpContactProvider {
    name: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpContactProvider {
    pub fn from_endpoint(endpoint: &ProviderEndpoint, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            api_key: api_key(endpoint),
            client: build_client(http, endpoint.timeout_secs)?,
        })
    }

    async fn query(&self, body: serde_json::Value) -> Result<Option<ContactPayload>> {
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await
            .with_context(|| format!("Contact provider '{}' request failed", self.name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Contact provider '{}' returned status {}",
                self.name,
                response.status()
            ));
        }

        let value: serde_json::Value = response.json().await
            .with_context(|| format!("Contact provider '{}' returned malformed JSON", self.name))?;

        Ok(parse_contact_payload(&value, &self.name))
    }
}

#[async_trait]
impl ContactProvider for HttpContactProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(
        &self,
        executive_name: &str,
        company_name: &str,
        website: &str,
        role: Role,
    ) -> Result<Option<ContactPayload>> {
        debug!("Contact lookup for '{}' ({}) via {}", executive_name, role, self.name);
        self.query(serde_json::json!({
            "executiveName": executive_name,
            "companyName": company_name,
            "website": website,
            "role": role.as_str(),
        }))
        .await
    }

    async fn fallback_lookup(
        &self,
        executive_name: &str,
        company_name: &str,
        website: &str,
        role: Role,
    ) -> Result<Option<ContactPayload>> {
        debug!("Fallback contact lookup for '{}' via {}", executive_name, self.name);
        self.query(serde_json::json!({
            "executiveName": executive_name,
            "companyName": company_name,
            "website": website,
            "role": role.as_str(),
            "mode": "deep",
        }))
        .await
    }
}

/// HTTP email/phone validator
pub struct HttpValidationProvider {
    name: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpValidationProvider {
    pub fn from_endpoint(endpoint: &ProviderEndpoint, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            api_key: api_key(endpoint),
            client: build_client(http, endpoint.timeout_secs)?,
        })
    }

    async fn validate(&self, kind: &str, value: &str) -> Result<Validation> {
        let mut request = self.client.post(&self.url).json(&serde_json::json!({
            "type": kind,
            "value": value,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await
            .with_context(|| format!("Validation provider '{}' request failed", self.name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Validation provider '{}' returned status {}",
                self.name,
                response.status()
            ));
        }

        response.json().await
            .with_context(|| format!("Validation provider '{}' returned malformed JSON", self.name))
    }
}

#[async_trait]
impl ValidationProvider for HttpValidationProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_email(&self, email: &str) -> Result<Validation> {
        self.validate("email", email).await
    }

    async fn validate_phone(&self, phone: &str) -> Result<Validation> {
        self.validate("phone", phone).await
    }
}

/// Parse a research response into candidate lists. Accepts either the
/// candidate-list form ({"cfo_candidates": [...]}) or the single-candidate
/// form ({"cfo": {...}, "cro": {...}}).
pub fn parse_research_findings(value: &serde_json::Value, provider: &str) -> Result<ResearchFindings> {
    if value.get("cfo_candidates").is_some() || value.get("cro_candidates").is_some() {
        return serde_json::from_value(value.clone())
            .with_context(|| format!("Provider '{}' research response malformed", provider));
    }

    let mut findings = ResearchFindings::default();
    for (key, bucket) in [("cfo", &mut findings.cfo_candidates), ("cro", &mut findings.cro_candidates)] {
        if let Some(obj) = value.get(key) {
            if obj.is_object() {
                let mut candidate: RawCandidate = serde_json::from_value(obj.clone())
                    .with_context(|| format!("Provider '{}' {} candidate malformed", provider, key))?;
                if candidate.source.is_empty() {
                    candidate.source = provider.to_string();
                }
                bucket.push(candidate);
            }
        }
    }
    Ok(findings)
}

/// Detect and parse a contact response into its tagged payload shape.
/// One parser per shape; unknown shapes yield None ("no data").
pub fn parse_contact_payload(value: &serde_json::Value, provider: &str) -> Option<ContactPayload> {
    if let Some(payload) = parse_role_keyed(value, provider) {
        return Some(payload);
    }
    if let Some(payload) = parse_executive_array(value, provider) {
        return Some(payload);
    }
    parse_discovery_hits(value, provider)
}

/// Shape (a): {"cfo": {...}, "cro": {...}} or a bare contact object
fn parse_role_keyed(value: &serde_json::Value, provider: &str) -> Option<ContactPayload> {
    let obj = value.as_object()?;

    let mut contacts = RoleKeyedContacts::default();
    for (key, slot) in [("cfo", &mut contacts.cfo), ("cro", &mut contacts.cro)] {
        if let Some(fields_value) = obj.get(key) {
            if let Some(fields) = parse_contact_fields(fields_value, provider) {
                *slot = Some(fields);
            }
        }
    }

    if contacts.cfo.is_some() || contacts.cro.is_some() {
        return Some(ContactPayload::RoleKeyed(contacts));
    }

    // Bare single-contact object without a role key applies to the
    // requested role slot; the caller queried per role
    if obj.contains_key("email") || obj.contains_key("phone") || obj.contains_key("linkedinUrl") {
        let fields = parse_contact_fields(value, provider)?;
        if fields.is_empty() {
            return None;
        }
        return Some(ContactPayload::RoleKeyed(RoleKeyedContacts {
            cfo: Some(fields.clone()),
            cro: Some(fields),
        }));
    }

    None
}

/// Shape (b): {"executives": [{"name": ..., "role": ..., ...}]}
fn parse_executive_array(value: &serde_json::Value, provider: &str) -> Option<ContactPayload> {
    let arr = value.get("executives")?.as_array()?;

    let mut executives = Vec::new();
    for item in arr {
        // Malformed entries are skipped, not fatal to the whole payload
        let Some(name) = item.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let role_tag = item
            .get("role")
            .or_else(|| item.get("title"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let Some(mut fields) = parse_contact_fields(item, provider) else {
            continue;
        };
        if fields.source.is_empty() {
            fields.source = provider.to_string();
        }
        executives.push(ExecutiveContact {
            name: name.to_string(),
            role_tag,
            fields,
        });
    }

    if executives.is_empty() {
        None
    } else {
        Some(ContactPayload::ExecutiveArray { executives })
    }
}

/// Shape (c): {"hits": [{"email": ..., "context": "..."}]}
fn parse_discovery_hits(value: &serde_json::Value, provider: &str) -> Option<ContactPayload> {
    let arr = value.get("hits")?.as_array()?;

    let mut hits = Vec::new();
    for item in arr {
        let context = item.get("context").and_then(|v| v.as_str()).unwrap_or_default();
        let email = item.get("email").and_then(|v| v.as_str()).map(String::from);
        let phone = item.get("phone").and_then(|v| v.as_str()).map(String::from);
        if email.is_none() && phone.is_none() {
            continue;
        }
        hits.push(DiscoveryHit {
            email,
            phone,
            context: context.to_string(),
            source: provider.to_string(),
        });
    }

    if hits.is_empty() {
        None
    } else {
        Some(ContactPayload::DiscoveryHits { hits })
    }
}

fn parse_contact_fields(value: &serde_json::Value, provider: &str) -> Option<ContactFields> {
    let obj = value.as_object()?;
    Some(ContactFields {
        email: obj.get("email").and_then(|v| v.as_str()).map(String::from),
        phone: obj.get("phone").and_then(|v| v.as_str()).map(String::from),
        linkedin_url: obj
            .get("linkedinUrl")
            .or_else(|| obj.get("linkedin_url"))
            .and_then(|v| v.as_str())
            .map(String::from),
        country: obj.get("country").and_then(|v| v.as_str()).map(String::from),
        confidence: obj.get("confidence").and_then(|v| v.as_u64()).unwrap_or(0).min(100) as u8,
        generated: obj.get("generated").and_then(|v| v.as_bool()).unwrap_or(false),
        source: obj
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or(provider)
            .to_string(),
    })
}

/// Build the provider set from configuration
pub fn build_providers(config: &crate::config::AppConfig) -> Result<Providers> {
    let mut providers = Providers::empty();

    for endpoint in &config.providers.research {
        providers
            .research
            .push(Box::new(HttpResearchProvider::from_endpoint(endpoint, &config.http)?));
    }
    for endpoint in &config.providers.contact {
        providers
            .contact
            .push(Box::new(HttpContactProvider::from_endpoint(endpoint, &config.http)?));
    }
    if let Some(endpoint) = &config.providers.validation {
        providers.validation =
            Some(Box::new(HttpValidationProvider::from_endpoint(endpoint, &config.http)?));
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_research_single_candidate_form() {
        let value = serde_json::json!({
            "cfo": {"name": "Jane Doe", "title": "CFO", "confidence": 95, "source": "web"},
            "cro": {"name": "John Roe", "title": "CRO", "confidence": 90, "source": ""}
        });

        let findings = parse_research_findings(&value, "perplexity").unwrap();
        assert_eq!(findings.cfo_candidates.len(), 1);
        assert_eq!(findings.cfo_candidates[0].name, "Jane Doe");
        assert_eq!(findings.cfo_candidates[0].source, "web");
        // Empty source falls back to the provider name
        assert_eq!(findings.cro_candidates[0].source, "perplexity");
    }

    #[test]
    fn test_parse_research_candidate_list_form() {
        let value = serde_json::json!({
            "cfo_candidates": [
                {"name": "A", "title": "CFO", "confidence": 95, "source": "s"},
                {"name": "B", "title": "Controller", "confidence": 80, "source": "s"}
            ],
            "cro_candidates": []
        });

        let findings = parse_research_findings(&value, "perplexity").unwrap();
        assert_eq!(findings.cfo_candidates.len(), 2);
        assert!(findings.cro_candidates.is_empty());
    }

    #[test]
    fn test_parse_research_missing_roles() {
        let findings = parse_research_findings(&serde_json::json!({}), "perplexity").unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_parse_role_keyed_payload() {
        let value = serde_json::json!({
            "cfo": {"email": "jane@acme.com", "confidence": 85}
        });

        let payload = parse_contact_payload(&value, "directory").unwrap();
        match payload {
            ContactPayload::RoleKeyed(contacts) => {
                assert_eq!(contacts.cfo.unwrap().email, Some("jane@acme.com".to_string()));
                assert!(contacts.cro.is_none());
            }
            other => panic!("expected RoleKeyed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_contact_object() {
        let value = serde_json::json!({
            "email": "jane@acme.com",
            "linkedinUrl": "https://linkedin.com/in/janedoe"
        });

        let payload = parse_contact_payload(&value, "directory").unwrap();
        match payload {
            ContactPayload::RoleKeyed(contacts) => {
                let fields = contacts.cfo.unwrap();
                assert_eq!(fields.email, Some("jane@acme.com".to_string()));
                assert_eq!(fields.linkedin_url, Some("https://linkedin.com/in/janedoe".to_string()));
            }
            other => panic!("expected RoleKeyed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_executive_array_payload() {
        let value = serde_json::json!({
            "executives": [
                {"name": "Jane Doe", "role": "CFO", "email": "jane@acme.com"},
                {"name": "John Roe", "role": "CRO", "phone": "+1 555 0100"}
            ]
        });

        let payload = parse_contact_payload(&value, "directory").unwrap();
        match payload {
            ContactPayload::ExecutiveArray { executives } => {
                assert_eq!(executives.len(), 2);
                assert_eq!(executives[0].role_tag, "CFO");
                assert_eq!(executives[1].fields.phone, Some("+1 555 0100".to_string()));
            }
            other => panic!("expected ExecutiveArray, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_executive_array_skips_nameless_entries() {
        let value = serde_json::json!({
            "executives": [
                {"role": "CFO", "email": "anon@acme.com"},
                {"name": "Jane Doe", "role": "CFO", "email": "jane@acme.com"}
            ]
        });

        let payload = parse_contact_payload(&value, "directory").unwrap();
        match payload {
            ContactPayload::ExecutiveArray { executives } => {
                // The valid entry survives a malformed sibling
                assert_eq!(executives.len(), 1);
                assert_eq!(executives[0].name, "Jane Doe");
            }
            other => panic!("expected ExecutiveArray, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_discovery_hits_payload() {
        let value = serde_json::json!({
            "hits": [
                {"email": "jane@acme.com", "context": "Jane Doe, CFO"},
                {"context": "no contact info here"}
            ]
        });

        let payload = parse_contact_payload(&value, "webdiscovery").unwrap();
        match payload {
            ContactPayload::DiscoveryHits { hits } => {
                // The hit without email or phone is dropped
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].source, "webdiscovery");
            }
            other => panic!("expected DiscoveryHits, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_shape_yields_none() {
        let value = serde_json::json!({"unrelated": true});
        assert!(parse_contact_payload(&value, "directory").is_none());
    }
}
