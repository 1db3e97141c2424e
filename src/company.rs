//! Company input records, resolved company state, and pipeline results.
//!
//! Input supports:
//! - CSV files with a "Website" column (and optional "Company Name" /
//!   "Account Owner" columns), case-insensitive headers
//! - JSON files with an array of input records or an object with a
//!   "companies" array
//! - Error resilience: rows with invalid websites are skipped

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::candidate::ExecutiveCandidate;
use crate::domain_utils::{is_valid_domain, normalize_website};

/// One company row from an input file or a batch job payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyInput {
    pub website: String,
    #[serde(default, rename = "companyName")]
    pub company_name: Option<String>,
    #[serde(default, rename = "accountOwner")]
    pub account_owner: Option<String>,
    #[serde(default, rename = "isTop1000")]
    pub is_top_1000: bool,
}

impl CompanyInput {
    pub fn new(website: impl Into<String>) -> Self {
        Self {
            website: website.into(),
            company_name: None,
            account_owner: None,
            is_top_1000: false,
        }
    }

    /// Normalized domain used as the company identifier
    pub fn domain(&self) -> String {
        normalize_website(&self.website)
    }

    /// Display name, derived from the domain when the input omits one
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.company_name {
            if !name.trim().is_empty() {
                return name.trim().to_string();
            }
        }
        let domain = self.domain();
        let stem = domain.split('.').next().unwrap_or(&domain);
        let mut chars = stem.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => stem.to_string(),
        }
    }
}

/// Operational status of an acquired entity, assessed by the research
/// provider as part of corporate-structure facts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    FullyAbsorbed,
    OperatingIndependently,
    Transitional,
    #[default]
    Unknown,
}

/// Parent-company stub carried on an acquired company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParentCompany {
    pub name: String,
    pub domain: String,
    /// Known alternate email domains for the parent
    #[serde(default)]
    pub domain_aliases: Vec<String>,
}

/// Acquisition metadata resolved from corporate-structure research
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AcquisitionInfo {
    pub is_acquired: bool,
    pub acquisition_date: Option<String>,
    pub acquisition_type: Option<String>,
    /// 0-100 confidence in the acquisition assessment
    pub confidence: u8,
    #[serde(default)]
    pub operational_status: OperationalStatus,
}

/// A company as it moves through the pipeline. Created once per input row,
/// mutated as resolution proceeds, immutable after the processor returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    /// Normalized domain, the company identifier
    pub domain: String,
    pub name: String,
    pub account_owner: Option<String>,
    pub is_public: bool,
    pub industry: Option<String>,
    pub parent: Option<ParentCompany>,
    pub acquisition: Option<AcquisitionInfo>,
}

impl Company {
    pub fn from_input(input: &CompanyInput) -> Self {
        Self {
            domain: input.domain(),
            name: input.display_name(),
            account_owner: input.account_owner.clone(),
            is_public: false,
            industry: None,
            parent: None,
            acquisition: None,
        }
    }

    /// The set of email domains accepted for this company's executives.
    /// Includes the parent's domain and aliases only when a targeting
    /// decision selected the parent.
    pub fn allowed_domains(&self, parent_targeted: bool) -> Vec<String> {
        let mut allowed = vec![self.domain.clone()];
        if parent_targeted {
            if let Some(parent) = &self.parent {
                if !parent.domain.is_empty() {
                    allowed.push(parent.domain.clone());
                }
                allowed.extend(parent.domain_aliases.iter().cloned());
            }
        }
        allowed
    }
}

/// One company's final output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub company: Company,
    pub cfo: ExecutiveCandidate,
    pub cro: ExecutiveCandidate,
    /// Mean of the two role confidences
    pub overall_confidence: u8,
    /// Ordered human-readable findings from invariant checks
    pub validation_notes: Vec<String>,
    pub processing_time_ms: u64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineResult {
    /// Result for a company whose processing failed; the batch continues
    pub fn from_error(input: &CompanyInput, message: String, elapsed_ms: u64) -> Self {
        Self {
            company: Company::from_input(input),
            cfo: ExecutiveCandidate::empty(),
            cro: ExecutiveCandidate::empty(),
            overall_confidence: 0,
            validation_notes: Vec::new(),
            processing_time_ms: elapsed_ms,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// Canonical flattened row shape for export. Stable across implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub website: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "accountOwner")]
    pub account_owner: String,
    #[serde(rename = "cfoName")]
    pub cfo_name: String,
    #[serde(rename = "cfoTitle")]
    pub cfo_title: String,
    #[serde(rename = "cfoEmail")]
    pub cfo_email: String,
    #[serde(rename = "cfoPhone")]
    pub cfo_phone: String,
    #[serde(rename = "cfoLinkedIn")]
    pub cfo_linkedin: String,
    #[serde(rename = "cfoTimeInRole")]
    pub cfo_time_in_role: String,
    #[serde(rename = "cfoCountry")]
    pub cfo_country: String,
    #[serde(rename = "cfoSelectionReason")]
    pub cfo_selection_reason: String,
    #[serde(rename = "croName")]
    pub cro_name: String,
    #[serde(rename = "croTitle")]
    pub cro_title: String,
    #[serde(rename = "croEmail")]
    pub cro_email: String,
    #[serde(rename = "croPhone")]
    pub cro_phone: String,
    #[serde(rename = "croLinkedIn")]
    pub cro_linkedin: String,
    #[serde(rename = "croTimeInRole")]
    pub cro_time_in_role: String,
    #[serde(rename = "croCountry")]
    pub cro_country: String,
    #[serde(rename = "croSelectionReason")]
    pub cro_selection_reason: String,
    #[serde(rename = "overallConfidence")]
    pub overall_confidence: u8,
    pub timestamp: String,
}

impl ExportRow {
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            website: result.company.domain.clone(),
            company_name: result.company.name.clone(),
            account_owner: result.company.account_owner.clone().unwrap_or_default(),
            cfo_name: result.cfo.name.clone(),
            cfo_title: result.cfo.title.clone(),
            cfo_email: result.cfo.contact.email.clone(),
            cfo_phone: result.cfo.contact.phone.clone(),
            cfo_linkedin: result.cfo.contact.linkedin_url.clone(),
            cfo_time_in_role: result.cfo.contact.time_in_role.clone(),
            cfo_country: result.cfo.contact.country.clone(),
            cfo_selection_reason: result.cfo.selection_reason.clone(),
            cro_name: result.cro.name.clone(),
            cro_title: result.cro.title.clone(),
            cro_email: result.cro.contact.email.clone(),
            cro_phone: result.cro.contact.phone.clone(),
            cro_linkedin: result.cro.contact.linkedin_url.clone(),
            cro_time_in_role: result.cro.contact.time_in_role.clone(),
            cro_country: result.cro.contact.country.clone(),
            cro_selection_reason: result.cro.selection_reason.clone(),
            overall_confidence: result.overall_confidence,
            timestamp: result.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Input format for company files
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a company list from a file (auto-detects format from extension)
pub fn parse_company_file(path: &Path) -> Result<Vec<CompanyInput>> {
    let format = InputFormat::from_path(path)
        .context(format!("Cannot determine input format from file extension. Expected .csv or .json: {}", path.display()))?;

    let content = fs::read_to_string(path)
        .context(format!("Failed to read input file: {}", path.display()))?;

    match format {
        InputFormat::Csv => parse_csv_companies(&content),
        InputFormat::Json => parse_json_companies(&content),
    }
}

/// Parse companies from CSV content. Requires a header row containing a
/// "website" column (case-insensitive); "company name" and "account owner"
/// columns are optional.
pub fn parse_csv_companies(content: &str) -> Result<Vec<CompanyInput>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()
        .context("Failed to read CSV headers")?
        .clone();

    let website_idx = headers.iter()
        .position(|h| h.trim().eq_ignore_ascii_case("website"))
        .context("CSV must have a 'Website' column")?;
    let name_idx = headers.iter()
        .position(|h| h.trim().eq_ignore_ascii_case("company name") || h.trim().eq_ignore_ascii_case("companyname"));
    let owner_idx = headers.iter()
        .position(|h| h.trim().eq_ignore_ascii_case("account owner") || h.trim().eq_ignore_ascii_case("accountowner"));

    let mut companies = Vec::new();

    for record in reader.records() {
        let record = record.context("Failed to parse CSV record")?;

        let website = record.get(website_idx)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let Some(website) = website else { continue };

        if !is_valid_domain(&normalize_website(&website)) {
            continue;
        }

        let company_name = name_idx
            .and_then(|idx| record.get(idx))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let account_owner = owner_idx
            .and_then(|idx| record.get(idx))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        companies.push(CompanyInput {
            website,
            company_name,
            account_owner,
            is_top_1000: false,
        });
    }

    Ok(companies)
}

/// Parse companies from JSON content.
///
/// Supports:
/// 1. Array of record objects: [{"website": "acme.com", ...}]
/// 2. Object with "companies" array: {"companies": [...]}
pub fn parse_json_companies(content: &str) -> Result<Vec<CompanyInput>> {
    let value: serde_json::Value = serde_json::from_str(content)
        .context("Failed to parse JSON content")?;

    let arr = match &value {
        serde_json::Value::Array(arr) => arr.clone(),
        serde_json::Value::Object(obj) => {
            match obj.get("companies") {
                Some(serde_json::Value::Array(arr)) => arr.clone(),
                Some(_) => bail!("'companies' field must be an array"),
                None => bail!("JSON object must have a 'companies' array field"),
            }
        }
        _ => bail!("JSON must be an array of company records or an object with a 'companies' field"),
    };

    let mut companies = Vec::new();
    for item in arr {
        let input: CompanyInput = match serde_json::from_value(item) {
            Ok(input) => input,
            Err(_) => continue,
        };
        if is_valid_domain(&input.domain()) {
            companies.push(input);
        }
    }

    Ok(companies)
}
