//! Contact merge engine: reconciles heterogeneous contact payloads from
//! multiple providers into one canonical contact record per role.
//!
//! Providers return three shapes, tried in order:
//! (a) a single contact object keyed by role
//! (b) an array of executive objects matched by role tag or fuzzy name
//!     containment
//! (c) free-text discovery hits attributed by substring matching against
//!     the executive's name or role keywords
//!
//! Within a shape, sources are preferred non-generated over generated, then
//! by declared confidence, then first-seen. Existing non-empty fields are
//! never overwritten: the first successful write per field wins.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidate::{ContactRecord, Role};

/// Contact fields as one provider source reported them
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactFields {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub country: Option<String>,
    /// Declared confidence, 0-100
    #[serde(default)]
    pub confidence: u8,
    /// Machine-generated values (pattern-guessed emails etc.) lose to
    /// observed ones
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub source: String,
}

impl ContactFields {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.linkedin_url.is_none()
    }
}

/// Shape (a): one contact object per role
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoleKeyedContacts {
    pub cfo: Option<ContactFields>,
    pub cro: Option<ContactFields>,
}

/// Shape (b): an executive entry carrying a role tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveContact {
    pub name: String,
    /// Free-text role tag ("CFO", "Chief Revenue Officer", ...)
    pub role_tag: String,
    #[serde(flatten)]
    pub fields: ContactFields,
}

/// Shape (c): a loosely structured discovery hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryHit {
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Context string the hit was found in; used for attribution
    pub context: String,
    #[serde(default)]
    pub source: String,
}

/// One provider payload, parsed into its tagged shape. Adding a provider
/// response shape means adding one parser, not editing merge logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ContactPayload {
    RoleKeyed(RoleKeyedContacts),
    ExecutiveArray { executives: Vec<ExecutiveContact> },
    DiscoveryHits { hits: Vec<DiscoveryHit> },
}

/// Merge provider payloads (already in provider-priority order) into one
/// contact record for the given executive.
pub fn merge(
    executive_name: &str,
    role: Role,
    payloads: &[ContactPayload],
) -> ContactRecord {
    let mut record = ContactRecord::default();

    // Shape (a) first
    let mut role_keyed: Vec<&ContactFields> = Vec::new();
    for payload in payloads {
        if let ContactPayload::RoleKeyed(contacts) = payload {
            let slot = match role {
                Role::Cfo => contacts.cfo.as_ref(),
                Role::Cro => contacts.cro.as_ref(),
            };
            if let Some(fields) = slot {
                role_keyed.push(fields);
            }
        }
    }
    apply_fields(&mut record, &prioritize(role_keyed));

    // Shape (b): match by role tag or fuzzy name containment
    let mut matched: Vec<&ContactFields> = Vec::new();
    for payload in payloads {
        if let ContactPayload::ExecutiveArray { executives } = payload {
            for exec in executives {
                if matches_executive(exec, executive_name, role) {
                    matched.push(&exec.fields);
                }
            }
        }
    }
    apply_fields(&mut record, &prioritize(matched));

    // Shape (c): attribute hits by substring match on name or role keywords
    for payload in payloads {
        if let ContactPayload::DiscoveryHits { hits } = payload {
            for hit in hits {
                if !hit_attributable(hit, executive_name, role) {
                    continue;
                }
                if record.email.is_empty() {
                    if let Some(email) = &hit.email {
                        if !email.is_empty() {
                            debug!("discovery hit supplied email for '{}'", executive_name);
                            record.email = email.clone();
                            note_source(&mut record, &hit.source);
                        }
                    }
                }
                if record.phone.is_empty() {
                    if let Some(phone) = &hit.phone {
                        if !phone.is_empty() {
                            record.phone = phone.clone();
                            note_source(&mut record, &hit.source);
                        }
                    }
                }
            }
        }
    }

    record
}

/// Order sources within one shape: non-generated first, then higher
/// declared confidence, then first-seen (stable sort keeps arrival order).
fn prioritize<'a>(mut sources: Vec<&'a ContactFields>) -> Vec<&'a ContactFields> {
    sources.sort_by_key(|f| (f.generated, std::cmp::Reverse(f.confidence)));
    sources
}

/// First successful write per field wins; later sources never overwrite.
fn apply_fields(record: &mut ContactRecord, sources: &[&ContactFields]) {
    for fields in sources {
        if record.email.is_empty() {
            if let Some(email) = &fields.email {
                if !email.is_empty() {
                    record.email = email.clone();
                    note_source(record, &fields.source);
                }
            }
        }
        if record.phone.is_empty() {
            if let Some(phone) = &fields.phone {
                if !phone.is_empty() {
                    record.phone = phone.clone();
                    note_source(record, &fields.source);
                }
            }
        }
        if record.linkedin_url.is_empty() {
            if let Some(url) = &fields.linkedin_url {
                if !url.is_empty() {
                    record.linkedin_url = url.clone();
                    note_source(record, &fields.source);
                }
            }
        }
        if record.country.is_empty() {
            if let Some(country) = &fields.country {
                if !country.is_empty() {
                    record.country = country.clone();
                }
            }
        }
    }
}

fn note_source(record: &mut ContactRecord, source: &str) {
    if record.source.is_empty() && !source.is_empty() {
        record.source = source.to_string();
    }
}

/// Match an executive-array entry by role tag, or by fuzzy name
/// containment in either direction.
fn matches_executive(exec: &ExecutiveContact, executive_name: &str, role: Role) -> bool {
    let tag = exec.role_tag.to_lowercase();
    if tag.contains(role.as_str())
        || role.exact_titles().iter().any(|t| tag.contains(t))
    {
        return true;
    }

    let exec_name = exec.name.to_lowercase();
    let target = executive_name.to_lowercase();
    if target.is_empty() || exec_name.is_empty() {
        return false;
    }
    exec_name.contains(&target) || target.contains(&exec_name)
}

/// A discovery hit is attributable when its context mentions the
/// executive's name or the role's vocabulary.
fn hit_attributable(hit: &DiscoveryHit, executive_name: &str, role: Role) -> bool {
    let context = hit.context.to_lowercase();
    let name = executive_name.to_lowercase();

    if !name.is_empty() && context.contains(&name) {
        return true;
    }
    // Surname alone is enough for attribution
    if let Some(surname) = name.rsplit(' ').next() {
        if surname.len() > 2 && context.contains(surname) {
            return true;
        }
    }
    role.required_vocabulary().iter().any(|kw| context.contains(kw))
}

/// Derive a tenure string from an appointment date. Computed
/// deterministically from structured data; fabricated values are
/// disallowed, so a missing date leaves tenure empty.
pub fn derive_time_in_role(appointment_date: Option<NaiveDate>) -> String {
    let Some(appointed) = appointment_date else {
        return String::new();
    };

    let today = Utc::now().date_naive();
    if appointed > today {
        return String::new();
    }

    use chrono::Datelike;
    let mut months = (today.year() as i64 - appointed.year() as i64) * 12
        + (today.month() as i64 - appointed.month() as i64);
    if today.day() < appointed.day() {
        months -= 1;
    }
    if months < 0 {
        return String::new();
    }

    let years = months / 12;
    let months = months % 12;

    match (years, months) {
        (0, 0) => "less than a month".to_string(),
        (0, m) => format!("{} month{}", m, if m == 1 { "" } else { "s" }),
        (y, 0) => format!("{} year{}", y, if y == 1 { "" } else { "s" }),
        (y, m) => format!(
            "{} year{} {} month{}",
            y,
            if y == 1 { "" } else { "s" },
            m,
            if m == 1 { "" } else { "s" }
        ),
    }
}
