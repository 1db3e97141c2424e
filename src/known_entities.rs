//! Known entity database for curated per-company overrides
//!
//! Automated research gets specific companies wrong in stable, predictable
//! ways (a former executive resurfacing from parent research, an acquisition
//! misread as full absorption). This module loads a curated JSON database of
//! per-domain corrections:
//! - a targeting override that pins the strategy for a domain
//! - last-resort executive entries used only when research found nothing
//!
//! The database is shipped alongside the config file and loaded once per
//! process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::targeting::TargetingStrategy;

/// Path to the known entities database relative to working directory
pub const KNOWN_ENTITIES_PATH: &str = "./config/known_entities.json";

/// Find the config directory by checking multiple locations
fn find_config_dir() -> Option<PathBuf> {
    let cwd_config = PathBuf::from("./config");
    if cwd_config.is_dir() {
        return Some(cwd_config);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let exe_config = exe_dir.join("config");
            if exe_config.is_dir() {
                return Some(exe_config);
            }
            // target/release/ layout puts the project root two levels up
            if let Some(parent) = exe_dir.parent() {
                if let Some(grandparent) = parent.parent() {
                    let root_config = grandparent.join("config");
                    if root_config.is_dir() {
                        return Some(root_config);
                    }
                }
            }
        }
    }

    if let Ok(env_config) = std::env::var("EXECFINDER_CONFIG_DIR") {
        let env_path = PathBuf::from(&env_config);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    None
}

fn known_entities_path() -> PathBuf {
    match find_config_dir() {
        Some(dir) => dir.join("known_entities.json"),
        None => PathBuf::from(KNOWN_ENTITIES_PATH),
    }
}

/// A last-resort executive entry. Used only when every research pass for
/// that role came back empty; never overrides a researched candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnownExecutive {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Where the curation came from (e.g. "press_release", "user_confirmed")
    #[serde(default)]
    pub source: String,
}

/// Curated corrections for a single domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnownEntityOverride {
    #[serde(default)]
    pub organization: Option<String>,
    /// Pins the targeting strategy, bypassing acquisition research entirely
    #[serde(default)]
    pub targeting: Option<TargetingStrategy>,
    #[serde(default)]
    pub cfo: Option<KnownExecutive>,
    #[serde(default)]
    pub cro: Option<KnownExecutive>,
    #[serde(default)]
    pub notes: String,
}

/// Known entities database structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownEntitiesDatabase {
    pub version: String,
    pub updated: String,
    #[serde(default)]
    pub description: String,
    /// Map of domain -> override
    pub entities: HashMap<String, KnownEntityOverride>,
}

impl Default for KnownEntitiesDatabase {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            updated: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            description: "Curated per-company overrides".to_string(),
            entities: HashMap::new(),
        }
    }
}

impl KnownEntitiesDatabase {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read known entities database at {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse known entities database at {:?}", path))
    }

    /// Look up an override by normalized domain
    pub fn lookup(&self, domain: &str) -> Option<&KnownEntityOverride> {
        self.entities.get(&domain.to_lowercase())
    }
}

static DATABASE: OnceLock<KnownEntitiesDatabase> = OnceLock::new();

/// Load the database once per process. A missing file is not an error;
/// it means no overrides are in effect.
pub fn database() -> &'static KnownEntitiesDatabase {
    DATABASE.get_or_init(|| {
        let path = known_entities_path();
        if !path.exists() {
            debug!("No known entities database at {:?}", path);
            return KnownEntitiesDatabase::default();
        }
        match KnownEntitiesDatabase::load_from_path(&path) {
            Ok(db) => {
                debug!(
                    "Loaded known entities database v{} with {} entries",
                    db.version,
                    db.entities.len()
                );
                db
            }
            Err(e) => {
                warn!("Ignoring unreadable known entities database: {:#}", e);
                KnownEntitiesDatabase::default()
            }
        }
    })
}

/// Convenience lookup against the process-wide database
pub fn lookup(domain: &str) -> Option<&'static KnownEntityOverride> {
    database().lookup(domain)
}
