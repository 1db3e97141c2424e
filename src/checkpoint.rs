// checkpoint.rs - Resume support for interrupted batch runs
//
// Long batch runs get interrupted: per-company timeouts pile up, a laptop
// sleeps, a provider quota runs dry. The scheduler persists a checkpoint
// after every N completed companies; on restart with --resume, already
// completed companies are skipped and their results carried forward.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::company::PipelineResult;

/// Checkpoint file name - hidden file to avoid cluttering output directory
pub const CHECKPOINT_FILENAME: &str = ".execfinder-checkpoint.json";

/// Current checkpoint format version - bump when making breaking changes
pub const CHECKPOINT_VERSION: u32 = 1;

/// Batch run checkpoint containing all state needed to resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version for compatibility checking
    pub version: u32,

    /// UTC timestamp when checkpoint was last written
    pub created_at: DateTime<Utc>,

    /// Input file the run was started from
    pub input_file: String,

    /// Domains that have been fully processed
    pub completed_domains: HashSet<String>,

    /// Results for completed companies, carried into the resumed run
    pub results: Vec<PipelineResult>,

    /// Run settings hash to verify same settings on resume
    pub settings_hash: String,
}

impl Checkpoint {
    pub fn new(input_file: String, settings_hash: String) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            created_at: Utc::now(),
            input_file,
            completed_domains: HashSet::new(),
            results: Vec::new(),
            settings_hash,
        }
    }

    /// Get the checkpoint file path for a given output directory
    pub fn get_checkpoint_path(output_dir: &Path) -> PathBuf {
        output_dir.join(CHECKPOINT_FILENAME)
    }

    pub fn exists(output_dir: &Path) -> bool {
        Self::get_checkpoint_path(output_dir).exists()
    }

    /// Load a checkpoint from the given output directory.
    /// Returns an error if the checkpoint version is incompatible.
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = Self::get_checkpoint_path(output_dir);
        let content = std::fs::read_to_string(&path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            anyhow::bail!(
                "Incompatible checkpoint version: file has version {} but current version is {}. \
                 Delete the checkpoint file to start fresh.",
                checkpoint.version,
                CHECKPOINT_VERSION
            );
        }
        Ok(checkpoint)
    }

    /// Save the checkpoint using atomic write (write to temp file, then
    /// rename to prevent corruption on interrupt)
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let path = Self::get_checkpoint_path(output_dir);
        let temp_path = output_dir.join(".execfinder-checkpoint.tmp");
        let content = serde_json::to_string_pretty(self)?;

        {
            let mut file = std::fs::File::create(&temp_path)?;
            std::io::Write::write_all(&mut file, content.as_bytes())?;
            file.sync_all()?;
        }

        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Delete the checkpoint file (called on successful completion)
    pub fn delete(output_dir: &Path) -> Result<()> {
        let path = Self::get_checkpoint_path(output_dir);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Check if this checkpoint is compatible with the given run
    pub fn is_compatible(&self, input_file: &str, settings_hash: &str) -> bool {
        self.input_file == input_file && self.settings_hash == settings_hash
    }

    /// Record a completed company and its result
    pub fn record_result(&mut self, result: PipelineResult) {
        self.completed_domains.insert(result.company.domain.clone());
        self.results.push(result);
        self.created_at = Utc::now();
    }

    pub fn is_completed(&self, domain: &str) -> bool {
        self.completed_domains.contains(domain)
    }

    pub fn summary(&self) -> String {
        format!(
            "Checkpoint for '{}' - {} companies completed, last written {}",
            self.input_file,
            self.completed_domains.len(),
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// Generate a settings hash for checkpoint compatibility checking.
/// Resuming with different pipeline settings would mix results produced
/// under different rules, so that combination is rejected.
pub fn generate_settings_hash(
    batch_size: usize,
    confidence_gate: u8,
    parent_replacement_margin: u8,
    classifier_score_floor: i32,
) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    batch_size.hash(&mut hasher);
    confidence_gate.hash(&mut hasher);
    parent_replacement_margin.hash(&mut hasher);
    classifier_score_floor.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::CompanyInput;
    use tempfile::TempDir;

    fn result_for(domain: &str) -> PipelineResult {
        let input = CompanyInput::new(domain);
        PipelineResult::from_error(&input, "test".to_string(), 0)
    }

    #[test]
    fn test_checkpoint_creation() {
        let checkpoint = Checkpoint::new("companies.csv".to_string(), "abc123".to_string());
        assert_eq!(checkpoint.version, CHECKPOINT_VERSION);
        assert_eq!(checkpoint.input_file, "companies.csv");
        assert!(checkpoint.completed_domains.is_empty());
        assert!(checkpoint.results.is_empty());
    }

    #[test]
    fn test_checkpoint_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path();

        let mut checkpoint = Checkpoint::new("companies.csv".to_string(), "abc123".to_string());
        checkpoint.record_result(result_for("acme.com"));
        checkpoint.record_result(result_for("globex.com"));

        checkpoint.save(output_dir).unwrap();
        assert!(Checkpoint::exists(output_dir));

        let loaded = Checkpoint::load(output_dir).unwrap();
        assert_eq!(loaded.version, CHECKPOINT_VERSION);
        assert_eq!(loaded.input_file, "companies.csv");
        assert!(loaded.is_completed("acme.com"));
        assert!(loaded.is_completed("globex.com"));
        assert!(!loaded.is_completed("other.com"));
        assert_eq!(loaded.results.len(), 2);
    }

    #[test]
    fn test_checkpoint_delete() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path();

        let checkpoint = Checkpoint::new("companies.csv".to_string(), "abc123".to_string());
        checkpoint.save(output_dir).unwrap();
        assert!(Checkpoint::exists(output_dir));

        Checkpoint::delete(output_dir).unwrap();
        assert!(!Checkpoint::exists(output_dir));
    }

    #[test]
    fn test_checkpoint_compatibility() {
        let checkpoint = Checkpoint::new("companies.csv".to_string(), "abc123".to_string());

        assert!(checkpoint.is_compatible("companies.csv", "abc123"));
        assert!(!checkpoint.is_compatible("other.csv", "abc123"));
        assert!(!checkpoint.is_compatible("companies.csv", "xyz789"));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path();

        let mut checkpoint = Checkpoint::new("companies.csv".to_string(), "abc123".to_string());
        checkpoint.version = CHECKPOINT_VERSION + 1;
        checkpoint.save(output_dir).unwrap();

        assert!(Checkpoint::load(output_dir).is_err());
    }

    #[test]
    fn test_settings_hash() {
        let hash1 = generate_settings_hash(25, 90, 20, 50);
        let hash2 = generate_settings_hash(25, 90, 20, 50);
        let hash3 = generate_settings_hash(25, 85, 20, 50);

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }
}
