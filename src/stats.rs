//! Run-level statistics, accumulated by the scheduler and printed at the
//! end of a batch run.

use serde::{Deserialize, Serialize};

use crate::company::PipelineResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_companies: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cfo_found: usize,
    pub cro_found: usize,
    pub cfo_emails: usize,
    pub cro_emails: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub elapsed_ms: u64,
}

impl RunStats {
    pub fn record(&mut self, result: &PipelineResult) {
        self.total_companies += 1;
        if result.error.is_some() {
            self.failed += 1;
            return;
        }
        self.succeeded += 1;
        if !result.cfo.is_empty() {
            self.cfo_found += 1;
            if !result.cfo.contact.email.is_empty() {
                self.cfo_emails += 1;
            }
        }
        if !result.cro.is_empty() {
            self.cro_found += 1;
            if !result.cro.contact.email.is_empty() {
                self.cro_emails += 1;
            }
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64 * 100.0
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Run summary")?;
        writeln!(f, "  Companies processed: {}", self.total_companies)?;
        writeln!(f, "  Succeeded:           {}", self.succeeded)?;
        writeln!(f, "  Failed:              {}", self.failed)?;
        writeln!(
            f,
            "  CFOs identified:     {} ({} with email)",
            self.cfo_found, self.cfo_emails
        )?;
        writeln!(
            f,
            "  CROs identified:     {} ({} with email)",
            self.cro_found, self.cro_emails
        )?;
        writeln!(
            f,
            "  Cache:               {} hits / {} misses ({:.1}% hit rate)",
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_rate()
        )?;
        write!(f, "  Elapsed:             {:.1}s", self.elapsed_ms as f64 / 1000.0)
    }
}
