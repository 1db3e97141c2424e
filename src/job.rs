//! Embeddable batch job surface.
//!
//! Callers (service wrappers, schedulers) submit a company list and get
//! back results plus a run summary. Errors carry a uniform
//! {error, message} shape and an HTTP-style status code so a thin
//! transport layer can pass them through unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::checkpoint::{generate_settings_hash, Checkpoint};
use crate::company::{CompanyInput, PipelineResult};
use crate::config::SchedulerConfig;
use crate::processor::CompanyProcessor;
use crate::scheduler::BatchScheduler;
use crate::stats::RunStats;

/// A submitted batch job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobRequest {
    pub companies: Vec<CompanyInput>,
}

/// Completed batch job payload
#[derive(Debug, Serialize)]
pub struct BatchJobResponse {
    pub results: Vec<PipelineResult>,
    pub summary: JobSummary,
}

/// Run summary on the wire; field names are part of the response contract
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub total_companies: usize,
    pub successful_processing: usize,
    pub errors: usize,
}

impl From<&RunStats> for JobSummary {
    fn from(stats: &RunStats) -> Self {
        Self {
            total_companies: stats.total_companies,
            successful_processing: stats.succeeded,
            errors: stats.failed,
        }
    }
}

/// Job failure with a uniform wire shape: the serialized form is
/// {"error": "<kind>", "message": "<detail>"}
#[derive(Debug, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum JobError {
    /// The request itself was unusable (4xx class)
    #[error("bad request: {message}")]
    BadRequest { message: String },
    /// The pipeline failed internally (5xx class)
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl JobError {
    pub fn status_code(&self) -> u16 {
        match self {
            JobError::BadRequest { .. } => 400,
            JobError::Internal { .. } => 500,
        }
    }
}

/// Run a submitted company list through the pipeline.
///
/// Input rows with invalid websites are rejected up front rather than
/// silently dropped: a caller-submitted job is a contract, unlike a CSV
/// someone exported by hand.
pub async fn run_batch_job(
    processor: &CompanyProcessor,
    scheduler_config: SchedulerConfig,
    request: BatchJobRequest,
) -> Result<BatchJobResponse, JobError> {
    if request.companies.is_empty() {
        return Err(JobError::BadRequest {
            message: "companies list is empty".to_string(),
        });
    }

    for input in &request.companies {
        let domain = input.domain();
        if !crate::domain_utils::is_valid_domain(&domain) {
            return Err(JobError::BadRequest {
                message: format!("invalid website '{}'", input.website),
            });
        }
    }

    info!("Batch job submitted with {} companies", request.companies.len());

    let pipeline = processor.pipeline();
    let settings_hash = generate_settings_hash(
        scheduler_config.batch_size,
        pipeline.confidence_gate,
        pipeline.parent_replacement_margin,
        pipeline.classifier_score_floor,
    );
    let checkpoint = Checkpoint::new("batch-job".to_string(), settings_hash);
    let workdir = std::env::temp_dir().join(format!("execfinder-job-{}", std::process::id()));

    let scheduler = BatchScheduler::new(processor, scheduler_config);
    let (results, summary) = scheduler
        .run_all(&request.companies, checkpoint, &workdir)
        .await
        .map_err(|e| JobError::Internal {
            message: format!("{:#}", e),
        })?;

    Ok(BatchJobResponse {
        results,
        summary: JobSummary::from(&summary),
    })
}
