//! Executive identity resolution and contact enrichment pipeline.
//!
//! Given a list of company websites, the pipeline resolves who holds the
//! CFO and CRO roles at each company (following acquisitions to the parent
//! when operations moved there), enriches the identified executives with
//! contact details merged across providers, and exports flattened results.

pub mod cache;
pub mod candidate;
pub mod checkpoint;
pub mod classifier;
pub mod cli;
pub mod company;
pub mod config;
pub mod conflict;
pub mod domain_utils;
pub mod export;
pub mod job;
pub mod known_entities;
pub mod merge;
pub mod processor;
pub mod providers;
pub mod scheduler;
pub mod stats;
pub mod targeting;

pub use candidate::{ContactRecord, ExecutiveCandidate, Role};
pub use company::{Company, CompanyInput, PipelineResult};
pub use job::{run_batch_job, BatchJobRequest, BatchJobResponse, JobError, JobSummary};
pub use processor::CompanyProcessor;
pub use scheduler::BatchScheduler;
