//! Batch scheduler: runs companies through the processor in fixed-size
//! concurrent batches with per-company timeouts, inter-batch pacing, and
//! periodic checkpointing.
//!
//! Concurrency is scatter/merge per batch: every company in a batch runs
//! concurrently, the batch completes as a unit, and results merge in input
//! order before the next batch starts.

use anyhow::Result;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::checkpoint::Checkpoint;
use crate::company::{CompanyInput, PipelineResult};
use crate::config::SchedulerConfig;
use crate::processor::CompanyProcessor;
use crate::stats::RunStats;

pub struct BatchScheduler<'a> {
    processor: &'a CompanyProcessor,
    config: SchedulerConfig,
}

impl<'a> BatchScheduler<'a> {
    pub fn new(processor: &'a CompanyProcessor, config: SchedulerConfig) -> Self {
        Self { processor, config }
    }

    /// Run every company in `inputs` that the checkpoint has not already
    /// completed. Returns all results (resumed ones included) and the run
    /// statistics.
    pub async fn run_all(
        &self,
        inputs: &[CompanyInput],
        mut checkpoint: Checkpoint,
        output_dir: &Path,
    ) -> Result<(Vec<PipelineResult>, RunStats)> {
        let started = Instant::now();

        let pending: Vec<&CompanyInput> = inputs
            .iter()
            .filter(|input| !checkpoint.is_completed(&input.domain()))
            .collect();

        let resumed = inputs.len() - pending.len();
        if resumed > 0 {
            info!("Resuming: {} of {} companies already completed", resumed, inputs.len());
        }
        info!(
            "Processing {} companies in batches of {}",
            pending.len(),
            self.config.batch_size
        );

        let progress = ProgressBar::new(pending.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} companies ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );

        let timeout = self.config.per_company_timeout();
        let mut since_checkpoint = 0usize;
        let batch_count = pending.chunks(self.config.batch_size.max(1)).count();

        for (batch_index, batch) in pending.chunks(self.config.batch_size.max(1)).enumerate() {
            info!("Starting batch {}/{} ({} companies)", batch_index + 1, batch_count, batch.len());

            let futures = batch.iter().map(|input| async move {
                let batch_started = Instant::now();
                match tokio::time::timeout(timeout, self.processor.process(input)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Processing timed out for {}", input.domain());
                        PipelineResult::from_error(
                            input,
                            format!("processing timed out after {}s", timeout.as_secs()),
                            batch_started.elapsed().as_millis() as u64,
                        )
                    }
                }
            });

            for result in join_all(futures).await {
                progress.inc(1);
                checkpoint.record_result(result);
                since_checkpoint += 1;

                if since_checkpoint >= self.config.checkpoint_interval.max(1) {
                    if let Err(e) = checkpoint.save(output_dir) {
                        warn!("Failed to save checkpoint: {:#}", e);
                    }
                    since_checkpoint = 0;
                }
            }

            // Pace between batches, not after the last one
            if batch_index + 1 < batch_count && !self.config.inter_batch_delay().is_zero() {
                tokio::time::sleep(self.config.inter_batch_delay()).await;
            }
        }

        progress.finish_and_clear();
        checkpoint.save(output_dir)?;

        let mut stats = RunStats::default();
        for result in &checkpoint.results {
            stats.record(result);
        }
        stats.cache_hits = self.processor.cache().hits();
        stats.cache_misses = self.processor.cache().misses();
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        // Results come back in completion order per batch; restore input
        // order for output stability
        let mut results = checkpoint.results.clone();
        let position = |domain: &str| {
            inputs
                .iter()
                .position(|input| input.domain() == domain)
                .unwrap_or(usize::MAX)
        };
        results.sort_by_key(|r| position(&r.company.domain));

        Checkpoint::delete(output_dir)?;

        Ok((results, stats))
    }
}
