use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use execfinder::cache::ResponseCache;
use execfinder::checkpoint::{generate_settings_hash, Checkpoint};
use execfinder::cli::{CacheCommands, Cli, Commands};
use execfinder::company::parse_company_file;
use execfinder::config::{AppConfig, ConfigError};
use execfinder::export::{export_results, OutputFormat};
use execfinder::processor::CompanyProcessor;
use execfinder::providers::build_providers;
use execfinder::scheduler::BatchScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.init {
        let path = AppConfig::create_default_config()
            .context("Failed to create default configuration file")?;
        println!("Created default configuration file at: {}", path.display());
        println!("Edit it to configure providers, then run with --input <file>.");
        return Ok(());
    }

    let config = load_config()?;

    if let Some(Commands::Cache { action }) = &cli.command {
        let cache = ResponseCache::new(&config.cache.dir, config.cache.ttl());
        return run_cache_command(&cache, action).await;
    }

    let Some(input) = &cli.input else {
        bail!("No input file given. Use --input <file.csv|file.json>, or see --help.");
    };

    let companies = parse_company_file(Path::new(input))?;
    if companies.is_empty() {
        bail!("No valid companies found in {}", input);
    }
    info!("Loaded {} companies from {}", companies.len(), input);

    let format: OutputFormat = cli.output_format.parse()?;
    let output_dir = cli
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let settings_hash = generate_settings_hash(
        config.scheduler.batch_size,
        config.pipeline.confidence_gate,
        config.pipeline.parent_replacement_margin,
        config.pipeline.classifier_score_floor,
    );

    let checkpoint = if cli.resume && Checkpoint::exists(&output_dir) {
        match Checkpoint::load(&output_dir) {
            Ok(cp) if cp.is_compatible(input, &settings_hash) => {
                println!("{}", cp.summary());
                cp
            }
            Ok(_) => {
                warn!("Checkpoint belongs to a different input or settings; starting fresh");
                Checkpoint::new(input.clone(), settings_hash)
            }
            Err(e) => {
                warn!("Could not load checkpoint ({:#}); starting fresh", e);
                Checkpoint::new(input.clone(), settings_hash)
            }
        }
    } else {
        Checkpoint::new(input.clone(), settings_hash)
    };

    let providers = build_providers(&config)?;
    if providers.research.is_empty() {
        warn!("No research providers configured; results will be empty");
    }

    let cache = ResponseCache::new(&config.cache.dir, config.cache.ttl());
    let processor = CompanyProcessor::new(config.pipeline.clone(), providers, cache);
    let scheduler = BatchScheduler::new(&processor, config.scheduler.clone());

    let (results, stats) = scheduler.run_all(&companies, checkpoint, &output_dir).await?;

    let extension = match format {
        OutputFormat::Csv => "csv",
        OutputFormat::Json => "json",
    };
    let mut filename = cli.output.clone();
    if !filename.to_lowercase().ends_with(&format!(".{}", extension)) {
        filename = format!("{}.{}", filename, extension);
    }
    let output_path = output_dir.join(filename);

    export_results(&results, &stats, &output_path, format)?;

    println!("\n{}", stats);
    println!("\nResults written to {}", output_path.display());
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("execfinder={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config() -> Result<AppConfig> {
    match AppConfig::load() {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(path)) => {
            if let Some(created) = AppConfig::prompt_create_config()? {
                println!("Created default configuration file at: {}", created.display());
                Ok(AppConfig::load()?)
            } else {
                bail!(
                    "Configuration file not found at {}. Run 'execfinder --init' to create one.",
                    path.display()
                );
            }
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_cache_command(cache: &ResponseCache, action: &CacheCommands) -> Result<()> {
    match action {
        CacheCommands::List => {
            let entries = cache.list_entries().await?;
            if entries.is_empty() {
                println!("Cache is empty ({})", cache.dir().display());
                return Ok(());
            }
            println!("{} cache entries in {}:", entries.len(), cache.dir().display());
            for entry in entries {
                let stored = chrono::DateTime::from_timestamp(entry.stored_at as i64, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "  {:<24} {:<44} {} {}",
                    entry.provider,
                    entry.subject,
                    stored,
                    if entry.expired { "(expired)" } else { "" }
                );
            }
            Ok(())
        }
        CacheCommands::Clear { subject, all } => {
            if *all {
                let removed = cache.clear_all().await?;
                println!("Removed {} cache entries", removed);
            } else if let Some(subject) = subject {
                let removed = cache.clear_subject(subject).await?;
                println!("Removed {} cache entries for '{}'", removed, subject);
            } else {
                eprintln!("Error: specify a subject or use --all to clear every entry.");
                eprintln!("Usage: execfinder cache clear <subject>");
                eprintln!("       execfinder cache clear --all");
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
