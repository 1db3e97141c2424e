use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "execfinder")]
#[command(about = "Resolves CFO and CRO identities and contact details for company lists")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/execfinder.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Input file with companies (.csv with a 'Website' column, or .json)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output format: 'csv' (default) or 'json'
    #[arg(short = 'f', long, default_value = "csv")]
    pub output_format: String,

    /// Output directory for the results file (defaults to current directory)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Output filename (extension is set from the format if not provided)
    #[arg(short, long, default_value = "executives")]
    pub output: String,

    /// Resume from the checkpoint left by an interrupted run
    #[arg(long)]
    pub resume: bool,

    /// Verbose logging (use -v for INFO, -vv for DEBUG with provider details)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or clear the provider response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached provider responses
    List,
    /// Clear cache entries
    Clear {
        /// Subject to clear (a domain, or a domain:role:name contact key)
        subject: Option<String>,
        /// Clear every cache entry
        #[arg(long)]
        all: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "execfinder",
            "--input",
            "companies.csv",
            "--output-format",
            "json",
            "--resume",
            "-vv",
        ]);
        assert_eq!(cli.input.as_deref(), Some("companies.csv"));
        assert_eq!(cli.output_format, "json");
        assert!(cli.resume);
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parses_cache_subcommand() {
        let cli = Cli::parse_from(["execfinder", "cache", "clear", "acme.com"]);
        match cli.command {
            Some(Commands::Cache {
                action: CacheCommands::Clear { subject, all },
            }) => {
                assert_eq!(subject.as_deref(), Some("acme.com"));
                assert!(!all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
