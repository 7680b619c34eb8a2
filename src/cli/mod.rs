//! CLI module for Anirec.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Anirec - anime recommendations from your own catalog
///
/// Builds a vector index over an anime catalog CSV and answers free-text
/// requests with three recommendations drawn from it.
#[derive(Parser, Debug)]
#[command(name = "anirec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest the catalog and build the vector index
    Build {
        /// Raw catalog CSV (overrides catalog.raw_path)
        #[arg(long)]
        input: Option<String>,

        /// Canonical CSV to write (overrides catalog.canonical_path)
        #[arg(long)]
        canonical: Option<String>,

        /// Index directory (overrides index.persist_dir)
        #[arg(long)]
        persist_dir: Option<String>,

        /// Rebuild the index from the existing canonical CSV, skipping ingestion
        #[arg(long, conflicts_with = "input")]
        from_canonical: bool,
    },

    /// Ask for three anime recommendations
    Recommend {
        /// What you are in the mood for
        query: String,

        /// Also print the catalog entries the answer was drawn from
        #[arg(short, long)]
        sources: bool,
    },

    /// Show the catalog entries closest to a query, without generation
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value = "5")]
        limit: usize,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Check credentials, catalog and index
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_recommend() {
        let cli = Cli::try_parse_from(["anirec", "-vv", "recommend", "slow-paced space drama", "--sources"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Recommend { query, sources } => {
                assert_eq!(query, "slow-paced space drama");
                assert!(sources);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_build_overrides() {
        let cli = Cli::try_parse_from(["anirec", "build", "--persist-dir", "/tmp/idx"]).unwrap();
        match cli.command {
            Commands::Build {
                persist_dir,
                input,
                from_canonical,
                ..
            } => {
                assert_eq!(persist_dir.as_deref(), Some("/tmp/idx"));
                assert!(input.is_none());
                assert!(!from_canonical);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_from_canonical_excludes_input() {
        let cli = Cli::try_parse_from(["anirec", "build", "--from-canonical"]).unwrap();
        assert!(matches!(cli.command, Commands::Build { from_canonical: true, .. }));

        let conflict = Cli::try_parse_from(["anirec", "build", "--from-canonical", "--input", "a.csv"]);
        assert!(conflict.is_err());
    }
}
