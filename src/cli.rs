use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "semdex",
    about = "Cache-aware semantic search over a local document corpus"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a document directory and write corpus metadata
    Scan(ScanArgs),
    /// Build the vector index from corpus metadata and the cache
    Build,
    /// Query the index
    Search(SearchArgs),
    /// Manage the embedding cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show data directory and artifact statistics
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Scan --

#[derive(Debug, Parser)]
pub struct ScanArgs {
    /// Directory containing the document corpus (.txt / .md files)
    pub docs_dir: PathBuf,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Compute a keyword-overlap explanation per result
    #[arg(long)]
    pub explain: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Cache subcommands --

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove all cached embeddings
    Clear,
    /// Show the number of cached entries
    Stats,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "semdex",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["semdex", "search", "hello"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "hello");
                assert_eq!(args.count, 5);
                assert!(!args.explain);
                assert!(!args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_search_with_flags() {
        let cli = Cli::parse_from([
            "semdex", "search", "hello", "-n", "3", "--explain", "--json",
        ]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.count, 3);
                assert!(args.explain);
                assert!(args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_cache_clear() {
        let cli = Cli::parse_from(["semdex", "cache", "clear"]);
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Clear
            }
        ));
    }

    #[test]
    fn parse_scan() {
        let cli = Cli::parse_from(["semdex", "scan", "/tmp/docs"]);
        match cli.command {
            Command::Scan(args) => {
                assert_eq!(args.docs_dir, PathBuf::from("/tmp/docs"));
            }
            _ => panic!("expected scan command"),
        }
    }
}
