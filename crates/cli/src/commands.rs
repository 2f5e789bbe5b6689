use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the change sets of a changelog in order
    Migrate {
        #[arg(long, help = "Changelog file path (TOML)")]
        changelog: PathBuf,

        #[arg(long, help = "Optional .env file overlaid on the process environment")]
        env_file: Option<PathBuf>,

        #[arg(long, help = "Only run these change set ids (repeatable)")]
        only: Vec<String>,

        #[arg(
            long,
            help = "If specified, writes the JSON run report to this file instead of stdout"
        )]
        output: Option<PathBuf>,
    },
    /// Check a changelog without touching the graph
    Validate {
        #[arg(long, help = "Changelog file path (TOML)")]
        changelog: PathBuf,

        #[arg(long, help = "Optional .env file overlaid on the process environment")]
        env_file: Option<PathBuf>,
    },
    /// Load a local delimited file through a write query
    Load {
        #[command(flatten)]
        graph: GraphArgs,

        #[arg(long, help = "Delimited data file")]
        file: PathBuf,

        #[arg(long, default_value = "TSV", help = "CSV, TSV or PSV")]
        file_type: String,

        #[arg(long, help = "Write query; receives each chunk as $rows")]
        query: String,

        #[arg(
            long,
            default_value_t = 0,
            help = "Data records to skip (the header is never counted)"
        )]
        start_offset: u64,

        #[arg(long, default_value_t = 5000)]
        chunk_size: usize,

        #[arg(long, help = "Per-transaction timeout in seconds")]
        tx_timeout: Option<u64>,
    },
    /// Repeat a mutation until a count query returns zero
    Drain {
        #[command(flatten)]
        graph: GraphArgs,

        #[arg(long, help = "Query returning a single count")]
        condition: String,

        #[arg(long, help = "Bounded mutation query")]
        query: String,

        #[arg(long)]
        max_iterations: Option<u64>,

        #[arg(long, help = "Keep looping when a mutation does not lower the count")]
        allow_stall: bool,

        #[arg(long, help = "Per-transaction timeout in seconds")]
        tx_timeout: Option<u64>,
    },
    /// Check that the graph endpoint answers
    TestConn {
        #[command(flatten)]
        graph: GraphArgs,
    },
}

#[derive(Args)]
pub struct GraphArgs {
    /// HTTP endpoint, e.g. http://localhost:7474
    #[arg(long, env = "NEO4J_HOST")]
    pub host: String,

    /// "user,password"
    #[arg(long, env = "NEO4J_CREDENTIALS", hide_env_values = true)]
    pub credentials: String,

    #[arg(long, env = "NEO4J_DATABASE")]
    pub database: Option<String>,
}
