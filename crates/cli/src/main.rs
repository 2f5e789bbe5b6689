use crate::{
    commands::{Commands, GraphArgs},
    conn::{ConnectionPinger, Neo4jPinger},
    error::CliError,
    exit::ExitCode,
};
use clap::Parser;
use connectors::{
    file::delimited::format::FileFormat,
    graph::{
        neo4j::{adapter::Neo4jGraph, config::Neo4jConfig},
        store::GraphStore,
    },
};
use engine_core::{
    condition::ConditionLoopExecutor,
    loader::BulkLoader,
    settings::{LoaderSettings, LoopPolicy},
};
use engine_runtime::{changelog::Changelog, env::EnvVars, executor::ChangelogExecutor};
use model::pagination::offset::Offset;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod exit;
mod output;

#[derive(Parser)]
#[command(
    name = "graph-loader",
    version = "0.1.0",
    about = "Chunked, resumable bulk loader for graph migrations"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli.command).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!("{e}");
            ExitCode::from(&e)
        }
    };
    std::process::exit(code.as_i32());
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Migrate {
            changelog,
            env_file,
            only,
            output,
        } => {
            let executor = load_changelog(&changelog, env_file.as_deref())?;
            let report = executor.run_connected(&only).await?;
            match output {
                Some(path) => output::write_report(&report, &path).await?,
                None => output::print_report(&report)?,
            }
        }
        Commands::Validate {
            changelog,
            env_file,
        } => {
            let executor = load_changelog(&changelog, env_file.as_deref())?;
            let errors = executor.validate();
            if !errors.is_empty() {
                return Err(engine_runtime::error::ChangelogError::Validation(errors).into());
            }
            info!(
                changes = executor.changelog().changes.len(),
                "Changelog is valid"
            );
        }
        Commands::Load {
            graph,
            file,
            file_type,
            query,
            start_offset,
            chunk_size,
            tx_timeout,
        } => {
            let format: FileFormat = file_type.parse()?;
            let mut settings = LoaderSettings::default()
                .with_chunk_size(chunk_size)?
                .with_start_offset(Offset::new(start_offset));
            if let Some(secs) = tx_timeout {
                settings = settings.with_tx_timeout(Duration::from_secs(secs))?;
            }

            let store = connect(&graph)?;
            let result = BulkLoader::new(store.clone(), query, settings)
                .load_file(&file, format)
                .await;
            close(store).await;
            output::print_report(&result?)?;
        }
        Commands::Drain {
            graph,
            condition,
            query,
            max_iterations,
            allow_stall,
            tx_timeout,
        } => {
            let mut policy = LoopPolicy::default()
                .with_max_iterations(max_iterations)
                .with_stall_detection(!allow_stall);
            if let Some(secs) = tx_timeout {
                policy = policy.with_tx_timeout(Duration::from_secs(secs))?;
            }

            let store = connect(&graph)?;
            let result = ConditionLoopExecutor::new(store.clone(), condition, query, policy)
                .run()
                .await;
            close(store).await;
            output::print_report(&result?)?;
        }
        Commands::TestConn { graph } => {
            Neo4jPinger {
                config: graph_config(&graph)?,
            }
            .ping()
            .await?;
        }
    }

    Ok(())
}

fn load_changelog(path: &Path, env_file: Option<&Path>) -> Result<ChangelogExecutor, CliError> {
    let mut env = EnvVars::from_process();
    if let Some(env_file) = env_file {
        env.load_file(env_file)?;
    }
    let changelog = Changelog::from_file(path, &env)?;
    Ok(ChangelogExecutor::new(changelog, env, default_local_dir()))
}

fn default_local_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("graph-loader")
}

fn graph_config(args: &GraphArgs) -> Result<Neo4jConfig, CliError> {
    Ok(Neo4jConfig::from_credentials(
        &args.host,
        &args.credentials,
        args.database.as_deref(),
    )?)
}

fn connect(args: &GraphArgs) -> Result<Arc<dyn GraphStore>, CliError> {
    Ok(Arc::new(Neo4jGraph::connect(graph_config(args)?)?))
}

async fn close(store: Arc<dyn GraphStore>) {
    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close graph session");
    }
}
