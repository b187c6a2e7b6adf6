mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use migrun_core::{MigrationDiscovery, MigrationRegistry, PersistMode, Runner, RunnerConfig};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "migrun", version, about = "Run pending migration scripts once, in order")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory the state file and migrations are resolved against
    #[arg(long, global = true, env = "MIGRUN_WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// State file path [default: data.json]
    #[arg(long, global = true, env = "MIGRUN_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Migrations directory [default: .build/migrations]
    #[arg(long, global = true, env = "MIGRUN_MIGRATIONS_DIR")]
    migrations_dir: Option<PathBuf>,

    /// Save state after every successful migration instead of once at the end
    #[arg(
        long,
        global = true,
        env = "MIGRUN_CHECKPOINT",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    checkpoint: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations (the default)
    Run,
    /// List discovered migrations and whether they have been applied
    Status,
    /// Run a single migration's rollback operation; the state file is not changed
    Rollback {
        /// Migration ID, e.g. 001_init
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = build_config(&cli)?;
    let runner = Runner::from_config(&config, script_registry(&config)?);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let summary = runner.run().await.context("migration run failed")?;
            info!(
                "done: {} applied, {} previously applied",
                summary.applied.len(),
                summary.already_applied
            );
        }
        Commands::Status => {
            let entries = runner.status().context("failed to read migration status")?;
            print!("{}", status::render(&entries));
        }
        Commands::Rollback { id } => {
            runner
                .rollback(&id)
                .await
                .with_context(|| format!("rollback of {id} failed"))?;
            info!("rolled back {id}");
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "migrun=info,migrun_core=info,migrun_state=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn build_config(cli: &Cli) -> Result<RunnerConfig> {
    let mut config = match &cli.working_dir {
        Some(dir) => RunnerConfig::for_working_dir(dir),
        None => RunnerConfig::from_current_dir(),
    }
    .context("failed to resolve configuration")?;

    if let Some(path) = &cli.state_file {
        config = config.with_state_file(path);
    }
    if let Some(path) = &cli.migrations_dir {
        config = config.with_migrations_dir(path);
    }
    if cli.checkpoint {
        config = config.with_persist(PersistMode::Checkpoint);
    }

    debug!(
        "state file {}, migrations in {}",
        config.state_file.display(),
        config.migrations_dir.display()
    );
    Ok(config)
}

/// Register every script in the migrations directory. An unreadable directory
/// yields an empty registry so the runner reports the listing failure itself,
/// after state initialization.
fn script_registry(config: &RunnerConfig) -> Result<MigrationRegistry> {
    match MigrationDiscovery::new(&config.migrations_dir).scan() {
        Ok(candidates) => {
            let registry = MigrationRegistry::from_scripts(&candidates, &config.working_dir)
                .context("failed to register migration scripts")?;
            debug!("registered {} migration script(s)", registry.len());
            Ok(registry)
        }
        Err(e) => {
            debug!("no migration scripts registered: {e}");
            Ok(MigrationRegistry::new())
        }
    }
}
