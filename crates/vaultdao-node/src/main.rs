use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use vaultdao_node::{config::NodeConfig, logging, replay};

const DEFAULT_CONFIG: &str = "./vaultdao.toml";

#[derive(Parser)]
#[command(name = "vaultdao")]
#[command(about = "VaultDAO - deterministic vault ledger and governance replay", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a genesis state file from the configured genesis section
    Init {
        /// Where to write the state
        #[arg(short, long, default_value = "state.json")]
        output: PathBuf,

        /// Also write the effective configuration next to the state
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Apply a call log to a state file
    Replay {
        /// State file to start from
        #[arg(short, long, default_value = "state.json")]
        state: PathBuf,

        /// JSON call log (array or one record per line)
        #[arg(short, long)]
        log: PathBuf,

        /// Where to write the final state (defaults to the input state file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Clock height before the first record
        #[arg(long, default_value = "0")]
        start_height: u64,

        /// Abort on the first rejected call
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Print the digest of a state file
    Digest {
        /// State file to hash
        #[arg(default_value = "state.json")]
        state: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    // Priority order: ENV vars > config file > defaults
    let mut config = match path {
        Some(path) => NodeConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => NodeConfig::from_file(Path::new(DEFAULT_CONFIG))?,
        None => NodeConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if let Err(e) = logging::init_logging(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Init {
            output,
            write_config,
            force,
        } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }

            let state = config.genesis.build_state()?;
            replay::save_state(&output, &state)?;

            if write_config {
                let config_path = output.with_file_name("vaultdao.toml");
                config.save_to_file(&config_path)?;
                info!(path = ?config_path, "⚙️ Configuration written");
            }

            info!(path = ?output, name = %state.name, ticker = %state.ticker, "🌱 Genesis state written");
            println!("{}", state.digest_hex()?);
        }

        Commands::Replay {
            state,
            log,
            output,
            start_height,
            stop_on_error,
        } => {
            let initial = replay::load_state(&state)?;
            let records = replay::load_log(&log)?;
            let stop_on_error = stop_on_error || config.replay.stop_on_error;

            let (final_state, summary) =
                replay::replay(initial, records, start_height, stop_on_error)?;
            final_state
                .check_invariants()
                .context("Replayed state violates ledger invariants")?;

            let output = output.unwrap_or(state);
            replay::save_state(&output, &final_state)?;

            info!(
                path = ?output,
                applied = summary.applied,
                rejected = summary.rejected.len(),
                "💾 Final state written"
            );
            println!("{}", final_state.digest_hex()?);
        }

        Commands::Digest { state } => {
            let state = replay::load_state(&state)?;
            println!("{}", state.digest_hex()?);
        }
    }

    Ok(())
}
