use crate::config::LoggingConfig;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const CRATE_TARGETS: [&str; 5] = [
    "vaultdao",
    "vaultdao_node",
    "vaultdao_governance",
    "vaultdao_ledger",
    "vaultdao_types",
];

/// Resolve the effective level: each `-v` raises it one step above the config.
pub fn effective_level(config: &LoggingConfig, cli_verbose: u8) -> &str {
    match cli_verbose {
        0 => &config.level,
        1 => "debug",
        _ => "trace",
    }
}

/// Default filter directives when `RUST_LOG` is not set.
pub fn default_directives(config: &LoggingConfig, cli_verbose: u8) -> String {
    let level = effective_level(config, cli_verbose);
    let mut directives: Vec<String> = CRATE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    directives.extend(
        config
            .module_filters
            .iter()
            .map(|(module, level)| format!("{}={}", module, level)),
    );
    directives.join(",")
}

/// Initialize the logging system based on configuration
pub fn init_logging(config: &LoggingConfig, cli_verbose: u8) -> anyhow::Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::try_new(default_directives(config, cli_verbose))?,
    };

    let subscriber = tracing_subscriber::registry().with(filter);
    let file = config.file_output.as_deref().map(open_log_file).transpose()?;

    match config.format.as_str() {
        "json" => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_line_number(true)
                .with_file(true);

            if let Some(file) = file {
                let file_layer = fmt::layer().json().with_writer(file).with_ansi(false);
                subscriber.with(json_layer).with(file_layer).try_init()?;
            } else {
                subscriber.with(json_layer).try_init()?;
            }
        }
        "compact" => {
            let compact_layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_line_number(false)
                .with_file(false);

            if let Some(file) = file {
                let file_layer = fmt::layer().compact().with_writer(file).with_ansi(false);
                subscriber.with(compact_layer).with(file_layer).try_init()?;
            } else {
                subscriber.with(compact_layer).try_init()?;
            }
        }
        _ => {
            // Source locations only at debug and below
            let show_location = matches!(effective_level(config, cli_verbose), "debug" | "trace");

            let pretty_layer = fmt::layer()
                .with_target(show_location)
                .with_line_number(show_location)
                .with_file(show_location);

            if let Some(file) = file {
                let file_layer = fmt::layer().with_writer(file).with_ansi(false);
                subscriber.with(pretty_layer).with(file_layer).try_init()?;
            } else {
                subscriber.with(pretty_layer).try_init()?;
            }
        }
    }

    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<Mutex<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Mutex::new(file))
}
