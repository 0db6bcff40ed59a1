use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use dai::cli::{self, Cli, Command, LogFormatArg};
use dai::config::{self, Config, LOG_FILE, LogFormat};

/// Filter directive that overrides the configured log level
const ENV_LOG_FILTER: &str = "DAI_LOG";

fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env(ENV_LOG_FILTER)
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL));

    let stderr = match config.log_format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file, guard) = if config.log_file {
        match RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE)
            .build(config::data_dir())
        {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (
                    Some(fmt::layer().with_ansi(false).with_writer(writer)),
                    Some(guard),
                )
            }
            Err(e) => {
                eprintln!("warning: file logging disabled: {e}");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .with(filter)
        .init();

    guard
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let config_path = config::config_path();
    let mut config = Config::load_with_env()
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    if let Some(format) = cli.log_format {
        config.log_format = match format {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        };
    }

    let _guard = init_logging(&config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let code = match &cli.command {
        Command::Config(args) => cli::config::run(args, &config, &config_path, &mut out)?,
        Command::Scan(args) => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(cli::scan::run(args, &config, &mut out))?,
        Command::Upgrade(args) => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(cli::upgrade::run(args, &config, &mut out))?,
    };

    out.flush()?;
    Ok(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
