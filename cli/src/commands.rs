use crate::cli::*;
use anyhow::Context;
use core_runtime::config::{CoreConfig, CredentialConfig};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_service::MigrationService;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Copy(args) => cmd_copy(args).await,
        Command::Status(args) => cmd_status(args).await,
    }
}

async fn cmd_copy(args: CopyArgs) -> anyhow::Result<()> {
    let mut logging = LoggingConfig::default()
        .with_level(args.log_level)
        .with_log_file(&args.log_file);
    if let Some(format) = args.log_format {
        logging = logging.with_format(format);
    }
    init_logging(logging).context("Failed to set up logging")?;

    let credentials = CredentialConfig::load(&args.config)
        .with_context(|| format!("Cannot load credentials from {}", args.config.display()))?;
    info!(credentials = ?credentials, "Credentials loaded");

    let config = CoreConfig::builder()
        .credentials(credentials)
        .progress_path(&args.progress)
        .batch_size(args.batch_size)
        .build()?;
    let service = MigrationService::from_config(config)?;

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    println!("Copying cloud drive songs from the source account to the target account");
    match service.run_copy(&shutdown).await {
        Ok(report) => {
            println!(
                "Done: {} copied, {} need upload, {} failed",
                report.copied, report.skipped_need_upload, report.failed
            );
        }
        Err(e) if e.is_cancelled() => {
            println!(
                "Interrupted, progress saved to {}",
                args.progress.display()
            );
        }
        Err(e) => {
            error!("Copy aborted: {}", e);
            return Err(e).context("Copy aborted");
        }
    }

    if let Some(summary) = service.summary().await {
        println!("{}", summary);
    }
    Ok(())
}

async fn cmd_status(args: StatusArgs) -> anyhow::Result<()> {
    match core_service::status(&args.progress).await {
        Some(summary) => println!("{}", summary),
        None => println!("No progress recorded yet at {}", args.progress.display()),
    }
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or, on Unix, SIGTERM.
fn spawn_shutdown_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    warn!("Cannot listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        warn!("Shutdown requested, saving progress");
        shutdown.cancel();
    });
}
