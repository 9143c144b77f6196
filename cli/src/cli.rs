use bridge_traits::time::LogLevel;
use clap::{Args, Parser, Subcommand};
use core_runtime::config::{DEFAULT_BATCH_SIZE, DEFAULT_CREDENTIALS_PATH, DEFAULT_PROGRESS_PATH};
use core_runtime::logging::LogFormat;
use std::path::PathBuf;

pub const DEFAULT_LOG_FILE: &str = "netease_copy.log";

#[derive(Parser)]
#[command(
    name = "cloud-drive-copy",
    about = "Copy the songs of one NetEase cloud music drive into another account",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy every song of the source drive that the target drive lacks
    Copy(CopyArgs),
    /// Show the progress recorded by earlier runs
    Status(StatusArgs),
}

#[derive(Args)]
pub struct CopyArgs {
    /// Credentials file holding both account cookies
    #[arg(short, long, default_value = DEFAULT_CREDENTIALS_PATH)]
    pub config: PathBuf,

    /// Progress ledger file
    #[arg(short, long, default_value = DEFAULT_PROGRESS_PATH)]
    pub progress: PathBuf,

    /// Songs processed between two ledger saves
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Console log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Console log format (pretty, json, compact)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// File receiving a debug-level copy of the log
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Progress ledger file
    #[arg(short, long, default_value = DEFAULT_PROGRESS_PATH)]
    pub progress: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_defaults() {
        let cli = Cli::try_parse_from(["cloud-drive-copy", "copy"]).unwrap();
        let Command::Copy(args) = cli.command else {
            panic!("expected copy");
        };

        assert_eq!(args.config, PathBuf::from("config/cookies.json"));
        assert_eq!(args.progress, PathBuf::from("data/progress.json"));
        assert_eq!(args.batch_size, 10);
        assert_eq!(args.log_level, LogLevel::Info);
        assert_eq!(args.log_format, None);
        assert_eq!(args.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_copy_short_flags() {
        let cli = Cli::try_parse_from([
            "cloud-drive-copy",
            "copy",
            "-c",
            "creds.json",
            "-p",
            "ledger.json",
            "-b",
            "3",
            "-l",
            "WARNING",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Command::Copy(args) = cli.command else {
            panic!("expected copy");
        };

        assert_eq!(args.config, PathBuf::from("creds.json"));
        assert_eq!(args.progress, PathBuf::from("ledger.json"));
        assert_eq!(args.batch_size, 3);
        assert_eq!(args.log_level, LogLevel::Warn);
        assert_eq!(args.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["cloud-drive-copy", "copy", "-l", "loud"]).is_err());
    }

    #[test]
    fn test_status_progress_flag() {
        let cli = Cli::try_parse_from(["cloud-drive-copy", "status", "-p", "x.json"]).unwrap();
        let Command::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.progress, PathBuf::from("x.json"));
    }
}
