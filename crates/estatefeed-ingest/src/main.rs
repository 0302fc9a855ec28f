//! Estatefeed - listing feed import tool

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use estatefeed_common::logging::{init_logging, LogConfig, LogLevel};
use estatefeed_ingest::config::{
    ArchiveConfig, DestinationConfig, ImportConfig, DEFAULT_API_URL, DEFAULT_BATCH_SIZE,
    DEFAULT_MAX_ARCHIVE_BYTES, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use estatefeed_ingest::destination::AirtableClient;
use estatefeed_ingest::pipeline::{read_archive, run_import};
use estatefeed_ingest::progress::{create_spinner, EventSink, ImportEvent};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "estatefeed")]
#[command(author, version, about = "Import real-estate listing feeds into a destination table")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every listing of an archive into the destination table
    Import(ImportArgs),

    /// Print the canonical listings of an archive as JSON lines
    Inspect(ArchiveArgs),
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    /// ZIP archive with one or more XML feeds
    archive: PathBuf,

    /// Directory under which the per-run scratch directory is created
    #[arg(long, env = "ESTATEFEED_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Reject archives larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_ARCHIVE_BYTES)]
    max_archive_bytes: u64,
}

impl ArchiveArgs {
    fn to_config(&self) -> ArchiveConfig {
        let config = ArchiveConfig::new(&self.archive).with_max_archive_bytes(self.max_archive_bytes);
        match &self.scratch_dir {
            Some(dir) => config.with_scratch_root(dir),
            None => config,
        }
    }
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// Personal access token
    #[arg(long, env = "ESTATEFEED_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Base identifier
    #[arg(long, env = "ESTATEFEED_BASE_ID")]
    base_id: String,

    /// Table name or id
    #[arg(long, env = "ESTATEFEED_TABLE")]
    table: String,

    #[arg(long, env = "ESTATEFEED_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Rows per create call (1-10)
    #[arg(long, env = "ESTATEFEED_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Create missing destination columns before importing
    #[arg(
        long,
        env = "ESTATEFEED_PROVISION_COLUMNS",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    provision_columns: bool,

    /// Request timeout in seconds
    #[arg(long, env = "ESTATEFEED_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl ImportArgs {
    fn to_config(&self) -> ImportConfig {
        let mut destination =
            DestinationConfig::new(&self.token, &self.base_id, &self.table).with_api_url(&self.api_url);
        destination.timeout_secs = self.timeout_secs;

        ImportConfig::new(self.archive.to_config(), destination)
            .with_batch_size(self.batch_size)
            .with_provision_columns(self.provision_columns)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is fine; flags and the real environment still apply
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("estatefeed")
        .build()
        .with_env_overrides()?;
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Import(args) => import(args).await,
        Command::Inspect(args) => inspect(args).await,
    }
}

async fn import(args: ImportArgs) -> Result<ExitCode> {
    let config = args.to_config();
    config.validate()?;
    let client = AirtableClient::new(&config.destination).context("Failed to create destination client")?;

    let (events, mut receiver) = EventSink::channel();
    let spinner = create_spinner("Starting import");
    let ui = spinner.clone();
    let drain = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                ImportEvent::Progress(message) => {
                    ui.println(format!("  {}", message));
                    ui.set_message(message);
                },
                ImportEvent::Finished { success: true, message } => ui.finish_with_message(message),
                ImportEvent::Finished { success: false, message } => ui.abandon_with_message(message),
            }
        }
    });

    let result = run_import(&config, &client, &events).await;
    drop(events);
    let _ = drain.await;

    match result {
        Ok(report) => {
            for degradation in &report.degradations {
                eprintln!("warning: {}", degradation);
            }
            println!("{}", report.summary_message());
            info!(success = report.success(), "Done");
            Ok(if report.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        },
        Err(e) => {
            eprintln!("error: {}", e);
            Ok(ExitCode::FAILURE)
        },
    }
}

async fn inspect(args: ArchiveArgs) -> Result<ExitCode> {
    let parsed = match read_archive(&args.to_config(), &EventSink::disabled()).await {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::FAILURE);
        },
    };

    for record in &parsed.records {
        println!("{}", serde_json::to_string(record)?);
    }
    for degradation in &parsed.degradations {
        eprintln!("warning: {}", degradation);
    }
    eprintln!("{} listing(s) from {} feed file(s)", parsed.records.len(), parsed.files);
    Ok(ExitCode::SUCCESS)
}
