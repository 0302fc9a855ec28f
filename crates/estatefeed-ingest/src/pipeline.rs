//! Import pipeline
//!
//! One run, front to back and strictly sequential:
//!
//! 1. validate the archive and unpack it into a fresh scratch directory
//! 2. locate the feed files
//! 3. decode and normalize each file in turn
//! 4. check the destination schema once to pick the build mode
//! 5. build every destination row
//! 6. export in batches
//!
//! Steps 1 to 3 fail fast. The scratch directory is removed before step 4
//! whatever their outcome.

use crate::archive::{extract_archive, validate_archive, ScratchDir};
use crate::coerce::{build_records, BuildMode};
use crate::config::{ArchiveConfig, ImportConfig};
use crate::destination::Destination;
use crate::encoding::decode_feed;
use crate::export::{export_records, ExportReport};
use crate::locator::locate_feeds;
use crate::normalize::normalize_feed;
use crate::progress::{format_bytes, EventSink};
use crate::record::ListingRecord;
use crate::schema::missing_columns;
use estatefeed_common::{Degradation, ImportError, Outcome, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Reports
// ============================================================================

/// Canonical records of every feed in one archive
#[derive(Debug, Clone, Default)]
pub struct ParsedArchive {
    pub files: usize,
    pub records: Vec<ListingRecord>,
    pub degradations: Vec<Degradation>,
}

/// Result of a completed run
///
/// A run that reaches the export always produces a report, even when rows
/// failed; `success()` is false as soon as one row did.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub files: usize,
    pub listings: usize,
    pub mode: BuildMode,
    pub export: ExportReport,
    pub degradations: Vec<Degradation>,
}

impl ImportReport {
    pub fn success(&self) -> bool {
        self.export.is_success()
    }

    pub fn summary_message(&self) -> String {
        let mode = match self.mode {
            BuildMode::Full => String::new(),
            BuildMode::Basic => " (basic records: destination schema incomplete)".to_string(),
        };
        if self.success() {
            format!(
                "Imported {} of {} listings from {} feed file(s){}",
                self.export.created, self.listings, self.files, mode
            )
        } else {
            format!(
                "Import finished with errors: {} created, {} failed{}",
                self.export.created, self.export.failed, mode
            )
        }
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Unpack, locate, decode and normalize
///
/// The scratch directory is removed before this returns, on every path.
pub async fn read_archive(config: &ArchiveConfig, events: &EventSink) -> Result<ParsedArchive> {
    let size = validate_archive(config).await?;
    events.progress(format!(
        "Reading archive {} ({})",
        config.archive_path.display(),
        format_bytes(size)
    ));

    let scratch = ScratchDir::create(&config.scratch_root)?;
    let result = read_feeds(&config.archive_path, scratch.path(), events).await;
    scratch.close();
    result
}

async fn read_feeds(archive: &Path, root: &Path, events: &EventSink) -> Result<ParsedArchive> {
    let entries = extract_archive(archive, root).await?;
    events.progress(format!("Extracted {} file(s)", entries));

    let walk_root = root.to_path_buf();
    let feeds: Vec<PathBuf> = tokio::task::spawn_blocking(move || locate_feeds(&walk_root))
        .await
        .map_err(|e| ImportError::extraction(format!("feed discovery failed: {}", e)))?;
    if feeds.is_empty() {
        return Err(ImportError::NoFeedFilesFound);
    }
    info!(feeds = feeds.len(), "Located feed files");
    events.progress(format!("Found {} feed file(s)", feeds.len()));

    let mut parsed = ParsedArchive {
        files: feeds.len(),
        ..ParsedArchive::default()
    };

    for path in &feeds {
        let name = path.strip_prefix(root).unwrap_or(path).display().to_string();
        let bytes = tokio::fs::read(path).await?;

        let (decoded, reasons) = decode_feed(&bytes).into_parts();
        for reason in &reasons {
            warn!(feed = %name, reason = %reason, "Feed decoded with fallback");
        }
        parsed.degradations.extend(reasons);

        let feed = normalize_feed(&decoded.text).map_err(|e| ImportError::parse(&name, e.to_string()))?;
        info!(
            feed = %name,
            encoding = decoded.encoding,
            source = ?feed.source,
            listings = feed.records.len(),
            "Normalized feed"
        );
        events.progress(format!("{}: {} listing(s)", name, feed.records.len()));
        parsed.records.extend(feed.records);
    }

    Ok(parsed)
}

/// Decide the build mode for the whole run from the destination schema
///
/// Rejected credentials, a missing table or an unreachable destination are
/// fatal. Anything else that prevents reading or completing the schema
/// degrades the run to basic mode.
pub async fn choose_build_mode(
    destination: &dyn Destination,
    table: &str,
    provision_columns: bool,
    events: &EventSink,
) -> Result<Outcome<BuildMode>> {
    let existing = match destination.list_columns(table).await {
        Ok(columns) => columns,
        Err(e) if e.is_fatal() => return Err(ImportError::export_fatal(e.to_string())),
        Err(e) => {
            warn!(error = %e, "Could not read destination schema, using basic records");
            return Ok(Outcome::degraded(
                BuildMode::Basic,
                Degradation::SchemaUnreadable { reason: e.to_string() },
            ));
        },
    };

    let mut missing = missing_columns(&existing);
    if missing.is_empty() {
        return Ok(Outcome::Complete(BuildMode::Full));
    }

    if provision_columns {
        events.progress(format!("Creating {} missing column(s)", missing.len()));
        let mut still_missing = Vec::new();
        for column in missing {
            match destination.create_column(table, column).await {
                Ok(true) => info!(column = column.name, "Created destination column"),
                Ok(false) => still_missing.push(column),
                Err(e) if e.is_fatal() => return Err(ImportError::export_fatal(e.to_string())),
                Err(e) => {
                    warn!(column = column.name, error = %e, "Column creation failed");
                    still_missing.push(column);
                },
            }
        }
        missing = still_missing;
        if missing.is_empty() {
            return Ok(Outcome::Complete(BuildMode::Full));
        }
    }

    let names: Vec<String> = missing.iter().map(|c| c.name.to_string()).collect();
    warn!(missing = ?names, "Destination schema incomplete, using basic records");
    Ok(Outcome::degraded(
        BuildMode::Basic,
        Degradation::SchemaIncomplete { missing: names },
    ))
}

/// Run a whole import against `destination`
pub async fn import_archive(
    config: &ImportConfig,
    destination: &dyn Destination,
    events: &EventSink,
) -> Result<ImportReport> {
    config.validate()?;
    let table = config.destination.table_name.as_str();

    let ParsedArchive {
        files,
        records,
        mut degradations,
    } = read_archive(&config.archive, events).await?;
    info!(files = files, listings = records.len(), "Feeds normalized");

    events.progress("Checking destination columns");
    let (mode, reasons) = choose_build_mode(destination, table, config.provision_columns, events)
        .await?
        .into_parts();
    degradations.extend(reasons);
    info!(mode = %mode, "Build mode selected");

    let (rows, dropped) = build_records(&records, mode).into_parts();
    if !dropped.is_empty() {
        warn!(dropped = dropped.len(), "Values left out during coercion");
    }
    degradations.extend(dropped);
    events.progress(format!("Built {} {} record(s)", rows.len(), mode));

    let export = export_records(destination, table, &rows, config.batch_size, events).await;

    Ok(ImportReport {
        files,
        listings: records.len(),
        mode,
        export,
        degradations,
    })
}

/// [`import_archive`] followed by the terminal event
pub async fn run_import(
    config: &ImportConfig,
    destination: &dyn Destination,
    events: &EventSink,
) -> Result<ImportReport> {
    match import_archive(config, destination, events).await {
        Ok(report) => {
            info!(
                success = report.success(),
                created = report.export.created,
                failed = report.export.failed,
                "Import finished"
            );
            events.finished(report.success(), report.summary_message());
            Ok(report)
        },
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "Import aborted");
            events.finished(false, e.to_string());
            Err(e)
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn report(created: usize, failed: usize, mode: BuildMode) -> ImportReport {
        ImportReport {
            files: 2,
            listings: created + failed,
            mode,
            export: ExportReport {
                created,
                failed,
                batches: 1,
                failed_batches: usize::from(failed > 0),
            },
            degradations: Vec::new(),
        }
    }

    #[test]
    fn test_summary_success() {
        let message = report(4, 0, BuildMode::Full).summary_message();
        assert_eq!(message, "Imported 4 of 4 listings from 2 feed file(s)");
    }

    #[test]
    fn test_summary_failure_in_basic_mode() {
        let report = report(20, 5, BuildMode::Basic);
        assert!(!report.success());
        let message = report.summary_message();
        assert!(message.starts_with("Import finished with errors: 20 created, 5 failed"));
        assert!(message.contains("basic records"));
    }
}
