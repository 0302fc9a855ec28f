//! Batched row export
//!
//! Rows are sent in fixed-size batches, one call per batch, strictly in
//! order. A failed call counts its whole batch as failed and the export
//! moves on; there is no retry and no per-row isolation inside a batch.

use crate::coerce::DestinationRecord;
use crate::destination::{Destination, DestinationError};
use crate::progress::EventSink;
use serde::Serialize;
use tracing::{info, warn};

/// Counts of one export; `created + failed` always equals the rows given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub created: usize,
    pub failed: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

impl ExportReport {
    pub fn total(&self) -> usize {
        self.created + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Send `rows` to `table` in batches of `batch_size`
///
/// A batch whose call succeeds but reports fewer rows than were sent counts
/// the difference as failed.
pub async fn export_records(
    destination: &dyn Destination,
    table: &str,
    rows: &[DestinationRecord],
    batch_size: usize,
    events: &EventSink,
) -> ExportReport {
    let mut report = ExportReport::default();
    let batch_size = batch_size.max(1);
    let total_batches = rows.len().div_ceil(batch_size);

    for (index, batch) in rows.chunks(batch_size).enumerate() {
        let number = index + 1;
        report.batches += 1;

        match destination.create_rows(table, batch).await {
            Ok(created) => {
                let accepted = created.len().min(batch.len());
                report.created += accepted;
                report.failed += batch.len() - accepted;
                if accepted < batch.len() {
                    warn!(batch = number, sent = batch.len(), accepted = accepted, "Batch partially accepted");
                }
            },
            Err(e) => {
                report.failed += batch.len();
                report.failed_batches += 1;
                log_batch_failure(number, batch.len(), &e);
            },
        }

        events.progress(format!(
            "Exported batch {}/{} ({} created, {} failed)",
            number, total_batches, report.created, report.failed
        ));
    }

    info!(
        created = report.created,
        failed = report.failed,
        batches = report.batches,
        failed_batches = report.failed_batches,
        "Export finished"
    );
    report
}

fn log_batch_failure(batch: usize, rows: usize, error: &DestinationError) {
    warn!(batch = batch, rows = rows, error = %error, "Batch rejected, counting its rows as failed");
}
