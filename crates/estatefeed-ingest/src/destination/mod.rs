//! Destination table service
//!
//! The pipeline only needs three remote operations. Each one may fail on
//! its own, and the pipeline decides per call site whether that is fatal.

pub mod airtable;

pub use airtable::AirtableClient;

use crate::coerce::DestinationRecord;
use crate::schema::ColumnRequirement;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("access token rejected")]
    Unauthorized,

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("destination returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl DestinationError {
    /// Errors that make any further call pointless
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DestinationError::Http(_) | DestinationError::Unauthorized | DestinationError::TableNotFound(_)
        )
    }
}

/// A row the destination accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRow {
    pub id: String,
}

#[async_trait]
pub trait Destination: Send + Sync {
    /// Names of the columns the table currently has
    async fn list_columns(&self, table: &str) -> Result<Vec<String>, DestinationError>;

    /// Create one column
    ///
    /// `Ok(false)` means the destination cannot create columns for this
    /// caller; that is an expected answer, not an error.
    async fn create_column(&self, table: &str, column: &ColumnRequirement) -> Result<bool, DestinationError>;

    /// Create rows in one call; the whole call fails or succeeds
    async fn create_rows(
        &self,
        table: &str,
        rows: &[DestinationRecord],
    ) -> Result<Vec<CreatedRow>, DestinationError>;
}
