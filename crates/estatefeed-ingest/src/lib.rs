//! Estatefeed Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Imports real-estate listing feeds from a ZIP archive into a destination
//! table.
//!
//! # Pipeline
//!
//! - [`archive`]: validation, scratch directory, extraction
//! - [`locator`]: `.xml` feed discovery
//! - [`encoding`]: byte to UTF-8 text resolution
//! - [`normalize`]: XML tree, listing discovery, canonical [`record`]s
//! - [`coerce`]: destination rows in full or basic mode, per [`schema`]
//! - [`export`]: batched row creation through a [`destination`]
//!
//! [`pipeline`] drives the stages in order and reports through
//! [`progress`].
//!
//! # Example
//!
//! ```no_run
//! use estatefeed_ingest::config::{ArchiveConfig, DestinationConfig, ImportConfig};
//! use estatefeed_ingest::destination::AirtableClient;
//! use estatefeed_ingest::pipeline::run_import;
//! use estatefeed_ingest::progress::EventSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let destination = DestinationConfig::new("patXXXXXXXXXXXXXX", "appXXXXXXXX", "Listings");
//!     let config = ImportConfig::new(ArchiveConfig::new("./feeds.zip"), destination);
//!     let client = AirtableClient::new(&config.destination)?;
//!
//!     let report = run_import(&config, &client, &EventSink::disabled()).await?;
//!     println!("{}", report.summary_message());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod coerce;
pub mod config;
pub mod destination;
pub mod encoding;
pub mod export;
pub mod locator;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod schema;
pub mod xml_tree;

pub use pipeline::{import_archive, read_archive, run_import, ImportReport};
