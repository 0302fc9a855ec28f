//! Estatefeed Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error taxonomy, degradation-tagged outcomes and logging setup
//! for the estatefeed workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the fatal failures of an import run ([`ImportError`])
//! - **Outcomes**: values that were produced with a recoverable loss of
//!   quality ([`Outcome`], [`Degradation`])
//! - **Logging**: `tracing` subscriber configuration ([`logging`])
//!
//! # Example
//!
//! ```no_run
//! use estatefeed_common::{Degradation, Outcome, Result};
//!
//! fn decode(raw: &[u8]) -> Result<Outcome<String>> {
//!     match std::str::from_utf8(raw) {
//!         Ok(text) => Ok(Outcome::Complete(text.to_string())),
//!         Err(e) => Ok(Outcome::degraded(
//!             String::from_utf8_lossy(raw).into_owned(),
//!             Degradation::EncodingFallback {
//!                 encoding: "UTF-8".to_string(),
//!                 reason: e.to_string(),
//!             },
//!         )),
//!     }
//! }
//! ```

pub mod error;
pub mod logging;
pub mod outcome;

// Re-export commonly used types
pub use error::{ImportError, Result};
pub use outcome::{Degradation, Outcome};
