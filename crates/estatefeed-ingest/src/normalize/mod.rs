//! Feed normalization
//!
//! Turns the text of one feed file into canonical [`ListingRecord`]s:
//! parse into a generic tree, locate the listing subtrees, map their keys
//! through the field dictionary, collect photos, then apply the record
//! invariants.

pub mod fields;
pub mod paths;
pub mod photos;

pub use paths::{ListingSource, SCHEMA_PATHS};

use crate::record::ListingRecord;
use crate::xml_tree::{parse_tree, TreeError};
use serde_json::Value;
use tracing::debug;

/// Listings recovered from one feed document
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeed {
    pub records: Vec<ListingRecord>,
    /// Listing-shaped subtrees found, including ones that yielded no fields
    pub candidates: usize,
    pub source: ListingSource,
}

/// Convert one listing subtree; `None` when it has no usable fields
pub fn listing_from_value(value: &Value) -> Option<ListingRecord> {
    let Value::Object(map) = value else {
        return None;
    };

    let mut record = ListingRecord::new();
    fields::extract_fields(map, &mut record);
    if record.field_count() == 0 {
        return None;
    }
    record.photos = photos::extract_photos(map);
    record.enforce_invariants();
    Some(record)
}

/// Normalize an already parsed tree
pub fn normalize_tree(tree: &Value) -> NormalizedFeed {
    let (source, candidates) = paths::locate_listings(tree);
    let records: Vec<ListingRecord> = candidates.iter().filter_map(|c| listing_from_value(c)).collect();

    debug!(
        source = ?source,
        candidates = candidates.len(),
        records = records.len(),
        "Normalized feed"
    );

    NormalizedFeed {
        records,
        candidates: candidates.len(),
        source,
    }
}

/// Parse and normalize the text of one feed file
pub fn normalize_feed(text: &str) -> Result<NormalizedFeed, TreeError> {
    let tree = parse_tree(text)?;
    Ok(normalize_tree(&tree))
}
