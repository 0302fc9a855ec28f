//! Destination record building
//!
//! One build mode is chosen per run. Full mode writes every mapped field,
//! coerced to its column type. Basic mode is the fallback for destinations
//! that lack the required columns: a title, a labelled description, the
//! visited flag and the photos.
//!
//! A value that does not coerce is left out of the row and reported as a
//! [`Degradation::FieldDropped`]; building never fails.

use crate::record::{ListingField, ListingRecord};
use crate::schema::{
    ValueKind, FIELD_COLUMNS, IMAGES_COLUMN, NOTES_COLUMN, PHOTOS_COLUMN, TITLE_COLUMN, VISITED_COLUMN,
};
use estatefeed_common::{Degradation, Outcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Full,
    Basic,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Full => f.write_str("full"),
            BuildMode::Basic => f.write_str("basic"),
        }
    }
}

/// A value already converted to its column's type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    /// Photo references, file names or URLs
    Attachments(Vec<String>),
}

/// One destination row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DestinationRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl DestinationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: FieldValue) {
        self.fields.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// Value coercion
// ============================================================================

/// Remove a thousands separator; every group after the first must have three digits
fn strip_grouping(integer: &str, separator: char) -> Option<String> {
    let mut groups = integer.split(separator);
    let mut text = groups.next().filter(|first| !first.is_empty())?.to_string();
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.push_str(group);
    }
    Some(text)
}

/// Canonical numeric text: "1 200,50" -> "1200.50", "1,200" -> "1200"
///
/// A comma is a decimal separator when it is the only one and one or two
/// digits follow it. Otherwise commas must group thousands. When both a
/// comma and a dot appear, the later one is the decimal separator.
fn numeric_text(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    match (compact.rfind(','), compact.rfind('.')) {
        (None, _) => Some(compact),
        (Some(comma), Some(dot)) if dot > comma => {
            Some(strip_grouping(&compact[..dot], ',')? + &compact[dot..])
        },
        (Some(comma), Some(_)) => {
            let fraction = &compact[comma + 1..];
            Some(format!("{}.{}", strip_grouping(&compact[..comma], '.')?, fraction))
        },
        (Some(comma), None) => {
            let fraction = &compact[comma + 1..];
            let decimal = compact.matches(',').count() == 1
                && (1..=2).contains(&fraction.len())
                && fraction.bytes().all(|b| b.is_ascii_digit());
            if decimal {
                Some(compact.replacen(',', ".", 1))
            } else {
                strip_grouping(&compact, ',')
            }
        },
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    numeric_text(raw)?.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integers also accept a float with no fractional part ("3.0")
pub fn parse_integer(raw: &str) -> Option<i64> {
    let text = numeric_text(raw)?;
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    let n = text.parse::<f64>().ok()?;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Convert raw text for a column of the given kind; `None` if it does not parse
pub fn coerce_value(raw: &str, kind: ValueKind) -> Option<FieldValue> {
    match kind {
        ValueKind::Text => Some(FieldValue::Text(raw.to_string())),
        ValueKind::Number => parse_number(raw).map(FieldValue::Number),
        ValueKind::Integer => parse_integer(raw).map(FieldValue::Integer),
        ValueKind::Boolean => parse_boolean(raw).map(FieldValue::Boolean),
    }
}

fn photo_list(record: &ListingRecord) -> Option<FieldValue> {
    if record.photos.is_empty() {
        return None;
    }
    Some(FieldValue::Attachments(
        record.photos.iter().map(|p| p.filename.clone()).collect(),
    ))
}

// ============================================================================
// Builders
// ============================================================================

/// Every mapped field, coerced per column, plus visited flag and images
pub fn build_full_record(record: &ListingRecord) -> Outcome<DestinationRecord> {
    let mut row = DestinationRecord::new();
    let mut dropped = Vec::new();

    row.insert(VISITED_COLUMN, FieldValue::Boolean(false));

    for mapping in FIELD_COLUMNS {
        let Some(raw) = record.get(mapping.field) else {
            continue;
        };
        match coerce_value(raw, mapping.kind) {
            Some(value) => row.insert(mapping.column, value),
            None => dropped.push(Degradation::FieldDropped {
                column: mapping.column.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    if let Some(photos) = photo_list(record) {
        row.insert(IMAGES_COLUMN, photos);
    }

    Outcome::from_parts(row, dropped)
}

const DESCRIPTION_LABELS: &[(ListingField, &str)] = &[
    (ListingField::EstateType, "Type"),
    (ListingField::Price, "Price"),
    (ListingField::Address, "Address"),
    (ListingField::RoomQuantity, "Rooms"),
    (ListingField::TotalFloorArea, "Area"),
    (ListingField::OwnerName, "Owner"),
    (ListingField::OwnerPhone, "Phone"),
    (ListingField::AgentName, "Agent"),
    (ListingField::DescriptionDetail, "Description"),
];

/// Labelled summary lines, skipping absent fields
pub fn describe(record: &ListingRecord) -> String {
    let mut lines = Vec::new();
    for (field, label) in DESCRIPTION_LABELS {
        let Some(value) = record.get(*field) else {
            continue;
        };
        let line = match field {
            ListingField::Price => match record.get(ListingField::PriceCurrency) {
                Some(currency) => format!("{}: {} {}", label, value, currency),
                None => format!("{}: {}", label, value),
            },
            ListingField::TotalFloorArea => format!("{}: {} m²", label, value),
            _ => format!("{}: {}", label, value),
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Title, description, visited flag and photos only
pub fn build_basic_record(record: &ListingRecord) -> DestinationRecord {
    let mut row = DestinationRecord::new();

    let estate_type = record.get(ListingField::EstateType).unwrap_or_default();
    let address = record.get(ListingField::Address).unwrap_or_default();
    row.insert(TITLE_COLUMN, FieldValue::Text(format!("{} - {}", estate_type, address)));
    row.insert(NOTES_COLUMN, FieldValue::Text(describe(record)));
    row.insert(VISITED_COLUMN, FieldValue::Boolean(false));

    if let Some(photos) = photo_list(record) {
        row.insert(PHOTOS_COLUMN, photos);
    }
    row
}

/// Build every record in the given mode, collecting dropped values
pub fn build_records(records: &[ListingRecord], mode: BuildMode) -> Outcome<Vec<DestinationRecord>> {
    let mut rows = Vec::with_capacity(records.len());
    let mut reasons = Vec::new();

    for record in records {
        match mode {
            BuildMode::Full => {
                let (row, dropped) = build_full_record(record).into_parts();
                rows.push(row);
                reasons.extend(dropped);
            },
            BuildMode::Basic => rows.push(build_basic_record(record)),
        }
    }

    Outcome::from_parts(rows, reasons)
}
