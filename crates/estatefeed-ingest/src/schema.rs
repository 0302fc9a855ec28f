//! Required destination schema
//!
//! The column set a destination table must expose for full-mode records,
//! and the mapping from canonical listing fields onto those columns.

use crate::record::ListingField;
use serde::Serialize;
use std::collections::HashSet;

// Columns written outside the field mapping
pub const VISITED_COLUMN: &str = "Visited";
pub const IMAGES_COLUMN: &str = "Images";

// Basic-mode columns
pub const TITLE_COLUMN: &str = "Name";
pub const NOTES_COLUMN: &str = "Notes";
pub const PHOTOS_COLUMN: &str = "Photos";

/// Column type as declared by the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    LongText,
    Number,
    Boolean,
    Attachment,
}

impl FieldType {
    /// Type name understood by the destination API
    pub fn destination_type(&self) -> &'static str {
        match self {
            FieldType::Text => "singleLineText",
            FieldType::LongText => "multilineText",
            FieldType::Number => "number",
            FieldType::Boolean => "checkbox",
            FieldType::Attachment => "multipleAttachments",
        }
    }
}

/// A column the destination must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnRequirement {
    pub name: &'static str,
    pub field_type: FieldType,
}

const fn column(name: &'static str, field_type: FieldType) -> ColumnRequirement {
    ColumnRequirement { name, field_type }
}

pub const REQUIRED_COLUMNS: &[ColumnRequirement] = &[
    column("Property Type", FieldType::Text),
    column("Price", FieldType::Number),
    column("Location", FieldType::LongText),
    column("Description", FieldType::LongText),
    column(VISITED_COLUMN, FieldType::Boolean),
    column("Rooms", FieldType::Number),
    column("Floor", FieldType::Number),
    column("Area", FieldType::Number),
    column("City", FieldType::Text),
    column("District", FieldType::Text),
    column("Street", FieldType::Text),
    column("House Number", FieldType::Text),
    column("Apartment Number", FieldType::Text),
    column("Owner Name", FieldType::Text),
    column("Owner Phone", FieldType::Text),
    column("Agent Name", FieldType::Text),
    column("Property Code", FieldType::Text),
    column("Subject ID", FieldType::Text),
    column("Operation Type", FieldType::Text),
    column("Status", FieldType::Text),
    column("Currency", FieldType::Text),
    column("Total Floors", FieldType::Number),
    column("Kitchen Area", FieldType::Number),
    column("Wall Type", FieldType::Text),
    column("Room Layout", FieldType::Text),
    column("Heating", FieldType::Text),
    column("Bathroom", FieldType::Text),
    column("Balcony", FieldType::Text),
    column("Condition", FieldType::Text),
    column("Window Location", FieldType::Text),
    column("Registration Date", FieldType::Text),
    column("Last Modified", FieldType::Text),
    column("Region", FieldType::Text),
    column("Country", FieldType::Text),
    column(IMAGES_COLUMN, FieldType::Attachment),
];

/// How a canonical value is converted for its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    /// Floating point
    Number,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: ListingField,
    pub column: &'static str,
    pub kind: ValueKind,
}

const fn map(field: ListingField, column: &'static str, kind: ValueKind) -> FieldMapping {
    FieldMapping { field, column, kind }
}

/// Canonical field to destination column, in record-building order
///
/// Canonical fields without an entry (coordinates, for instance) are kept
/// in the canonical record but never exported.
pub const FIELD_COLUMNS: &[FieldMapping] = &[
    map(ListingField::EstateType, "Property Type", ValueKind::Text),
    map(ListingField::Price, "Price", ValueKind::Number),
    map(ListingField::Address, "Location", ValueKind::Text),
    map(ListingField::DescriptionDetail, "Description", ValueKind::Text),
    map(ListingField::RoomQuantity, "Rooms", ValueKind::Integer),
    map(ListingField::Floor, "Floor", ValueKind::Integer),
    map(ListingField::TotalFloorArea, "Area", ValueKind::Number),
    map(ListingField::City, "City", ValueKind::Text),
    map(ListingField::District, "District", ValueKind::Text),
    map(ListingField::Street, "Street", ValueKind::Text),
    map(ListingField::HouseNo, "House Number", ValueKind::Text),
    map(ListingField::FlatNo, "Apartment Number", ValueKind::Text),
    map(ListingField::OwnerName, "Owner Name", ValueKind::Text),
    map(ListingField::OwnerPhone, "Owner Phone", ValueKind::Text),
    map(ListingField::AgentName, "Agent Name", ValueKind::Text),
    map(ListingField::Code, "Property Code", ValueKind::Text),
    map(ListingField::SubjectId, "Subject ID", ValueKind::Text),
    map(ListingField::Operation, "Operation Type", ValueKind::Text),
    map(ListingField::Status, "Status", ValueKind::Text),
    map(ListingField::PriceCurrency, "Currency", ValueKind::Text),
    map(ListingField::NumberOfStoreys, "Total Floors", ValueKind::Integer),
    map(ListingField::KitchenFloorArea, "Kitchen Area", ValueKind::Number),
    map(ListingField::WallingType, "Wall Type", ValueKind::Text),
    map(ListingField::RoomLayout, "Room Layout", ValueKind::Text),
    map(ListingField::HeatSupply, "Heating", ValueKind::Text),
    map(ListingField::Bathroom, "Bathroom", ValueKind::Text),
    map(ListingField::Balcony, "Balcony", ValueKind::Text),
    map(ListingField::Condition, "Condition", ValueKind::Text),
    map(ListingField::WindowLocation, "Window Location", ValueKind::Text),
    map(ListingField::RegistrationDate, "Registration Date", ValueKind::Text),
    map(ListingField::DateChange, "Last Modified", ValueKind::Text),
    map(ListingField::Region, "Region", ValueKind::Text),
    map(ListingField::Country, "Country", ValueKind::Text),
];

pub fn requirement(name: &str) -> Option<&'static ColumnRequirement> {
    REQUIRED_COLUMNS.iter().find(|c| c.name == name)
}

/// Required columns absent from `existing`, in declaration order
///
/// Names are compared exactly; the destination treats column names as
/// case-sensitive.
pub fn missing_columns(existing: &[String]) -> Vec<&'static ColumnRequirement> {
    let existing: HashSet<&str> = existing.iter().map(|s| s.as_str()).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !existing.contains(c.name))
        .collect()
}
