//! Canonical listing record

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Fallback when a listing names no estate type
pub const DEFAULT_ESTATE_TYPE: &str = "Real estate";

/// Fallback when no address can be assembled from the listing
pub const DEFAULT_ADDRESS: &str = "Address not specified";

/// Canonical vocabulary shared by every feed layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    EstateType,
    Price,
    PriceCurrency,
    Address,
    DescriptionDetail,
    RoomQuantity,
    Floor,
    NumberOfStoreys,
    TotalFloorArea,
    KitchenFloorArea,
    City,
    District,
    Street,
    HouseNo,
    FlatNo,
    Latitude,
    Longitude,
    OwnerName,
    OwnerPhone,
    AgentName,
    Code,
    SubjectId,
    Operation,
    Status,
    WallingType,
    RoomLayout,
    HeatSupply,
    Bathroom,
    Balcony,
    Condition,
    WindowLocation,
    RegistrationDate,
    DateChange,
    Region,
    Country,
}

impl ListingField {
    pub const ALL: [ListingField; 35] = [
        ListingField::EstateType,
        ListingField::Price,
        ListingField::PriceCurrency,
        ListingField::Address,
        ListingField::DescriptionDetail,
        ListingField::RoomQuantity,
        ListingField::Floor,
        ListingField::NumberOfStoreys,
        ListingField::TotalFloorArea,
        ListingField::KitchenFloorArea,
        ListingField::City,
        ListingField::District,
        ListingField::Street,
        ListingField::HouseNo,
        ListingField::FlatNo,
        ListingField::Latitude,
        ListingField::Longitude,
        ListingField::OwnerName,
        ListingField::OwnerPhone,
        ListingField::AgentName,
        ListingField::Code,
        ListingField::SubjectId,
        ListingField::Operation,
        ListingField::Status,
        ListingField::WallingType,
        ListingField::RoomLayout,
        ListingField::HeatSupply,
        ListingField::Bathroom,
        ListingField::Balcony,
        ListingField::Condition,
        ListingField::WindowLocation,
        ListingField::RegistrationDate,
        ListingField::DateChange,
        ListingField::Region,
        ListingField::Country,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingField::EstateType => "estate_type",
            ListingField::Price => "price",
            ListingField::PriceCurrency => "price_currency",
            ListingField::Address => "address",
            ListingField::DescriptionDetail => "description_detail",
            ListingField::RoomQuantity => "room_quantity",
            ListingField::Floor => "floor",
            ListingField::NumberOfStoreys => "number_of_storeys",
            ListingField::TotalFloorArea => "total_floor_area",
            ListingField::KitchenFloorArea => "kitchen_floor_area",
            ListingField::City => "city",
            ListingField::District => "district",
            ListingField::Street => "street",
            ListingField::HouseNo => "house_no",
            ListingField::FlatNo => "flat_no",
            ListingField::Latitude => "latitude",
            ListingField::Longitude => "longitude",
            ListingField::OwnerName => "owner_name",
            ListingField::OwnerPhone => "owner_phone",
            ListingField::AgentName => "agent_name",
            ListingField::Code => "code",
            ListingField::SubjectId => "subject_id",
            ListingField::Operation => "operation",
            ListingField::Status => "status",
            ListingField::WallingType => "walling_type",
            ListingField::RoomLayout => "room_layout",
            ListingField::HeatSupply => "heat_supply",
            ListingField::Bathroom => "bathroom",
            ListingField::Balcony => "balcony",
            ListingField::Condition => "condition",
            ListingField::WindowLocation => "window_location",
            ListingField::RegistrationDate => "registration_date",
            ListingField::DateChange => "date_change",
            ListingField::Region => "region",
            ListingField::Country => "country",
        }
    }
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A photo catalogued by name or URL; the binary is never fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoReference {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}

impl PhotoReference {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ordinal: None,
            note: None,
            is_primary: None,
        }
    }
}

/// One listing in canonical form
///
/// Absent keys are simply not present; values are never empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingRecord {
    #[serde(flatten)]
    fields: BTreeMap<ListingField, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<PhotoReference>,
}

impl ListingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ListingField) -> Option<&str> {
        self.fields.get(&field).map(|s| s.as_str())
    }

    /// Store a trimmed value, replacing any earlier one; blank values are ignored
    pub fn set(&mut self, field: ListingField, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.fields.insert(field, value.to_string());
        }
    }

    /// Store a value only when the field is still absent
    pub fn set_if_absent(&mut self, field: ListingField, value: impl AsRef<str>) {
        if !self.fields.contains_key(&field) {
            self.set(field, value);
        }
    }

    pub fn contains(&self, field: ListingField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fill in the estate type and address when the source did not provide them
    pub fn enforce_invariants(&mut self) {
        if !self.contains(ListingField::EstateType) {
            self.set(ListingField::EstateType, DEFAULT_ESTATE_TYPE);
        }

        if !self.contains(ListingField::Address) {
            let parts: Vec<&str> = [ListingField::City, ListingField::Street, ListingField::HouseNo]
                .into_iter()
                .filter_map(|field| self.get(field))
                .collect();
            let address = if parts.is_empty() {
                DEFAULT_ADDRESS.to_string()
            } else {
                parts.join(", ")
            };
            self.set(ListingField::Address, address);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_not_stored() {
        let mut record = ListingRecord::new();
        record.set(ListingField::City, "   ");
        assert!(!record.contains(ListingField::City));

        record.set(ListingField::City, " Kharkiv ");
        assert_eq!(record.get(ListingField::City), Some("Kharkiv"));
    }

    #[test]
    fn test_set_if_absent_keeps_first() {
        let mut record = ListingRecord::new();
        record.set_if_absent(ListingField::PriceCurrency, "UAH");
        record.set_if_absent(ListingField::PriceCurrency, "USD");
        assert_eq!(record.get(ListingField::PriceCurrency), Some("UAH"));
    }

    #[test]
    fn test_invariants_on_empty_record() {
        let mut record = ListingRecord::new();
        record.enforce_invariants();
        assert_eq!(record.get(ListingField::EstateType), Some(DEFAULT_ESTATE_TYPE));
        assert_eq!(record.get(ListingField::Address), Some(DEFAULT_ADDRESS));
    }

    #[test]
    fn test_address_synthesized_from_parts() {
        let mut record = ListingRecord::new();
        record.set(ListingField::City, "Київ");
        record.set(ListingField::HouseNo, "12");
        record.enforce_invariants();
        assert_eq!(record.get(ListingField::Address), Some("Київ, 12"));
    }

    #[test]
    fn test_existing_address_kept() {
        let mut record = ListingRecord::new();
        record.set(ListingField::Address, "вул. Шевченка 5");
        record.set(ListingField::City, "Львів");
        record.enforce_invariants();
        assert_eq!(record.get(ListingField::Address), Some("вул. Шевченка 5"));
    }

    #[test]
    fn test_serializes_flat_with_snake_keys() {
        let mut record = ListingRecord::new();
        record.set(ListingField::EstateType, "flat");
        record.set(ListingField::RoomQuantity, "2");
        record.photos.push(PhotoReference::new("1.jpg"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["estate_type"], "flat");
        assert_eq!(json["room_quantity"], "2");
        assert_eq!(json["photos"][0]["filename"], "1.jpg");
        assert!(json["photos"][0].get("ordinal").is_none());
    }

    #[test]
    fn test_as_str_matches_serde_name() {
        for field in ListingField::ALL {
            assert_eq!(serde_json::to_value(field).unwrap(), field.as_str());
        }
    }
}
