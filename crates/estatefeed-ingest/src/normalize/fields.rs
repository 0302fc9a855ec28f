//! Source key dictionary
//!
//! Feeds spell the same field in many ways: legacy lower-case tags, the
//! current upper-case export format, and the hyphenated tags of some vendor
//! exports. [`FIELD_ALIASES`] is applied top to bottom and a later entry
//! overwrites an earlier one for the same canonical field, so the upper-case
//! spellings at the end take precedence when a listing carries several.

use crate::record::{ListingField, ListingRecord};
use crate::xml_tree::TEXT_KEY;
use serde_json::{Map, Value};

use ListingField::*;

pub const FIELD_ALIASES: &[(&str, ListingField)] = &[
    // legacy lower-case
    ("type", EstateType),
    ("price", Price),
    ("currency", PriceCurrency),
    ("address", Address),
    ("description", DescriptionDetail),
    ("rooms", RoomQuantity),
    ("floor", Floor),
    ("floors", NumberOfStoreys),
    ("area", TotalFloorArea),
    ("kitchen_area", KitchenFloorArea),
    ("city", City),
    ("district", District),
    ("street", Street),
    ("house", HouseNo),
    ("apartment", FlatNo),
    ("owner", OwnerName),
    ("phone", OwnerPhone),
    ("agent", AgentName),
    ("code", Code),
    ("id", SubjectId),
    ("operation", Operation),
    ("status", Status),
    ("wall_type", WallingType),
    ("room_layout", RoomLayout),
    ("heating", HeatSupply),
    ("bathroom", Bathroom),
    ("balcony", Balcony),
    ("condition", Condition),
    ("windows", WindowLocation),
    ("date", RegistrationDate),
    ("modified", DateChange),
    ("region", Region),
    ("country", Country),
    ("latitude", Latitude),
    ("longitude", Longitude),
    // vendor exports
    ("category", EstateType),
    ("deal-type", Operation),
    ("internal-id", SubjectId),
    ("rooms-total", RoomQuantity),
    ("floors-total", NumberOfStoreys),
    ("kitchen-space", KitchenFloorArea),
    ("locality-name", City),
    ("sub-locality-name", District),
    ("building-type", WallingType),
    ("creation-date", RegistrationDate),
    ("last-update-date", DateChange),
    // canonical names used verbatim
    ("estate_type", EstateType),
    ("price_currency", PriceCurrency),
    ("description_detail", DescriptionDetail),
    ("room_quantity", RoomQuantity),
    ("number_of_storeys", NumberOfStoreys),
    ("total_floor_area", TotalFloorArea),
    ("kitchen_floor_area", KitchenFloorArea),
    ("house_no", HouseNo),
    ("flat_no", FlatNo),
    ("owner_name", OwnerName),
    ("owner_phone", OwnerPhone),
    ("agent_name", AgentName),
    ("subject_id", SubjectId),
    ("walling_type", WallingType),
    ("heat_supply", HeatSupply),
    ("window_location", WindowLocation),
    ("registration_date", RegistrationDate),
    ("date_change", DateChange),
    // current upper-case
    ("ESTATE_TYPE", EstateType),
    ("PRICE", Price),
    ("PRICE_CURRENCY", PriceCurrency),
    ("ADDRESS", Address),
    ("DESCRIPTION_DETAIL", DescriptionDetail),
    ("ROOM_QUANTITY", RoomQuantity),
    ("FLOOR", Floor),
    ("NUMBER_OF_STOREYS", NumberOfStoreys),
    ("TOTAL_FLOOR_AREA", TotalFloorArea),
    ("KITCHEN_FLOOR_AREA", KitchenFloorArea),
    ("CITY", City),
    ("DISTRICT", District),
    ("STREET", Street),
    ("HOUSE_NO", HouseNo),
    ("FLAT_NO", FlatNo),
    ("LATITUDE", Latitude),
    ("LONGITUDE", Longitude),
    ("OWNER_NAME", OwnerName),
    ("OWNER_PHONE", OwnerPhone),
    ("AGENT_NAME", AgentName),
    ("CODE", Code),
    ("SUBJECT_ID", SubjectId),
    ("OPERATION", Operation),
    ("STATUS", Status),
    ("WALLING_TYPE", WallingType),
    ("ROOM_LAYOUT", RoomLayout),
    ("HEAT_SUPPLY", HeatSupply),
    ("BATHROOM", Bathroom),
    ("BALCONY", Balcony),
    ("CONDITION", Condition),
    ("WINDOW_LOCATION", WindowLocation),
    ("REGISTRATION_DATE", RegistrationDate),
    ("DATE_CHANGE", DateChange),
    ("REGION", Region),
    ("COUNTRY", Country),
];

/// Contact blocks: (key, field for the name, field for the phone)
const CONTACT_BLOCKS: &[(&str, ListingField, Option<ListingField>)] = &[
    ("owner", OwnerName, Some(OwnerPhone)),
    ("OWNER", OwnerName, Some(OwnerPhone)),
    ("agent", AgentName, None),
    ("AGENT", AgentName, None),
    ("sales-agent", AgentName, None),
];

/// Blocks whose children use the same dictionary as the listing itself
const LOCATION_BLOCKS: &[&str] = &["location", "LOCATION"];

fn get_any<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

/// `YYYY-MM-DD` from an object with year, month and day parts
fn date_from_parts(map: &Map<String, Value>) -> Option<String> {
    let part = |keys: &[&str]| -> Option<u32> {
        get_any(map, keys).and_then(value_text)?.parse().ok()
    };
    let year = part(&["year", "YEAR"])?;
    let month = part(&["month", "MONTH"])?;
    let day = part(&["day", "DAY"])?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// Scalar text of a tree value, or `None` when there is nothing usable
///
/// Objects yield their date parts, their own text, or a `value` child, in
/// that order. Arrays yield their first usable element.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        },
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => date_from_parts(map)
            .or_else(|| map.get(TEXT_KEY).and_then(value_text))
            .or_else(|| get_any(map, &["value", "VALUE"]).and_then(value_text)),
        Value::Array(items) => items.iter().find_map(value_text),
        Value::Null => None,
    }
}

fn apply_dictionary(map: &Map<String, Value>, record: &mut ListingRecord) {
    for (key, field) in FIELD_ALIASES {
        if let Some(text) = map.get(*key).and_then(value_text) {
            record.set(*field, text);
        }
    }
}

fn apply_contacts(map: &Map<String, Value>, record: &mut ListingRecord) {
    for (key, name_field, phone_field) in CONTACT_BLOCKS {
        let Some(Value::Object(contact)) = map.get(*key) else {
            continue;
        };
        if let Some(name) = get_any(contact, &["name", "NAME"]).and_then(value_text) {
            record.set(*name_field, name);
        }
        if let Some(phone_field) = phone_field {
            if let Some(phone) = get_any(contact, &["phone", "PHONE"]).and_then(value_text) {
                record.set(*phone_field, phone);
            }
        }
    }
}

/// Map one listing object onto canonical fields
///
/// Nested location and contact blocks go first so that direct keys on the
/// listing overwrite them.
pub fn extract_fields(map: &Map<String, Value>, record: &mut ListingRecord) {
    for key in LOCATION_BLOCKS {
        if let Some(Value::Object(location)) = map.get(*key) {
            apply_dictionary(location, record);
        }
    }
    apply_contacts(map, record);
    apply_dictionary(map, record);

    // <price currency="UAH">...</price> or <price><value/><currency/></price>
    if let Some(Value::Object(price)) = get_any(map, &["price", "PRICE"]) {
        if let Some(currency) = get_any(price, &["currency", "CURRENCY"]).and_then(value_text) {
            record.set_if_absent(PriceCurrency, currency);
        }
    }
}
