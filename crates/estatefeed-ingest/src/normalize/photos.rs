//! Photo references
//!
//! Photos show up as a `photos` container holding one or many `photo`
//! items, as bare `photo`/`image` tags on the listing, or as plain lists of
//! URLs. Items are either strings or objects carrying a URL or file name
//! plus optional ordering metadata.

use super::fields::value_text;
use crate::record::PhotoReference;
use crate::xml_tree::TEXT_KEY;
use serde_json::{Map, Value};

const CONTAINER_KEYS: &[&str] = &["photos", "PHOTOS", "images", "IMAGES"];
const ITEM_KEYS: &[&str] = &["photo", "PHOTO", "image", "IMAGE"];

const REFERENCE_KEYS: &[&str] = &["url", "URL", "filename", "FILENAME", "file", "FILE", "src", TEXT_KEY];
const ORDINAL_KEYS: &[&str] = &["ordinal", "ORDINAL", "order", "ORDER", "position"];
const NOTE_KEYS: &[&str] = &["note", "NOTE", "description", "DESCRIPTION"];
const PRIMARY_KEYS: &[&str] = &["primary", "PRIMARY", "is_primary", "IS_PRIMARY", "main"];

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(value_text))
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn photo_from_value(value: &Value) -> Option<PhotoReference> {
    match value {
        Value::Object(map) => {
            let mut photo = PhotoReference::new(first_text(map, REFERENCE_KEYS)?);
            photo.ordinal = first_text(map, ORDINAL_KEYS).and_then(|s| s.parse().ok());
            photo.note = first_text(map, NOTE_KEYS);
            photo.is_primary = first_text(map, PRIMARY_KEYS).and_then(|s| parse_flag(&s));
            Some(photo)
        },
        other => value_text(other).map(PhotoReference::new),
    }
}

/// Items of a photo node, which may be one item or a list of them
fn push_items(node: &Value, photos: &mut Vec<PhotoReference>) {
    match node {
        Value::Array(items) => {
            for item in items {
                push_items(item, photos);
            }
        },
        other => {
            if let Some(photo) = photo_from_value(other) {
                if !photos.iter().any(|p| p.filename == photo.filename) {
                    photos.push(photo);
                }
            }
        },
    }
}

/// Ordered photo references of one listing
///
/// Photos with an ordinal are placed by it; the rest keep document order
/// after them.
pub fn extract_photos(listing: &Map<String, Value>) -> Vec<PhotoReference> {
    let mut photos = Vec::new();

    for key in CONTAINER_KEYS {
        match listing.get(*key) {
            Some(Value::Object(container)) if ITEM_KEYS.iter().any(|k| container.contains_key(*k)) => {
                for item_key in ITEM_KEYS {
                    if let Some(items) = container.get(*item_key) {
                        push_items(items, &mut photos);
                    }
                }
            },
            Some(node) => push_items(node, &mut photos),
            None => {},
        }
    }

    for key in ITEM_KEYS {
        if let Some(items) = listing.get(*key) {
            push_items(items, &mut photos);
        }
    }

    photos.sort_by_key(|p| p.ordinal.unwrap_or(u32::MAX));
    photos
}
