//! Locating listing subtrees
//!
//! Known layouts are tried first as dotted element paths. When none of them
//! matches, the whole tree is scanned for anything shaped like a listing.
//! The scan favors recall: on unusual documents it can return subtrees that
//! are not really listings, and that is accepted.

use serde_json::{Map, Value};

/// Known listing locations, most specific layout first
pub const SCHEMA_PATHS: &[&str] = &[
    "realty_feed.offers.offer",
    "realty_feed.offer",
    "realty-feed.offer",
    "offers.offer",
    "listings.listing",
    "data.offer",
    "root.offer",
    "offer",
];

/// Keys whose presence makes an object a listing candidate during the scan
const SIGNAL_KEYS: &[&str] = &["type", "estate_type", "price", "address"];

/// Where the listings of a document were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    KnownPath(&'static str),
    Scan,
}

/// Child lookup; exact name first, then ASCII case-insensitive
fn child<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

/// Follow a dotted path through nested objects
///
/// Arrays are not traversed; a path step only descends into an object.
pub fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(tree, |node, key| match node {
        Value::Object(map) => child(map, key),
        _ => None,
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Treat a path hit as a sequence; a single value is a one-element sequence
fn as_sequence(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// First known path with a non-empty hit
pub fn probe_known_paths(tree: &Value) -> Option<(&'static str, Vec<&Value>)> {
    SCHEMA_PATHS.iter().find_map(|path| {
        lookup(tree, path)
            .filter(|value| is_present(value))
            .map(|value| (*path, as_sequence(value)))
    })
}

fn is_signal_key(key: &str) -> bool {
    SIGNAL_KEYS.iter().any(|signal| key.eq_ignore_ascii_case(signal))
}

fn is_listing_shaped(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| is_signal_key(key))
}

/// Every listing-shaped object in document order
///
/// The scan keeps descending below a matched object, so a wrapper carrying
/// a `type` of its own does not hide the listings inside it. Values held
/// under the signal keys themselves are not searched, which keeps a price
/// block with its own `type` attribute from being reported a second time.
pub fn scan_for_listings(tree: &Value) -> Vec<&Value> {
    let mut found = Vec::new();
    collect(tree, &mut found);
    found
}

fn collect<'a>(node: &'a Value, found: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            let matched = is_listing_shaped(map);
            if matched {
                found.push(node);
            }
            for (key, value) in map {
                if matched && is_signal_key(key) {
                    continue;
                }
                collect(value, found);
            }
        },
        Value::Array(items) => {
            for item in items {
                collect(item, found);
            }
        },
        _ => {},
    }
}

/// Candidate listing subtrees and how they were found
pub fn locate_listings(tree: &Value) -> (ListingSource, Vec<&Value>) {
    match probe_known_paths(tree) {
        Some((path, listings)) => (ListingSource::KnownPath(path), listings),
        None => (ListingSource::Scan, scan_for_listings(tree)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_and_case_insensitive() {
        let tree = json!({"REALTY_FEED": {"Offer": {"price": "1"}}});
        assert_eq!(lookup(&tree, "realty_feed.offer"), Some(&json!({"price": "1"})));
        assert_eq!(lookup(&tree, "realty_feed.offers.offer"), None);
    }

    #[test]
    fn test_lookup_does_not_enter_arrays() {
        let tree = json!({"data": [{"offer": {"price": "1"}}]});
        assert_eq!(lookup(&tree, "data.offer"), None);
    }

    #[test]
    fn test_most_specific_path_wins() {
        let tree = json!({"realty_feed": {
            "offers": {"offer": [{"price": "1"}, {"price": "2"}]},
            "offer": {"price": "3"}
        }});
        let (path, listings) = probe_known_paths(&tree).unwrap();
        assert_eq!(path, "realty_feed.offers.offer");
        assert_eq!(listings.len(), 2);
    }

    #[test]
    fn test_scalar_hit_is_single_element() {
        let tree = json!({"offer": "just text"});
        let (_, listings) = probe_known_paths(&tree).unwrap();
        assert_eq!(listings, vec![&json!("just text")]);
    }

    #[test]
    fn test_empty_hit_is_skipped() {
        let tree = json!({"offers": {"offer": ""}});
        assert!(probe_known_paths(&tree).is_none());
    }

    #[test]
    fn test_scan_finds_listing_shaped_objects() {
        let tree = json!({"export": {
            "meta": {"generated": "2024-01-01"},
            "block": [
                {"item": {"TYPE": "flat", "price": {"type": "sale", "_text": "10"}}},
                {"item": {"ADDRESS": "Kyiv"}}
            ]
        }});

        let (source, listings) = locate_listings(&tree);
        assert_eq!(source, ListingSource::Scan);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1], &json!({"ADDRESS": "Kyiv"}));
    }

    #[test]
    fn test_scan_descends_below_typed_wrapper() {
        let tree = json!({"export": {"listings_block": {
            "type": "sale",
            "offer": [
                {"price": "100", "city": "A"},
                {"price": {"currency": "UAH", "type": "fixed", "_text": "200"}, "city": "B"}
            ]
        }}});

        let listings = scan_for_listings(&tree);
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[1]["city"], "A");
        assert_eq!(listings[2]["city"], "B");
    }

    #[test]
    fn test_scan_of_document_without_listings() {
        let tree = json!({"catalog": {"book": {"title": "x"}}});
        assert!(scan_for_listings(&tree).is_empty());
    }
}
