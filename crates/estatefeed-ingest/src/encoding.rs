//! Feed text encoding resolution
//!
//! Feeds arrive from several listing systems, most of them Cyrillic, and a
//! fair share of them in legacy single-byte code pages. The resolver picks
//! an encoding in this order:
//!
//! 1. the `encoding` of the XML declaration, when encoding_rs knows the label
//! 2. the bytes are already valid UTF-8
//! 3. read as windows-1251, the text contains a run of Cyrillic letters
//! 4. read as windows-1252, the text contains accented Latin letters
//! 5. lossy UTF-8
//!
//! This is an approximation tuned for the feeds we see, not a general
//! charset detector. A declared encoding that fails to convert falls back
//! to lossy UTF-8 and the result is marked degraded; it never aborts a run.

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1251, WINDOWS_1252};
use estatefeed_common::{Degradation, Outcome};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How many leading bytes are inspected for an XML declaration
const DECLARATION_WINDOW: usize = 512;

/// How the encoding of a feed was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Declared,
    Utf8,
    Cyrillic,
    Latin,
    Fallback,
}

/// Feed text converted to UTF-8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFeed {
    pub text: String,
    /// Name of the source encoding, e.g. "windows-1251"
    pub encoding: &'static str,
    pub detection: Detection,
}

/// Encoding named by the XML declaration, if the label is recognized
pub fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let head = &head[..head.len().min(DECLARATION_WINDOW)];

    let mut reader = Reader::from_reader(head);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => {
                let label = decl.encoding()?.ok()?;
                let encoding = Encoding::for_label(label.as_ref())?;
                // A declaration readable as ASCII cannot be UTF-16, and the
                // replacement encoding would discard the whole document.
                if encoding == UTF_16LE || encoding == UTF_16BE || encoding == REPLACEMENT {
                    return None;
                }
                return Some(encoding);
            },
            Ok(Event::Comment(_)) | Ok(Event::Text(_)) | Ok(Event::PI(_)) => buf.clear(),
            _ => return None,
        }
    }
}

/// Decode one feed file's bytes to UTF-8 text
pub fn decode_feed(bytes: &[u8]) -> Outcome<DecodedFeed> {
    if let Some(encoding) = declared_encoding(bytes).filter(|e| *e != UTF_8) {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if !had_errors {
            debug!(encoding = encoding.name(), "Decoded feed using declared encoding");
            return Outcome::Complete(DecodedFeed {
                text: text.into_owned(),
                encoding: encoding.name(),
                detection: Detection::Declared,
            });
        }

        warn!(encoding = encoding.name(), "Declared encoding failed to convert, reading as UTF-8");
        return Outcome::degraded(
            DecodedFeed {
                text: String::from_utf8_lossy(bytes).into_owned(),
                encoding: UTF_8.name(),
                detection: Detection::Fallback,
            },
            Degradation::EncodingFallback {
                encoding: encoding.name().to_string(),
                reason: "byte sequence not valid in declared encoding".to_string(),
            },
        );
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Outcome::Complete(DecodedFeed {
            text: text.to_string(),
            encoding: UTF_8.name(),
            detection: Detection::Utf8,
        });
    }

    let (cyrillic, _) = WINDOWS_1251.decode_without_bom_handling(bytes);
    if has_cyrillic_run(&cyrillic) {
        debug!("Detected Cyrillic single-byte feed");
        return Outcome::Complete(DecodedFeed {
            text: cyrillic.into_owned(),
            encoding: WINDOWS_1251.name(),
            detection: Detection::Cyrillic,
        });
    }

    let (latin, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if has_accented_latin(&latin) {
        debug!("Detected Latin single-byte feed");
        return Outcome::Complete(DecodedFeed {
            text: latin.into_owned(),
            encoding: WINDOWS_1252.name(),
            detection: Detection::Latin,
        });
    }

    warn!("Feed is not valid UTF-8 and matched no single-byte heuristic");
    Outcome::degraded(
        DecodedFeed {
            text: String::from_utf8_lossy(bytes).into_owned(),
            encoding: UTF_8.name(),
            detection: Detection::Fallback,
        },
        Degradation::EncodingFallback {
            encoding: UTF_8.name().to_string(),
            reason: "invalid UTF-8 and no single-byte match".to_string(),
        },
    )
}

fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

/// Two adjacent Cyrillic letters. Isolated accented Latin letters in a
/// windows-1252 file also land in the Cyrillic block when read as
/// windows-1251, but they rarely sit next to each other.
fn has_cyrillic_run(text: &str) -> bool {
    let mut previous = false;
    for c in text.chars() {
        let current = is_cyrillic(c) && c.is_alphabetic();
        if previous && current {
            return true;
        }
        previous = current;
    }
    false
}

fn has_accented_latin(text: &str) -> bool {
    text.chars()
        .any(|c| ('\u{00C0}'..='\u{00FF}').contains(&c) && c != '\u{00D7}' && c != '\u{00F7}')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CYRILLIC_FEED: &str = "<offers><offer><city>Київ</city><street>Хрещатик</street></offer></offers>";

    #[test]
    fn test_declared_windows_1251() {
        let xml = format!("<?xml version=\"1.0\" encoding=\"windows-1251\"?>{}", CYRILLIC_FEED);
        let (bytes, _, _) = WINDOWS_1251.encode(&xml);

        let outcome = decode_feed(&bytes);
        assert!(!outcome.is_degraded());
        let decoded = outcome.into_value();
        assert_eq!(decoded.detection, Detection::Declared);
        assert_eq!(decoded.encoding, "windows-1251");
        assert!(decoded.text.contains("Хрещатик"));
    }

    #[test]
    fn test_declared_label_alias() {
        let bytes = b"<?xml version='1.0' encoding='cp1251'?><a/>";
        assert_eq!(declared_encoding(bytes), Some(WINDOWS_1251));
    }

    #[test]
    fn test_unknown_label_is_ignored() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"klingon-8\"?><a/>";
        assert_eq!(declared_encoding(bytes), None);
        assert_eq!(decode_feed(bytes).into_value().detection, Detection::Utf8);
    }

    #[test]
    fn test_no_declaration() {
        assert_eq!(declared_encoding(b"<offers/>"), None);
    }

    #[test]
    fn test_undeclared_cyrillic_single_byte() {
        let (bytes, _, _) = WINDOWS_1251.encode(CYRILLIC_FEED);
        let decoded = decode_feed(&bytes).into_value();

        assert_eq!(decoded.detection, Detection::Cyrillic);
        assert_eq!(decoded.text, CYRILLIC_FEED);
    }

    #[test]
    fn test_undeclared_latin_single_byte() {
        let source = "<offer><city>Café Müller</city></offer>";
        let (bytes, _, _) = WINDOWS_1252.encode(source);
        let decoded = decode_feed(&bytes).into_value();

        assert_eq!(decoded.detection, Detection::Latin);
        assert_eq!(decoded.text, source);
    }

    #[test]
    fn test_declared_utf8_with_cyrillic_bytes_uses_heuristics() {
        let xml = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{}", CYRILLIC_FEED);
        let (bytes, _, _) = WINDOWS_1251.encode(&xml);

        let decoded = decode_feed(&bytes).into_value();
        assert_eq!(decoded.detection, Detection::Cyrillic);
        assert!(decoded.text.contains("Київ"));
    }

    #[test]
    fn test_declared_conversion_failure_degrades() {
        // 0xC0 is unassigned in ISO-8859-8
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"iso-8859-8\"?><a>".to_vec();
        bytes.push(0xC0);
        bytes.extend_from_slice(b"</a>");

        let outcome = decode_feed(&bytes);
        assert!(outcome.is_degraded());
        assert!(matches!(
            outcome.reasons()[0],
            Degradation::EncodingFallback { ref encoding, .. } if encoding == "ISO-8859-8"
        ));
        assert_eq!(outcome.value().detection, Detection::Fallback);
        assert!(outcome.value().text.starts_with("<?xml"));
    }

    #[test]
    fn test_unmatched_bytes_fall_back_to_lossy_utf8() {
        // Punctuation in both single-byte code pages
        let bytes = b"<a>\x85\xb0\x86</a>";
        let outcome = decode_feed(bytes);
        assert!(outcome.is_degraded());
        assert!(outcome.value().text.starts_with("<a>"));
    }

    proptest! {
        #[test]
        fn prop_utf8_without_declaration_is_unchanged(text in "\\PC*") {
            let decoded = decode_feed(text.as_bytes());
            prop_assert!(!decoded.is_degraded());
            prop_assert_eq!(&decoded.value().text, &text);

            let again = decode_feed(decoded.value().text.as_bytes());
            prop_assert_eq!(&again.value().text, &text);
        }
    }
}
