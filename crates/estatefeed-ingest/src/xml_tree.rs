//! Generic XML tree
//!
//! Feed documents are parsed into a [`serde_json::Value`] so the normalizer
//! can probe them by element name without knowing their layout up front.
//!
//! Shape of the tree:
//! - the document becomes `{ "<root name>": <element> }`
//! - attributes are merged into the element's properties
//! - an element with only text becomes a string (`""` when empty)
//! - text next to attributes or children is kept under `"_text"`
//! - a repeated child name becomes an array, a single child stays a value
//!
//! Namespace prefixes are dropped from element and attribute names.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Property holding an element's own text when it also has properties
pub const TEXT_KEY: &str = "_text";

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("unexpected element <{0}> after the root element")]
    SecondRoot(String),

    #[error("document has no root element")]
    NoRoot,
}

struct Frame {
    name: String,
    properties: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, TreeError> {
        let mut properties = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = attribute.key;
            if key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let name = String::from_utf8_lossy(key.local_name().as_ref()).into_owned();
            let value = match attribute.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
            };
            properties.insert(name, Value::String(value));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            properties,
            text: String::new(),
        })
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.properties.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            },
            None => {
                self.properties.insert(name, value);
            },
        }
    }

    fn close(self) -> (String, Value) {
        let Frame {
            name,
            mut properties,
            text,
        } = self;

        if properties.is_empty() {
            return (name, Value::String(text));
        }
        if !text.is_empty() {
            properties.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        (name, Value::Object(properties))
    }
}

/// Parse XML text into a generic tree
pub fn parse_tree(text: &str) -> Result<Value, TreeError> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let frame = Frame::open(&start)?;
                if stack.is_empty() && root.is_some() {
                    return Err(TreeError::SecondRoot(frame.name));
                }
                stack.push(frame);
            },
            Event::Empty(start) => {
                let frame = Frame::open(&start)?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None if root.is_some() => return Err(TreeError::SecondRoot(name)),
                    None => root = Some((name, value)),
                }
            },
            Event::Text(content) => {
                if let Some(frame) = stack.last_mut() {
                    match content.unescape() {
                        Ok(unescaped) => frame.push_text(&unescaped),
                        Err(_) => frame.push_text(&String::from_utf8_lossy(&content)),
                    }
                }
            },
            Event::CData(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.push_text(String::from_utf8_lossy(&content).trim());
                }
            },
            Event::End(_) => {
                // The reader already checked that the end name matches.
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.close();
                    match stack.last_mut() {
                        Some(parent) => parent.add_child(name, value),
                        None => root = Some((name, value)),
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if let Some(open) = stack.pop() {
        return Err(TreeError::Unclosed(open.name));
    }

    let (name, value) = root.ok_or(TreeError::NoRoot)?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}
