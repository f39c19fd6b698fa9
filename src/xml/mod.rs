//! XML encoding for the network API.
//!
//! The conformance suites work on `serde_json::Value` bodies regardless of the
//! interface mode. This module converts XML documents into that shape and
//! serializes request values back into XML.
//!
//! Conversion rules when reading:
//! - the document `<root>..</root>` becomes `{"root": ..}`;
//! - an element whose children all share one name becomes an array when there
//!   is more than one child or when its own name is the child name plus `s`
//!   (`<security_groups><security_group/></security_groups>`);
//! - other elements with children become objects;
//! - leaf elements become strings, `xsi:nil="true"` and empty leaves become
//!   `null`, and `type="int" | "bool" | "dict" | "list"` hints are honoured.

use crate::error::{RequestError, ResponseError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

/// Default namespace of network API documents.
pub const NETWORK_NAMESPACE: &str = "http://openstack.org/quantum/api/v2.0";

/// XML Schema instance namespace (for `xsi:nil`).
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

struct Node {
    name: String,
    nil: bool,
    type_hint: Option<String>,
    text: String,
    children: Vec<(String, Value)>,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, ResponseError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut nil = false;
        let mut type_hint = None;

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ResponseError::XmlParseError {
                message: e.to_string(),
            })?;
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            match attr.key.local_name().as_ref() {
                b"nil" => nil = value == "true",
                b"type" => type_hint = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            name,
            nil,
            type_hint,
            text: String::new(),
            children: Vec::new(),
        })
    }

    fn finish(self) -> (String, Value) {
        if self.nil {
            return (self.name, Value::Null);
        }

        let value = if self.children.is_empty() {
            scalar(self.text, self.type_hint.as_deref())
        } else if is_collection(&self.name, &self.children) {
            Value::Array(self.children.into_iter().map(|(_, v)| v).collect())
        } else {
            Value::Object(self.children.into_iter().collect::<Map<String, Value>>())
        };

        (self.name, value)
    }
}

fn is_collection(name: &str, children: &[(String, Value)]) -> bool {
    let first = &children[0].0;
    let uniform = children.iter().all(|(n, _)| n == first);
    uniform && (children.len() > 1 || name == format!("{}s", first))
}

fn scalar(text: String, type_hint: Option<&str>) -> Value {
    match type_hint {
        Some("int") | Some("long") => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        Some("bool") => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        Some("dict") if text.is_empty() => Value::Object(Map::new()),
        Some("list") if text.is_empty() => Value::Array(Vec::new()),
        _ if text.is_empty() => Value::Null,
        _ => Value::String(text),
    }
}

/// Parse an XML document into the JSON shape used by the JSON interface.
pub fn xml_to_json(xml: &str) -> Result<Value, ResponseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Node::open(&e)?),
            Event::Empty(e) => {
                let node = Node::open(&e)?;
                attach(node.finish(), &mut stack, &mut root)?;
            }
            Event::Text(e) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| ResponseError::XmlParseError {
                    message: "unexpected closing tag".to_string(),
                })?;
                attach(node.finish(), &mut stack, &mut root)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ResponseError::XmlParseError {
            message: "document ended inside an element".to_string(),
        });
    }

    let (name, value) = root.ok_or_else(|| ResponseError::XmlParseError {
        message: "document has no root element".to_string(),
    })?;

    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn attach(
    entry: (String, Value),
    stack: &mut [Node],
    root: &mut Option<(String, Value)>,
) -> Result<(), ResponseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(entry),
        None if root.is_none() => *root = Some(entry),
        None => {
            return Err(ResponseError::XmlParseError {
                message: "document has more than one root element".to_string(),
            })
        }
    }
    Ok(())
}

/// Serialize `value` as an XML document with root element `root`.
///
/// Arrays are written as repeated children named after the singular form of
/// the array element (`rules` → `rule`); `null` becomes `xsi:nil="true"`.
pub fn to_xml_document(root: &str, value: &Value) -> Result<String, RequestError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encoding_error)?;

    let start = BytesStart::new(root)
        .with_attributes([("xmlns", NETWORK_NAMESPACE), ("xmlns:xsi", XSI_NAMESPACE)]);
    write_element(&mut writer, root, start, value)?;

    String::from_utf8(writer.into_inner()).map_err(encoding_error)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    start: BytesStart<'_>,
    value: &Value,
) -> Result<(), RequestError> {
    match value {
        Value::Null => {
            let start = start.with_attributes([("xsi:nil", "true")]);
            writer
                .write_event(Event::Empty(start))
                .map_err(encoding_error)?;
        }
        Value::Object(map) => {
            writer.write_event(Event::Start(start)).map_err(encoding_error)?;
            for (key, child) in map {
                write_element(writer, key, BytesStart::new(key.as_str()), child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encoding_error)?;
        }
        Value::Array(items) => {
            let child_name = singular(name);
            writer.write_event(Event::Start(start)).map_err(encoding_error)?;
            for item in items {
                write_element(writer, child_name, BytesStart::new(child_name), item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encoding_error)?;
        }
        Value::String(text) => write_text(writer, name, start, text)?,
        other => write_text(writer, name, start, &other.to_string())?,
    }
    Ok(())
}

fn write_text(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    start: BytesStart<'_>,
    text: &str,
) -> Result<(), RequestError> {
    writer.write_event(Event::Start(start)).map_err(encoding_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(encoding_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encoding_error)?;
    Ok(())
}

fn singular(name: &str) -> &str {
    match name.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem,
        _ => "item",
    }
}

fn encoding_error(e: impl std::fmt::Display) -> RequestError {
    RequestError::Encoding {
        message: e.to_string(),
    }
}
