//! Common enums and data types.

use crate::error::{ConfigurationError, ConformanceError, ResponseError};
use crate::transport::HttpResponse;
use crate::xml;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key/value pairs, encoded as prefixed headers.
pub type Metadata = BTreeMap<String, String>;

/// Query string parameters. Sorted so the encoded URL is deterministic.
pub type QueryParams = BTreeMap<String, String>;

/// Wire encoding of request and response bodies (the "interface mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

impl Format {
    /// Value used in `format=` query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }

    /// MIME type used for `Content-Type` and `Accept`.
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Xml => "application/xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            _ => Err(ConfigurationError::UnknownFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// A response body after the client's decoding policy was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body was returned.
    Empty,
    /// Body left as text for the caller to parse.
    Raw(String),
    /// Body parsed into a structured value (XML is converted to the JSON shape).
    Structured(Value),
}

impl ResponseBody {
    /// Keep the body as text.
    pub fn raw(response: &HttpResponse) -> Self {
        if response.body.is_empty() {
            ResponseBody::Empty
        } else {
            ResponseBody::Raw(response.text())
        }
    }

    /// Parse a JSON body.
    ///
    /// A body that fails to parse is an error on 2xx responses and is kept
    /// raw otherwise, since error pages are not always JSON.
    pub fn json(response: &HttpResponse) -> Result<Self, ConformanceError> {
        Self::parse(response, |text| {
            serde_json::from_str(text).map_err(ResponseError::from)
        })
    }

    /// Parse a body in the given format into the JSON shape.
    pub fn decode_as(response: &HttpResponse, format: Format) -> Result<Self, ConformanceError> {
        match format {
            Format::Json => Self::json(response),
            Format::Xml => Self::parse(response, xml::xml_to_json),
        }
    }

    fn parse<F>(response: &HttpResponse, parser: F) -> Result<Self, ConformanceError>
    where
        F: FnOnce(&str) -> Result<Value, ResponseError>,
    {
        if response.body.is_empty() {
            return Ok(ResponseBody::Empty);
        }

        let text = response.text();
        match parser(&text) {
            Ok(value) => Ok(ResponseBody::Structured(value)),
            Err(e) if response.is_success() => Err(e.into()),
            Err(_) => Ok(ResponseBody::Raw(text)),
        }
    }

    /// Structured value, if the body was parsed.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResponseBody::Structured(value) => Some(value),
            _ => None,
        }
    }

    /// Raw text, if the body was kept unparsed.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ResponseBody::Raw(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true when no body was returned.
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    /// Look up a top-level key of a structured body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_value().and_then(|v| v.get(key))
    }

    /// Deserialize the value under `key`.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConformanceError> {
        let value = self.get(key).ok_or_else(|| ResponseError::MissingField {
            field: key.to_string(),
        })?;
        T::deserialize(value).map_err(|e| {
            ResponseError::InvalidField {
                field: key.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Deserialize a list under `key`.
    ///
    /// `null` (an empty XML collection) is an empty list and a lone object is
    /// a list of one.
    pub fn decode_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ConformanceError> {
        let value = self.get(key).ok_or_else(|| ResponseError::MissingField {
            field: key.to_string(),
        })?;
        value_to_list(value).map_err(|e| {
            ResponseError::InvalidField {
                field: key.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

pub(crate) fn value_to_list<T: DeserializeOwned>(
    value: &Value,
) -> Result<Vec<T>, serde_json::Error> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(T::deserialize).collect(),
        other => T::deserialize(other).map(|item| vec![item]),
    }
}
