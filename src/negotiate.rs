//! Content negotiation and payload encoding.
//!
//! Picks the response format from the request's `Accept` header and
//! serializes a configured payload with serde, as JSON or as structured XML.

use crate::error::StubError;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::type_name;

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const XML_MEDIA_TYPE: &str = "application/xml";
const TEXT_XML_MEDIA_TYPE: &str = "text/xml";

/// Wire formats the stub can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub fn media_type(self) -> &'static str {
        match self {
            Format::Json => JSON_MEDIA_TYPE,
            Format::Xml => XML_MEDIA_TYPE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Xml => "XML",
        }
    }
}

/// Media types listed in every `Accept` header, lowercased, without parameters.
pub fn accepted_media_types(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|entry| entry.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|media_type| !media_type.is_empty())
        .collect()
}

/// Choose the response format for a request.
///
/// An empty `Accept` means JSON. JSON wins over XML when both are listed.
/// An `Accept` header that is present but has no readable media type is
/// unsupported rather than empty.
pub fn negotiate(headers: &HeaderMap) -> Result<Format, StubError> {
    let accepted = accepted_media_types(headers);
    let unreadable = headers
        .get_all(ACCEPT)
        .iter()
        .any(|value| value.to_str().is_err());

    if (accepted.is_empty() && !unreadable) || accepted.iter().any(|m| m == JSON_MEDIA_TYPE) {
        return Ok(Format::Json);
    }
    if accepted.iter().any(|m| m == XML_MEDIA_TYPE) {
        return Ok(Format::Xml);
    }

    Err(StubError::UnsupportedMediaType {
        accept: raw_accept(headers),
    })
}

fn raw_accept(headers: &HeaderMap) -> String {
    headers
        .get_all(ACCEPT)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format of a request body, taken from its `Content-Type`. Anything that
/// is not XML is read as JSON.
pub fn request_format(headers: &HeaderMap) -> Format {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase());

    match content_type.as_deref() {
        Some(XML_MEDIA_TYPE) | Some(TEXT_XML_MEDIA_TYPE) => Format::Xml,
        _ => Format::Json,
    }
}

/// Root used when a type's name is not a valid XML name, e.g. `()`.
pub const FALLBACK_XML_ROOT: &str = "value";

/// Sequence payloads are written as one root holding `<item>` children.
#[derive(Serialize)]
struct XmlSequence<'a, T: ?Sized> {
    item: &'a T,
}

/// Path-less name of a type, without generics or a leading reference.
fn short_type_name(full: &str) -> &str {
    let full = full.trim_start_matches('&');
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    }
}

/// XML root element name for a type: its path-less name without generics,
/// or [`FALLBACK_XML_ROOT`] when that is not a valid XML name.
pub fn xml_root_name<T: ?Sized>() -> &'static str {
    let name = short_type_name(type_name::<T>());
    if is_xml_name(name) {
        name
    } else {
        FALLBACK_XML_ROOT
    }
}

/// Root element for a sequence payload: `ArrayOf` plus the element type
/// name, or `ArrayOfItem` when the element type cannot be named.
pub fn xml_sequence_root_name<T: ?Sized>() -> String {
    let full = type_name::<T>().trim_start_matches('&');
    let inner = match full.strip_prefix('[') {
        Some(rest) => rest.split([';', ']']).next(),
        None => match (full.find('<'), full.rfind('>')) {
            (Some(start), Some(end)) if start < end => full.get(start + 1..end),
            _ => None,
        },
    };

    let element = inner
        .filter(|inner| !inner.contains(','))
        .map(|inner| short_type_name(inner.trim()))
        .filter(|name| is_xml_name(name))
        .unwrap_or("Item");
    format!("ArrayOf{}", element)
}

fn encode_xml<T: Serialize + ?Sized>(payload: &T) -> Result<String, String> {
    let is_sequence = matches!(serde_json::to_value(payload), Ok(serde_json::Value::Array(_)));

    let encoded = if is_sequence {
        quick_xml::se::to_string_with_root(
            &xml_sequence_root_name::<T>(),
            &XmlSequence { item: payload },
        )
    } else {
        quick_xml::se::to_string_with_root(xml_root_name::<T>(), payload)
    };
    encoded.map_err(|e| e.to_string())
}

/// Serialize a payload in the given format.
pub fn encode<T: Serialize + ?Sized>(
    payload: &T,
    format: Format,
    pretty_json: bool,
) -> Result<String, StubError> {
    let encoded = match format {
        Format::Json if pretty_json => {
            serde_json::to_string_pretty(payload).map_err(|e| e.to_string())
        }
        Format::Json => serde_json::to_string(payload).map_err(|e| e.to_string()),
        Format::Xml => encode_xml(payload),
    };

    encoded.map_err(|reason| StubError::Serialization {
        format: format.name(),
        reason,
    })
}

/// Decode a request body into `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8], format: Format) -> Result<T, StubError> {
    let decoded = match format {
        Format::Json => serde_json::from_slice(body).map_err(|e| e.to_string()),
        Format::Xml => std::str::from_utf8(body)
            .map_err(|e| e.to_string())
            .and_then(|text| quick_xml::de::from_str(text).map_err(|e| e.to_string())),
    };

    decoded.map_err(|reason| StubError::ContentDecode {
        expected: type_name::<T>(),
        reason,
    })
}
