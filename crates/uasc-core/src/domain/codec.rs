//! Binary and text encodings of [`GlyphFrame`].
//!
//! Compact frames are 4 bytes, big-endian:
//!
//! ```text
//!  31    28 27           16 15                        0
//! +--------+---------------+---------------------------+
//! | domain |   authority   |         glyph_code        |
//! +--------+---------------+---------------------------+
//! ```
//!
//! Extended frames append 4 context bytes: zone, priority, mode, reserved.
//! Context packing is lossy: only the fixed fields survive, and any other
//! keys are dropped. The text form is the canonical path for richer context.

use crate::domain::glyph::{code_for_token, Domain, GlyphFrame, AUTHORITY_MAX, DOMAIN_MAX};
use crate::error::CodecError;
use crate::types::ParamMap;
use serde_json::Value;

/// URI scheme of the text form
pub const URI_SCHEME: &str = "UASC://";

/// Size of a frame without context
pub const COMPACT_FRAME_LEN: usize = 4;

/// Size of a frame with packed context
pub const EXTENDED_FRAME_LEN: usize = 8;

const MODES: [(u8, &str); 4] = [
    (0, "normal"),
    (1, "emergency"),
    (2, "maintenance"),
    (3, "test"),
];

/// Stateless encoder/decoder for glyph frames
pub struct GlyphCodec;

impl GlyphCodec {
    /// Encode a frame: 4 bytes without context, 8 with. An empty context
    /// map counts as no context.
    ///
    /// Out-of-range domain or authority values are rejected rather than
    /// masked.
    pub fn encode(frame: &GlyphFrame) -> Result<Vec<u8>, CodecError> {
        if frame.domain.code() > DOMAIN_MAX {
            return Err(CodecError::EncodingError(format!(
                "domain {} exceeds 4 bits",
                frame.domain.code()
            )));
        }
        if frame.authority > AUTHORITY_MAX {
            return Err(CodecError::EncodingError(format!(
                "authority 0x{:X} exceeds 12 bits",
                frame.authority
            )));
        }

        let packed = (u32::from(frame.domain.code()) << 28)
            | (u32::from(frame.authority) << 16)
            | u32::from(frame.glyph_code);

        let mut bytes = Vec::with_capacity(EXTENDED_FRAME_LEN);
        bytes.extend_from_slice(&packed.to_be_bytes());

        if let Some(context) = frame.context.as_ref().filter(|c| !c.is_empty()) {
            let context_packed = Self::encode_context(context)?;
            bytes.extend_from_slice(&context_packed.to_be_bytes());
        }

        Ok(bytes)
    }

    /// Decode a frame; reads 8 bytes when available, else 4.
    pub fn decode(data: &[u8]) -> Result<GlyphFrame, CodecError> {
        if data.len() < COMPACT_FRAME_LEN {
            return Err(CodecError::DecodingError(format!(
                "frame too short: {} bytes, minimum {} required",
                data.len(),
                COMPACT_FRAME_LEN
            )));
        }

        let packed = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let mut frame = GlyphFrame::new(
            Domain(((packed >> 28) & 0xF) as u8),
            ((packed >> 16) & 0xFFF) as u16,
            (packed & 0xFFFF) as u16,
        );

        if data.len() >= EXTENDED_FRAME_LEN {
            let context_packed = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            frame.context = Some(Self::decode_context(context_packed));
        }

        Ok(frame)
    }

    fn encode_context(context: &ParamMap) -> Result<u32, CodecError> {
        let mut packed = 0u32;

        if let Some(zone) = context.get("zone") {
            packed |= u32::from(byte_field("zone", zone)?) << 24;
        }
        if let Some(priority) = context.get("priority") {
            packed |= u32::from(byte_field("priority", priority)?) << 16;
        }
        if let Some(mode) = context.get("mode") {
            let name = mode.as_str().ok_or_else(|| {
                CodecError::EncodingError(format!("mode must be a string, got {}", mode))
            })?;
            let code = MODES
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(code, _)| *code)
                .ok_or_else(|| CodecError::EncodingError(format!("unknown mode '{}'", name)))?;
            packed |= u32::from(code) << 8;
        }

        Ok(packed)
    }

    fn decode_context(packed: u32) -> ParamMap {
        let mode_code = ((packed >> 8) & 0xFF) as u8;
        let mode = MODES
            .iter()
            .find(|(code, _)| *code == mode_code)
            .map(|(_, name)| *name)
            .unwrap_or("normal");

        let mut context = ParamMap::new();
        context.insert("zone".to_string(), Value::from((packed >> 24) & 0xFF));
        context.insert("priority".to_string(), Value::from((packed >> 16) & 0xFF));
        context.insert("mode".to_string(), Value::from(mode));
        context
    }

    /// Render a frame as `UASC://{domain}.auth_{AAA}/{token}[?k=v&...]`
    pub fn to_text(frame: &GlyphFrame) -> String {
        let mut uri = format!(
            "{}{}.auth_{:03X}/{}",
            URI_SCHEME,
            frame.domain.uri_name(),
            frame.authority,
            frame.token()
        );

        if let Some(context) = frame.context.as_ref().filter(|c| !c.is_empty()) {
            let query = context
                .iter()
                .map(|(key, value)| format!("{}={}", key, query_value(value)))
                .collect::<Vec<_>>()
                .join("&");
            uri.push('?');
            uri.push_str(&query);
        }

        uri
    }

    /// Parse the text URI form
    pub fn from_text(uri: &str) -> Result<GlyphFrame, CodecError> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| CodecError::DecodingError(format!("missing {} scheme", URI_SCHEME)))?;

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let (address, token) = path
            .split_once('/')
            .filter(|(_, token)| !token.contains('/'))
            .ok_or_else(|| CodecError::DecodingError(format!("invalid path '{}'", path)))?;

        let (domain_str, auth_str) = address
            .split_once('.')
            .ok_or_else(|| CodecError::DecodingError(format!("invalid address '{}'", address)))?;

        let domain = Domain::from_uri_name(domain_str)
            .filter(|d| d.code() <= DOMAIN_MAX)
            .ok_or_else(|| CodecError::DecodingError(format!("unknown domain '{}'", domain_str)))?;

        let authority = auth_str
            .strip_prefix("auth_")
            .and_then(|hex| u16::from_str_radix(hex, 16).ok())
            .filter(|a| *a <= AUTHORITY_MAX)
            .ok_or_else(|| CodecError::DecodingError(format!("invalid authority '{}'", auth_str)))?;

        let glyph_code = code_for_token(token)
            .ok_or_else(|| CodecError::DecodingError(format!("unknown token '{}'", token)))?;

        let mut frame = GlyphFrame::new(domain, authority, glyph_code);

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let mut context = ParamMap::new();
            for pair in query.split('&') {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    CodecError::DecodingError(format!("invalid query parameter '{}'", pair))
                })?;
                context.insert(key.to_string(), parse_query_value(value));
            }
            frame.context = Some(context);
        }

        Ok(frame)
    }
}

fn byte_field(name: &str, value: &Value) -> Result<u8, CodecError> {
    value
        .as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| {
            CodecError::EncodingError(format!("{} must be an integer in 0..=255, got {}", name, value))
        })
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_query_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
