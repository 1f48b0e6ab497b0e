//! Glyph frames: the decoded form of a UASC request.

use crate::types::ParamMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest opcode available for dynamic bindings
pub const DYNAMIC_GLYPH_MIN: u16 = 0x8000;

/// Highest opcode available for dynamic bindings
pub const DYNAMIC_GLYPH_MAX: u16 = 0xFFFE;

/// Largest domain value representable on the wire (4 bits)
pub const DOMAIN_MAX: u8 = 0xF;

/// Largest authority value representable on the wire (12 bits)
pub const AUTHORITY_MAX: u16 = 0xFFF;

const DOMAIN_NAMES: [(u8, &str); 13] = [
    (0x0, "reserved"),
    (0x1, "smart_city"),
    (0x2, "aerospace"),
    (0x3, "maritime"),
    (0x4, "military"),
    (0x5, "medical"),
    (0x6, "industrial"),
    (0x7, "financial"),
    (0x8, "energy"),
    (0x9, "transport"),
    (0xA, "telecom"),
    (0xB, "agriculture"),
    (0xF, "custom"),
];

// Well-known opcodes: (code, token, short name)
const GLYPH_TABLE: [(u16, &str, &str); 7] = [
    (0x8001, "@A1", "SEQ"),
    (0x8002, "@A2", "COND"),
    (0x8003, "@C3", "CTRL"),
    (0x8004, "@N4", "NET"),
    (0x8005, "@X5", "XFER"),
    (0x8006, "@I6", "AI"),
    (0x8007, "@S7", "SYS"),
];

/// Value object: 4-bit domain namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(pub u8);

impl Domain {
    /// Reserved / unassigned
    pub const RESERVED: Domain = Domain(0x0);
    /// Smart city infrastructure
    pub const SMART_CITY: Domain = Domain(0x1);
    /// Aerospace
    pub const AEROSPACE: Domain = Domain(0x2);
    /// Maritime
    pub const MARITIME: Domain = Domain(0x3);
    /// Military
    pub const MILITARY: Domain = Domain(0x4);
    /// Medical
    pub const MEDICAL: Domain = Domain(0x5);
    /// Industrial
    pub const INDUSTRIAL: Domain = Domain(0x6);
    /// Financial
    pub const FINANCIAL: Domain = Domain(0x7);
    /// Energy
    pub const ENERGY: Domain = Domain(0x8);
    /// Transport
    pub const TRANSPORT: Domain = Domain(0x9);
    /// Telecom
    pub const TELECOM: Domain = Domain(0xA);
    /// Agriculture
    pub const AGRICULTURE: Domain = Domain(0xB);
    /// Custom deployments
    pub const CUSTOM: Domain = Domain(0xF);

    /// Raw code
    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Registered lowercase name, if this code has one
    pub fn name(self) -> Option<&'static str> {
        DOMAIN_NAMES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }

    /// Name used in text URIs; unnamed codes render as `domain_{n}`
    pub fn uri_name(self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("domain_{}", self.0),
        }
    }

    /// Inverse of [`Domain::uri_name`]
    pub fn from_uri_name(name: &str) -> Option<Domain> {
        if let Some((code, _)) = DOMAIN_NAMES.iter().find(|(_, n)| *n == name) {
            return Some(Domain(*code));
        }
        name.strip_prefix("domain_")
            .and_then(|n| n.parse::<u8>().ok())
            .map(Domain)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri_name())
    }
}

/// Symbolic token for an opcode (`@C3`), or `@{code:04X}` when unmapped
pub fn token_for(glyph_code: u16) -> String {
    GLYPH_TABLE
        .iter()
        .find(|(code, _, _)| *code == glyph_code)
        .map(|(_, token, _)| token.to_string())
        .unwrap_or_else(|| format!("@{:04X}", glyph_code))
}

/// Inverse of [`token_for`]
pub fn code_for_token(token: &str) -> Option<u16> {
    if let Some((code, _, _)) = GLYPH_TABLE.iter().find(|(_, t, _)| *t == token) {
        return Some(*code);
    }
    let hex = token.strip_prefix('@')?;
    if hex.len() != 4 {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

/// Whether `glyph_code` lies in the dynamically bindable range
#[inline]
pub fn is_dynamic_glyph(glyph_code: u16) -> bool {
    (DYNAMIC_GLYPH_MIN..=DYNAMIC_GLYPH_MAX).contains(&glyph_code)
}

/// A decoded UASC glyph frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphFrame {
    /// Domain namespace (4 bits on the wire)
    pub domain: Domain,

    /// Issuing authority (12 bits on the wire)
    pub authority: u16,

    /// Opcode
    pub glyph_code: u16,

    /// Optional inline context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ParamMap>,
}

impl GlyphFrame {
    /// Create a frame without context
    pub fn new(domain: Domain, authority: u16, glyph_code: u16) -> Self {
        Self {
            domain,
            authority,
            glyph_code,
            context: None,
        }
    }

    /// Attach context
    pub fn with_context(mut self, context: ParamMap) -> Self {
        self.context = Some(context);
        self
    }

    /// Full address as `D.AAA.GGGG` hex
    pub fn full_address(&self) -> String {
        format!(
            "{:01X}.{:03X}.{:04X}",
            self.domain.code(),
            self.authority,
            self.glyph_code
        )
    }

    /// Symbolic opcode token
    pub fn token(&self) -> String {
        token_for(self.glyph_code)
    }

    /// Short human-readable alias, for logs
    pub fn name(&self) -> String {
        GLYPH_TABLE
            .iter()
            .find(|(code, _, _)| *code == self.glyph_code)
            .map(|(_, _, name)| name.to_string())
            .unwrap_or_else(|| format!("G{:04X}", self.glyph_code))
    }
}

impl fmt::Display for GlyphFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.token(), self.full_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address_and_display() {
        let frame = GlyphFrame::new(Domain::SMART_CITY, 0x42, 0x8003);
        assert_eq!(frame.full_address(), "1.042.8003");
        assert_eq!(frame.to_string(), "@C3 @ 1.042.8003");
    }

    #[test]
    fn test_tokens() {
        assert_eq!(token_for(0x8001), "@A1");
        assert_eq!(token_for(0x9ABC), "@9ABC");
        assert_eq!(code_for_token("@S7"), Some(0x8007));
        assert_eq!(code_for_token("@9ABC"), Some(0x9ABC));
        assert_eq!(code_for_token("@ZZ"), None);
        assert_eq!(code_for_token("C3"), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(GlyphFrame::new(Domain::SMART_CITY, 1, 0x8004).name(), "NET");
        assert_eq!(GlyphFrame::new(Domain::SMART_CITY, 1, 0x8100).name(), "G8100");
    }

    #[test]
    fn test_domain_names() {
        assert_eq!(Domain::SMART_CITY.uri_name(), "smart_city");
        assert_eq!(Domain(0xC).uri_name(), "domain_12");
        assert_eq!(Domain::from_uri_name("telecom"), Some(Domain::TELECOM));
        assert_eq!(Domain::from_uri_name("domain_13"), Some(Domain(0xD)));
        assert_eq!(Domain::from_uri_name("atlantis"), None);
    }

    #[test]
    fn test_dynamic_range() {
        assert!(!is_dynamic_glyph(0x7FFF));
        assert!(is_dynamic_glyph(0x8000));
        assert!(is_dynamic_glyph(0xFFFE));
        assert!(!is_dynamic_glyph(0xFFFF));
    }
}
