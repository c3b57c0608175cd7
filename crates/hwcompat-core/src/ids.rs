//! PCI identifier parsing.
//!
//! Identifiers are written as colon-separated hex components:
//! `vendor:device[:subvendor:subdevice]`. Each component may carry a `0x`
//! prefix or a Windows-style tag (`VEN`, `DEV`, `SUBVEN`, `SUBDEV`), so
//! `0x8086:0x1234` and `VEN8086:DEV1234` name the same device.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

static COMPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(?:0x|subven|sven|subdev|sdev|ven|dev)?([0-9a-f]{1,4})$")
        .expect("identifier component regex is valid")
});

/// Errors raised while parsing an identifier string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("empty identifier")]
    Empty,
    #[error("invalid component {component:?}")]
    InvalidComponent { component: String },
    #[error("expected at most 4 components, got {0}")]
    TooManyComponents(usize),
    #[error("expected at least {expected} components, got {got}")]
    TooFewComponents { expected: usize, got: usize },
    #[error("wildcard component is only allowed at the end")]
    MisplacedWildcard,
    #[error("wildcards are not allowed here")]
    WildcardNotAllowed,
}

/// Parse one component; `None` for a `*` wildcard
fn parse_component(raw: &str) -> Result<Option<u16>, IdParseError> {
    let raw = raw.trim();
    if raw == "*" {
        return Ok(None);
    }

    let caps = COMPONENT
        .captures(raw)
        .ok_or_else(|| IdParseError::InvalidComponent { component: raw.to_string() })?;

    u16::from_str_radix(&caps[1], 16)
        .map(Some)
        .map_err(|_| IdParseError::InvalidComponent { component: raw.to_string() })
}

/// Split an identifier into up to four components.
///
/// Wildcards may only trail: `8086:*` is fine, `*:1234` is not. Trailing
/// wildcards are dropped from the result, so `8086:*` yields one component.
pub fn parse_components(s: &str) -> Result<Vec<u16>, IdParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(IdParseError::Empty);
    }

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 4 {
        return Err(IdParseError::TooManyComponents(parts.len()));
    }

    let mut values = Vec::with_capacity(parts.len());
    let mut seen_wildcard = false;
    for part in parts {
        match parse_component(part)? {
            Some(_) if seen_wildcard => return Err(IdParseError::MisplacedWildcard),
            Some(v) => values.push(v),
            None => seen_wildcard = true,
        }
    }

    if values.is_empty() {
        return Err(IdParseError::MisplacedWildcard);
    }

    Ok(values)
}

/// A concrete PCI identity as reported by the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PciId {
    pub vendor: u16,
    pub device: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subvendor: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdevice: Option<u16>,
}

impl PciId {
    pub fn new(vendor: u16, device: u16) -> Self {
        Self { vendor, device, subvendor: None, subdevice: None }
    }

    pub fn with_subsystem(mut self, subvendor: u16, subdevice: u16) -> Self {
        self.subvendor = Some(subvendor);
        self.subdevice = Some(subdevice);
        self
    }

    /// Parse a device identity. At least vendor and device are required and
    /// wildcards are rejected.
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        if s.contains('*') {
            return Err(IdParseError::WildcardNotAllowed);
        }

        let c = parse_components(s)?;
        if c.len() < 2 {
            return Err(IdParseError::TooFewComponents { expected: 2, got: c.len() });
        }

        Ok(Self {
            vendor: c[0],
            device: c[1],
            subvendor: c.get(2).copied(),
            subdevice: c.get(3).copied(),
        })
    }

    /// Components in declaration order, as present
    pub fn components(&self) -> Vec<u16> {
        let mut out = vec![self.vendor, self.device];
        out.extend(self.subvendor);
        out.extend(self.subdevice);
        out
    }
}

impl fmt::Display for PciId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.components().iter().map(|c| format!("{:04x}", c)).collect();
        write!(f, "{}", parts.join(":"))
    }
}
