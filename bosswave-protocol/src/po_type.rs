//! Payload object type descriptors.
//!
//! A payload object is tagged with an ontology identifier that has one of
//! three textual forms:
//!
//! ```text
//! 1.0.1.2:      octet only
//! :64           number only
//! 1.0.1.2:64    octet and number
//! ```
//!
//! Parsing enforces exactly four dot-separated octet elements and a number
//! in `0..=99`. Values built directly from components are not range-checked.

use crate::error::FormatError;
use std::fmt;
use std::str::FromStr;

/// Largest number accepted when parsing a type descriptor.
pub const MAX_PARSED_NUMBER: u64 = 99;

/// Payload object type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Dotted octet form, `a.b.c.d:`.
    Octet([u8; 4]),
    /// Number form, `:N`.
    Number(u32),
    /// Both, `a.b.c.d:N`.
    Both([u8; 4], u32),
}

impl PayloadType {
    /// Returns the octet component, if present.
    pub fn octet(&self) -> Option<[u8; 4]> {
        match self {
            PayloadType::Octet(o) | PayloadType::Both(o, _) => Some(*o),
            PayloadType::Number(_) => None,
        }
    }

    /// Returns the number component, if present.
    pub fn number(&self) -> Option<u32> {
        match self {
            PayloadType::Number(n) | PayloadType::Both(_, n) => Some(*n),
            PayloadType::Octet(_) => None,
        }
    }

    /// Parses descriptor text. Equivalent to `s.parse()`.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        s.parse()
    }
}

fn is_unsigned_integer(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_octet(s: &str) -> Result<[u8; 4], FormatError> {
    let elements: Vec<&str> = s.split('.').collect();
    if elements.len() != 4 {
        return Err(FormatError::OctetLength(elements.len()));
    }

    let mut octet = [0u8; 4];
    for (slot, element) in octet.iter_mut().zip(elements) {
        if !is_unsigned_integer(element) {
            return Err(FormatError::OctetElement(element.to_string()));
        }
        *slot = element
            .parse()
            .map_err(|_| FormatError::OctetElement(element.to_string()))?;
    }
    Ok(octet)
}

fn parse_number(s: &str) -> Result<u32, FormatError> {
    if !is_unsigned_integer(s) {
        return Err(FormatError::InvalidNumber(s.to_string()));
    }
    let n: u64 = s
        .parse()
        .map_err(|_| FormatError::InvalidNumber(s.to_string()))?;
    if n > MAX_PARSED_NUMBER {
        return Err(FormatError::NumberOutOfRange(n));
    }
    Ok(n as u32)
}

impl FromStr for PayloadType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(number) = s.strip_prefix(':') {
            return Ok(PayloadType::Number(parse_number(number)?));
        }
        if let Some(octet) = s.strip_suffix(':') {
            return Ok(PayloadType::Octet(parse_octet(octet)?));
        }

        match s.split_once(':') {
            Some((octet, number)) if !number.contains(':') => Ok(PayloadType::Both(
                parse_octet(octet)?,
                parse_number(number)?,
            )),
            _ => Err(FormatError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadType::Octet([a, b, c, d]) => write!(f, "{}.{}.{}.{}:", a, b, c, d),
            PayloadType::Number(n) => write!(f, ":{}", n),
            PayloadType::Both([a, b, c, d], n) => write!(f, "{}.{}.{}.{}:{}", a, b, c, d, n),
        }
    }
}
