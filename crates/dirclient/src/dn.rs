//! Distinguished names: syntax checks, the leading RDN for moves, and normalized comparison.

use crate::{Error, ResultCode};
use std::fmt;
use thiserror::Error;

/// Reasons a distinguished name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// Nothing but whitespace.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// An RDN (or one `+` part of it) is not `attr=value`.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// The name ends inside an escape sequence.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DistinguishedNameError> for Error {
    fn from(err: DistinguishedNameError) -> Self {
        Self::new(ResultCode::INVALID_DN_SYNTAX, err.to_string())
    }
}

/// A syntactically checked distinguished name.
///
/// RDNs are kept as written so they can be sent back to the server unchanged. Equality
/// compares attribute types and values case-insensitively, ignores insignificant spaces,
/// and decodes `\XX` hex escapes.
#[derive(Debug, Clone)]
pub struct DistinguishedName {
    rdns: Vec<String>,
}

impl DistinguishedName {
    /// Parses and checks `input`.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] for an empty name, an RDN that is not `attr=value`,
    /// or a dangling escape.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let mut rdns = Vec::new();
        for rdn in split_unescaped(input, ',')? {
            let rdn = rdn.trim();
            for part in split_unescaped(rdn, '+')? {
                attribute_value(part)?;
            }
            rdns.push(rdn.to_string());
        }
        Ok(Self { rdns })
    }

    /// The leading RDN exactly as written, e.g. `CN=Smith\, John`.
    #[must_use]
    pub fn first_rdn(&self) -> &str {
        self.rdns.first().map_or("", String::as_str)
    }

    fn normalized(&self) -> Vec<Vec<(String, String)>> {
        self.rdns
            .iter()
            .map(|rdn| {
                let mut parts = split_unescaped(rdn, '+')
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|part| attribute_value(part).ok())
                    .map(|(attr, value)| (attr.to_ascii_lowercase(), normalize_value(value)))
                    .collect::<Vec<_>>();
                // Multi-valued RDN parts are unordered.
                parts.sort();
                parts
            })
            .collect()
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.rdns.len() == other.rdns.len() && self.normalized() == other.normalized()
    }
}

impl Eq for DistinguishedName {}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rdns.join(","))
    }
}

/// Returns true when `a` and `b` name the same entry. Names that do not parse are compared
/// as case-insensitive strings.
#[must_use]
pub fn same_dn(a: &str, b: &str) -> bool {
    match (DistinguishedName::parse(a), DistinguishedName::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

/// Converts a DNS domain to a `DC=` distinguished name (`example.org` becomes
/// `DC=example,DC=org`). Empty labels are skipped; an empty domain yields an empty string.
#[must_use]
pub fn domain_to_dn(domain: &str) -> String {
    domain
        .split('.')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| format!("DC={label}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits at every `delimiter` not preceded by a backslash, returning slices of `input`.
fn split_unescaped(
    input: &str,
    delimiter: char,
) -> std::result::Result<Vec<&str>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == delimiter {
            parts.push(&input[start..i]);
            start = i + ch.len_utf8();
        }
    }
    if escaped {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn attribute_value(part: &str) -> std::result::Result<(&str, &str), DistinguishedNameError> {
    let invalid = || DistinguishedNameError::InvalidComponent(part.trim().to_string());
    let (attribute, value) = part.split_once('=').ok_or_else(invalid)?;
    let (attribute, value) = (attribute.trim(), value.trim());
    if attribute.is_empty() || value.is_empty() || attribute.contains('\\') {
        return Err(invalid());
    }
    Ok((attribute, value))
}

/// Decodes escapes (`\,` and `\2C` alike) and folds case.
fn normalize_value(value: &str) -> String {
    let mut bytes = Vec::with_capacity(value.len());
    let mut rest = value.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        rest = tail;
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let hex = rest
            .get(..2)
            .and_then(|pair| std::str::from_utf8(pair).ok())
            .and_then(|pair| u8::from_str_radix(pair, 16).ok());
        match hex {
            Some(decoded) => {
                bytes.push(decoded);
                rest = &rest[2..];
            }
            None => {
                if let Some((&next, tail)) = rest.split_first() {
                    bytes.push(next);
                    rest = tail;
                }
            }
        }
    }
    String::from_utf8_lossy(&bytes).trim().to_lowercase()
}
