//! Search result entries and their multi-valued attributes.
//!
//! Lookups come in two flavours: exact (`attribute_*`) and ASCII case-insensitive
//! (`equal_fold_*`). A missing attribute is never an error; it yields an empty slice,
//! an empty string, or an empty byte slice.

use crate::session::RawEntry;
use serde::Serialize;
use std::fmt::{self, Write as _};

/// One attribute of an [`Entry`]: a name plus string values and their byte forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryAttribute {
    name: String,
    values: Vec<String>,
    byte_values: Vec<Vec<u8>>,
}

impl EntryAttribute {
    /// Creates an attribute; byte values are derived one per string value.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        let byte_values = values.iter().map(|value| value.as_bytes().to_vec()).collect();
        Self {
            name: name.into(),
            values,
            byte_values,
        }
    }

    /// Creates an attribute from raw bytes, kept exactly as given. String values are a lossy
    /// UTF-8 view, one per byte value.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, byte_values: Vec<Vec<u8>>) -> Self {
        let values = byte_values.iter().map(|bytes| lossy(bytes)).collect();
        Self {
            name: name.into(),
            values,
            byte_values,
        }
    }

    /// Attribute name as returned by the server.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// String values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Raw byte values, one per string value.
    #[must_use]
    pub fn byte_values(&self) -> &[Vec<u8>] {
        &self.byte_values
    }

    fn pretty_into(&self, out: &mut String, indent: usize) {
        let _ = writeln!(
            out,
            "{:indent$}{}: [{}]",
            "",
            self.name,
            self.values.join(" "),
        );
    }
}

/// A directory entry: DN plus attributes ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    dn: String,
    attributes: Vec<EntryAttribute>,
}

impl Entry {
    /// Creates an entry. Attributes are sorted by name; a repeated name keeps its first
    /// occurrence.
    #[must_use]
    pub fn new(dn: impl Into<String>, mut attributes: Vec<EntryAttribute>) -> Self {
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        attributes.dedup_by(|later, earlier| later.name == earlier.name);
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Creates an entry with no attributes.
    #[must_use]
    pub fn empty(dn: impl Into<String>) -> Self {
        Self::new(dn, Vec::new())
    }

    /// Distinguished name.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Attributes ordered by name.
    #[must_use]
    pub fn attributes(&self) -> &[EntryAttribute] {
        &self.attributes
    }

    fn find(&self, name: &str) -> Option<&EntryAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    fn find_fold(&self, name: &str) -> Option<&EntryAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// All values of `name` (exact match).
    #[must_use]
    pub fn attribute_values(&self, name: &str) -> &[String] {
        self.find(name).map(EntryAttribute::values).unwrap_or_default()
    }

    /// All values of `name` (case-insensitive match).
    #[must_use]
    pub fn equal_fold_attribute_values(&self, name: &str) -> &[String] {
        self.find_fold(name)
            .map(EntryAttribute::values)
            .unwrap_or_default()
    }

    /// All byte values of `name` (exact match).
    #[must_use]
    pub fn raw_attribute_values(&self, name: &str) -> &[Vec<u8>] {
        self.find(name)
            .map(EntryAttribute::byte_values)
            .unwrap_or_default()
    }

    /// All byte values of `name` (case-insensitive match).
    #[must_use]
    pub fn equal_fold_raw_attribute_values(&self, name: &str) -> &[Vec<u8>] {
        self.find_fold(name)
            .map(EntryAttribute::byte_values)
            .unwrap_or_default()
    }

    /// First value of `name` (exact match), or `""`.
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> &str {
        self.attribute_values(name).first().map_or("", String::as_str)
    }

    /// First value of `name` (case-insensitive match), or `""`.
    #[must_use]
    pub fn equal_fold_attribute_value(&self, name: &str) -> &str {
        self.equal_fold_attribute_values(name)
            .first()
            .map_or("", String::as_str)
    }

    /// First byte value of `name` (exact match), or an empty slice.
    #[must_use]
    pub fn raw_attribute_value(&self, name: &str) -> &[u8] {
        self.raw_attribute_values(name)
            .first()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First byte value of `name` (case-insensitive match), or an empty slice.
    #[must_use]
    pub fn equal_fold_raw_attribute_value(&self, name: &str) -> &[u8] {
        self.equal_fold_raw_attribute_values(name)
            .first()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Renders the entry with its DN indented by `indent` spaces and attributes two more.
    #[must_use]
    pub fn pretty(&self, indent: usize) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, indent);
        out
    }

    fn pretty_into(&self, out: &mut String, indent: usize) {
        let _ = writeln!(out, "{:indent$}DN: {}", "", self.dn);
        for attr in &self.attributes {
            attr.pretty_into(out, indent + 2);
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(0))
    }
}

impl From<RawEntry> for Entry {
    fn from(raw: RawEntry) -> Self {
        let mut attributes: Vec<EntryAttribute> = raw
            .attributes
            .into_iter()
            .map(|(name, values)| EntryAttribute::new(name, values))
            .collect();
        for (name, byte_values) in raw.binary_attributes {
            match attributes.iter_mut().find(|attr| attr.name == name) {
                Some(attr) => {
                    attr.values.extend(byte_values.iter().map(|bytes| lossy(bytes)));
                    attr.byte_values.extend(byte_values);
                }
                None => attributes.push(EntryAttribute::from_bytes(name, byte_values)),
            }
        }
        Self::new(raw.dn, attributes)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Entries returned by a search, in DN enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Result entries.
    pub entries: Vec<Entry>,
}

impl SearchResult {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the search matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders every entry with [`Entry::pretty`].
    #[must_use]
    pub fn pretty(&self, indent: usize) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            entry.pretty_into(&mut out, indent);
        }
        out
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(0))
    }
}

impl IntoIterator for SearchResult {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new(
            "cn=jdoe,ou=people,dc=example,dc=org",
            vec![
                EntryAttribute::new("mail", vec!["jdoe@example.org".into()]),
                EntryAttribute::new("cn", vec!["jdoe".into(), "John Doe".into()]),
                EntryAttribute::new("description", Vec::new()),
            ],
        )
    }

    #[test]
    fn attributes_are_sorted_by_name() {
        let entry = sample();
        let names: Vec<_> = entry.attributes().iter().map(EntryAttribute::name).collect();
        assert_eq!(names, vec!["cn", "description", "mail"]);
    }

    #[test]
    fn byte_values_match_values() {
        for attr in sample().attributes() {
            assert_eq!(attr.values().len(), attr.byte_values().len());
        }
        let attr = EntryAttribute::new("cn", vec!["é".into()]);
        assert_eq!(attr.byte_values()[0], "é".as_bytes());
    }

    #[test]
    fn binary_values_keep_their_bytes() {
        let sid = vec![0x01, 0x05, 0x00, 0xff, 0xfe, 0x80];
        let raw = RawEntry::new("cn=host,dc=example,dc=org")
            .with_attribute("cn", ["host"])
            .with_binary_attribute("objectSid", [sid.clone()]);

        let entry = Entry::from(raw);
        assert_eq!(entry.raw_attribute_value("objectSid"), sid.as_slice());
        assert_eq!(entry.equal_fold_raw_attribute_values("objectsid"), [sid]);
        assert_eq!(entry.attribute_values("objectSid").len(), 1);
        assert_eq!(entry.attribute_value("cn"), "host");
    }

    #[test]
    fn exact_lookup() {
        let entry = sample();
        assert_eq!(entry.attribute_values("cn"), ["jdoe", "John Doe"]);
        assert_eq!(entry.attribute_value("cn"), "jdoe");
        assert_eq!(entry.attribute_value("CN"), "");
        assert_eq!(entry.raw_attribute_value("mail"), b"jdoe@example.org");
        assert!(entry.raw_attribute_values("MAIL").is_empty());
    }

    #[test]
    fn equal_fold_lookup() {
        let entry = sample();
        assert_eq!(entry.equal_fold_attribute_value("CN"), "jdoe");
        assert_eq!(entry.equal_fold_attribute_values("Mail").len(), 1);
        assert_eq!(entry.equal_fold_raw_attribute_value("MAIL"), b"jdoe@example.org");
        assert_eq!(entry.equal_fold_raw_attribute_values("cn").len(), 2);
    }

    #[test]
    fn missing_or_valueless_attribute_is_empty() {
        let entry = sample();
        assert_eq!(entry.attribute_value("telephoneNumber"), "");
        assert_eq!(entry.attribute_value("description"), "");
        assert!(entry.attribute_values("telephoneNumber").is_empty());
        assert!(entry.raw_attribute_value("description").is_empty());
        assert_eq!(entry.equal_fold_attribute_value("nothing"), "");
    }

    #[test]
    fn pretty_indents_attributes() {
        let entry = Entry::new(
            "cn=a,dc=example,dc=org",
            vec![EntryAttribute::new("cn", vec!["a".into(), "b".into()])],
        );
        assert_eq!(entry.pretty(2), "  DN: cn=a,dc=example,dc=org\n    cn: [a b]\n");
        assert_eq!(entry.to_string(), "DN: cn=a,dc=example,dc=org\n  cn: [a b]\n");
    }

    #[test]
    fn from_raw_entry() {
        let raw = RawEntry::new("cn=a,dc=example,dc=org")
            .with_attribute("sn", ["A"])
            .with_attribute("cn", ["a"]);
        let entry = Entry::from(raw);
        assert_eq!(entry.dn(), "cn=a,dc=example,dc=org");
        assert_eq!(entry.attributes()[0].name(), "cn");
        assert_eq!(entry.attribute_value("sn"), "A");
    }

    #[test]
    fn search_result_pretty_and_serialize() {
        let result = SearchResult {
            entries: vec![Entry::empty("dc=example,dc=org"), sample()],
        };
        assert_eq!(result.len(), 2);
        assert!(result.pretty(0).starts_with("DN: dc=example,dc=org\nDN: cn=jdoe"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["entries"][1]["attributes"][0]["name"], "cn");
    }
}
