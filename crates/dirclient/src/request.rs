//! Caller-built request values for search, modify and modify-DN operations.

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SearchScope {
    /// The base object only.
    BaseObject,
    /// Immediate children of the base.
    SingleLevel,
    /// The base and everything below it.
    WholeSubtree,
    /// Everything below the base, excluding the base itself.
    Subordinate,
    /// Server default (treated as a whole-subtree search).
    Default,
}

impl SearchScope {
    /// Converts a numeric scope code (`0`, `1`, `2`, `3`, or `-1`).
    ///
    /// # Errors
    ///
    /// Returns a param error for any other value.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::BaseObject),
            1 => Ok(Self::SingleLevel),
            2 => Ok(Self::WholeSubtree),
            3 => Ok(Self::Subordinate),
            -1 => Ok(Self::Default),
            other => Err(Error::param(format!("invalid search scope {other}"))),
        }
    }

    /// Numeric code of the scope.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::BaseObject => 0,
            Self::SingleLevel => 1,
            Self::WholeSubtree => 2,
            Self::Subordinate => 3,
            Self::Default => -1,
        }
    }
}

impl TryFrom<i32> for SearchScope {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        Self::from_code(code)
    }
}

/// Search request: base DN, scope, opaque filter and requested attributes.
///
/// An empty attribute list requests every user attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Base DN of the search.
    pub base_dn: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Filter string, passed to the server untouched.
    pub filter: String,
    /// Attributes to read for each entry.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Creates a request that reads all attributes.
    #[must_use]
    pub fn new(base_dn: impl Into<String>, scope: SearchScope, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope,
            filter: filter.into(),
            attributes: Vec::new(),
        }
    }

    /// Restricts the attributes read for each entry.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }
}

/// Kind of a single attribute change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeOperation {
    /// Add values to the attribute.
    Add,
    /// Delete the listed values, or the whole attribute when none are listed.
    Delete,
    /// Replace all values of the attribute.
    Replace,
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Replace => "replace",
        })
    }
}

/// One attribute change within a [`ModifyRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// What to do with the attribute.
    pub operation: ChangeOperation,
    /// Attribute type.
    pub attribute: String,
    /// Values the operation applies to.
    pub values: Vec<String>,
}

impl Change {
    /// Creates a change.
    #[must_use]
    pub fn new<I, S>(operation: ChangeOperation, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operation,
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered list of changes applied to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    /// DN of the entry to modify.
    pub dn: String,
    /// Changes, applied in order.
    pub changes: Vec<Change>,
}

impl ModifyRequest {
    /// Creates a request with no changes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            changes: Vec::new(),
        }
    }

    /// Appends an add change.
    #[must_use]
    pub fn add<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changes
            .push(Change::new(ChangeOperation::Add, attribute, values));
        self
    }

    /// Appends a delete change.
    #[must_use]
    pub fn delete<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changes
            .push(Change::new(ChangeOperation::Delete, attribute, values));
        self
    }

    /// Appends a replace change.
    #[must_use]
    pub fn replace<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changes
            .push(Change::new(ChangeOperation::Replace, attribute, values));
        self
    }
}

/// Rename or move request.
///
/// An empty `new_superior` renames the entry in place; otherwise the entry is moved under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDnRequest {
    /// DN of the entry.
    pub dn: String,
    /// New relative DN (`attr=value`).
    pub new_rdn: String,
    /// Whether the old RDN value is removed from the entry.
    pub delete_old_rdn: bool,
    /// New parent DN, empty to keep the current parent.
    pub new_superior: String,
}

impl ModifyDnRequest {
    /// Creates an in-place rename.
    #[must_use]
    pub fn rename(dn: impl Into<String>, new_rdn: impl Into<String>, delete_old_rdn: bool) -> Self {
        Self {
            dn: dn.into(),
            new_rdn: new_rdn.into(),
            delete_old_rdn,
            new_superior: String::new(),
        }
    }

    /// Sets the new parent, turning the request into a move.
    #[must_use]
    pub fn with_new_superior(mut self, new_superior: impl Into<String>) -> Self {
        self.new_superior = new_superior.into();
        self
    }

    /// Returns true when the request moves the entry to another parent.
    #[must_use]
    pub fn is_move(&self) -> bool {
        !self.new_superior.is_empty()
    }
}
