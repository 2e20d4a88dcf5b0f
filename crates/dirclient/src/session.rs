//! Transport boundary between [`Connection`](crate::Connection) and the protocol engine.
//!
//! A [`SessionConnector`] opens a transport to one server and hands back a
//! [`DirectorySession`]. Sessions report failures as a [`SessionFailure`] signal, either
//! `"<code>:<message>"` or a bare message; the connection decodes it into a
//! [`dirclient_core::Error`] exactly once.

use crate::connection::LdapUrl;
use crate::request::{Change, SearchScope};
use crate::Error;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Raw failure signal produced below the session boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SessionFailure(String);

impl SessionFailure {
    /// Creates a bare signal (decoded with the sentinel result code).
    #[must_use]
    pub fn new(signal: impl Into<String>) -> Self {
        Self(signal.into())
    }

    /// Creates a `"<code>:<message>"` signal.
    #[must_use]
    pub fn with_code(code: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self(format!("{code}:{message}"))
    }

    /// Borrows the signal text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SessionFailure> for Error {
    fn from(failure: SessionFailure) -> Self {
        Self::from_signal(&failure.0)
    }
}

/// Result type used below the session boundary.
pub type SessionResult<T> = std::result::Result<T, SessionFailure>;

/// Entry as returned by a session search.
///
/// Attributes whose values are valid UTF-8 land in `attributes`; the others keep their
/// bytes untouched in `binary_attributes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Distinguished name.
    pub dn: String,
    /// Text attribute values keyed by attribute name.
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Binary attribute values keyed by attribute name.
    pub binary_attributes: BTreeMap<String, Vec<Vec<u8>>>,
}

impl RawEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
            binary_attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute with its values.
    #[must_use]
    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a binary attribute with its values.
    #[must_use]
    pub fn with_binary_attribute<I>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.binary_attributes
            .insert(name.into(), values.into_iter().collect());
        self
    }
}

/// Settings applied when a transport is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Bound on establishing the transport; `None` waits indefinitely.
    pub network_timeout: Option<Duration>,
    /// Bound on each operation; `None` waits indefinitely.
    pub time_limit: Option<Duration>,
    /// Negotiate StartTLS before the first bind.
    pub start_tls: bool,
    /// Verify the server certificate.
    pub tls_verify: bool,
    /// Additional trusted CA certificate (PEM).
    pub tls_ca_cert: Option<PathBuf>,
}

/// Inputs of a SASL/GSSAPI bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GssapiCredentials {
    /// Kerberos realm.
    pub realm: String,
    /// Keytab to acquire credentials from; `None` uses the default credential cache.
    pub keytab: Option<PathBuf>,
    /// Fully qualified host name of the server, used for the service principal.
    pub server_fqdn: String,
}

/// One open transport to a directory server.
#[cfg_attr(test, mockall::automock)]
pub trait DirectorySession: Send {
    /// Performs a simple bind.
    fn simple_bind(&mut self, dn: &str, password: &str) -> SessionResult<()>;

    /// Performs a SASL/GSSAPI bind.
    fn gssapi_bind(&mut self, credentials: &GssapiCredentials) -> SessionResult<()>;

    /// Runs one search and returns the matching entries in server order.
    fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[String],
    ) -> SessionResult<Vec<RawEntry>>;

    /// Applies a single attribute change.
    fn modify(&mut self, dn: &str, change: &Change) -> SessionResult<()>;

    /// Renames or moves an entry; an empty `new_superior` keeps the parent.
    fn modify_dn(
        &mut self,
        dn: &str,
        new_rdn: &str,
        delete_old_rdn: bool,
        new_superior: &str,
    ) -> SessionResult<()>;

    /// Deletes an entry.
    fn delete(&mut self, dn: &str) -> SessionResult<()>;

    /// Unbinds and releases the transport.
    fn unbind(&mut self) -> SessionResult<()>;
}

/// Opens transports.
#[cfg_attr(test, mockall::automock)]
pub trait SessionConnector: Send + Sync {
    /// Opens a transport to `url`.
    fn connect(
        &self,
        url: &LdapUrl,
        options: &TransportOptions,
    ) -> SessionResult<Box<dyn DirectorySession>>;
}
