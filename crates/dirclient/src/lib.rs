//! # dirclient
//!
//! Synchronous client for LDAP and Active Directory style directory servers.
//!
//! A [`Connection`] is dialed against one server URL, optionally upgraded with StartTLS, and
//! bound with either a simple (DN and password) or a SASL/GSSAPI bind. Once bound it exposes
//! search, modify, modify-DN and delete plus a set of convenience helpers for reading and
//! writing single attributes, renaming and moving objects, and checking that an object exists.
//!
//! Every failure surfaces as a [`dirclient_core::Error`] carrying a numeric LDAP result code.
//!
//! ```no_run
//! use dirclient::{Connection, SearchRequest, SearchScope};
//!
//! # fn main() -> dirclient::Result<()> {
//! let conn = Connection::dial("ldap://dc1.example.org")?;
//! conn.gssapi_bind("EXAMPLE.ORG", None)?;
//! let result = conn.search(&SearchRequest::new(
//!     "dc=example,dc=org",
//!     SearchScope::WholeSubtree,
//!     "(objectClass=user)",
//! ))?;
//! print!("{}", result.pretty(2));
//! conn.close();
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(missing_docs))]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod connection;
pub mod discovery;
pub mod dn;
pub mod entry;
pub mod ldap;
pub mod operations;
pub mod request;
pub mod session;

#[cfg(test)]
mod test_support;

pub use connection::{
    BindState, Connection, DialOptions, LdapUrl, LoginMethod, Scheme, TransportMethod,
    DEFAULT_NETWORK_TIMEOUT,
};
pub use discovery::{ldap_servers, SrvResolver, SystemResolver};
pub use dn::{DistinguishedName, DistinguishedNameError};
pub use entry::{Entry, EntryAttribute, SearchResult};
pub use ldap::{Ldap3Connector, Ldap3Session};
pub use request::{
    Change, ChangeOperation, ModifyDnRequest, ModifyRequest, SearchRequest, SearchScope,
};
pub use session::{
    DirectorySession, GssapiCredentials, RawEntry, SessionConnector, SessionFailure,
    SessionResult, TransportOptions,
};

pub use dirclient_core::{
    ConnectionParams, Error, ErrorKind, Logger, NullLogger, Result, ResultCode, TracingLogger,
};
