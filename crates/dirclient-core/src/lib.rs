//! # dirclient-core
//!
//! Shared building blocks for the `dirclient` directory client.
//!
//! This crate carries everything that does not touch the wire: the LDAP result-code table,
//! the typed error produced by every directory operation, connection configuration, and the
//! logging interface consumed by connections.
//!
//! ## Modules
//!
//! - [`result_code`] - LDAP and client-local result codes with their descriptions
//! - [`error`] - The directory error type and the failure-signal translator
//! - [`config`] - Connection parameters loaded from JSON and validated
//! - [`logging`] - Logger interface plus `tracing`-backed and silent implementations

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod logging;
pub mod result_code;

// Re-export commonly used types
pub use config::ConnectionParams;
pub use error::{Error, ErrorKind, Result};
pub use logging::{Logger, NullLogger, TracingLogger};
pub use result_code::ResultCode;
