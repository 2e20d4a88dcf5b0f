//! Connection lifecycle: dialing, session ownership and close.
//!
//! A [`Connection`] is created unbound by [`Connection::dial`]. The transport is opened by
//! the first bind (see [`crate::auth`]) because transport security depends on how the caller
//! authenticates. All session access goes through one mutex, so at most one operation runs
//! on a connection at a time.

use crate::discovery::SrvResolver;
use crate::ldap::Ldap3Connector;
use crate::session::{DirectorySession, SessionConnector, TransportOptions};
use crate::{Error, Logger, Result, ResultCode, TracingLogger};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

/// Network timeout applied when the dial options do not set one.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(60);

/// URL scheme of a directory address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scheme {
    /// Plain LDAP over TCP.
    Ldap,
    /// LDAP over implicit TLS.
    Ldaps,
    /// LDAP over a local socket.
    Ldapi,
    /// Connectionless LDAP (RFC 1798).
    Cldap,
}

impl Scheme {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ldap" => Some(Self::Ldap),
            "ldaps" => Some(Self::Ldaps),
            "ldapi" => Some(Self::Ldapi),
            "cldap" => Some(Self::Cldap),
            _ => None,
        }
    }

    /// Scheme name as it appears in URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ldap => "ldap",
            Self::Ldaps => "ldaps",
            Self::Ldapi => "ldapi",
            Self::Cldap => "cldap",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed directory address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapUrl {
    raw: String,
    scheme: Scheme,
    host: String,
    port: Option<u16>,
}

impl LdapUrl {
    /// Parses an `ldap`, `ldaps`, `ldapi` or `cldap` URL.
    ///
    /// # Errors
    ///
    /// Returns a network error (code 200) for unparsable addresses and other schemes.
    pub fn parse(address: &str) -> Result<Self> {
        let url = Url::parse(address.trim())?;
        let scheme = Scheme::from_name(url.scheme()).ok_or_else(|| {
            Error::network(format!(
                "unsupported URL scheme `{}` in {address}",
                url.scheme()
            ))
        })?;

        Ok(Self {
            raw: address.trim().to_string(),
            scheme,
            host: url.host_str().unwrap_or_default().to_string(),
            port: url.port(),
        })
    }

    /// The address as given to [`Connection::dial`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// URL scheme.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host part (empty for socket paths without a host).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if any.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for LdapUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Options applied when dialing.
#[derive(Clone)]
pub struct DialOptions {
    pub(crate) network_timeout: Option<Duration>,
    pub(crate) time_limit: Option<Duration>,
    pub(crate) tls_verify: bool,
    pub(crate) tls_ca_cert: Option<PathBuf>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) connector: Arc<dyn SessionConnector>,
    pub(crate) resolver: Option<Arc<dyn SrvResolver>>,
}

impl DialOptions {
    /// Creates options with a 60 second network timeout, no time limit, certificate
    /// verification, the `tracing` logger and the `ldap3` transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            network_timeout: Some(DEFAULT_NETWORK_TIMEOUT),
            time_limit: None,
            tls_verify: true,
            tls_ca_cert: None,
            logger: Arc::new(TracingLogger),
            connector: Arc::new(Ldap3Connector::new()),
            resolver: None,
        }
    }

    /// Set the transport establishment timeout (`None` for unbounded).
    #[must_use]
    pub const fn with_network_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Set the per-operation time limit (`None` for unbounded).
    #[must_use]
    pub const fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    /// Set TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Trust an additional CA certificate (PEM file).
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca_cert = Some(path.into());
        self
    }

    /// Set the logger used by connections dialed with these options.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the transport used to open sessions.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn SessionConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Set the SRV resolver used by [`Connection::login`] to discover servers when no URIs
    /// are configured. The system resolver is used when unset.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn SrvResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Transport establishment timeout.
    #[must_use]
    pub const fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout
    }

    /// Per-operation time limit.
    #[must_use]
    pub const fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

impl Default for DialOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialOptions")
            .field("network_timeout", &self.network_timeout)
            .field("time_limit", &self.time_limit)
            .field("tls_verify", &self.tls_verify)
            .field("tls_ca_cert", &self.tls_ca_cert)
            .field("custom_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

/// Authentication state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindState {
    /// Dialed, no successful bind yet.
    Unbound,
    /// A bind succeeded; operations are allowed.
    Bound,
    /// A bind failed; a fresh dial is required.
    Failed,
    /// Closed; every operation fails with a network error.
    Closed,
}

/// Authentication mechanism of a bound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoginMethod {
    /// Simple bind with DN and password.
    Simple,
    /// SASL/GSSAPI (Kerberos).
    Gssapi,
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "SIMPLE",
            Self::Gssapi => "GSSAPI",
        })
    }
}

/// Transport security of a bound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportMethod {
    /// No transport security.
    Plain,
    /// TLS negotiated with the StartTLS extended operation.
    StartTls,
    /// Implicit TLS (`ldaps`).
    Ldaps,
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::StartTls => "StartTLS",
            Self::Ldaps => "LDAPS",
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) login_method: LoginMethod,
    pub(crate) transport_method: TransportMethod,
    pub(crate) bound_uri: String,
}

pub(crate) struct SessionState {
    pub(crate) phase: BindState,
    pub(crate) session: Option<Box<dyn DirectorySession>>,
    pub(crate) start_tls: bool,
    pub(crate) binding: Option<Binding>,
}

impl SessionState {
    fn bound_session(&mut self) -> Result<&mut (dyn DirectorySession + 'static)> {
        match self.phase {
            BindState::Closed => Err(closed_error()),
            BindState::Bound => self
                .session
                .as_deref_mut()
                .ok_or_else(|| {
                    Error::new(ResultCode::OPERATIONS_ERROR, "connection has no session")
                }),
            BindState::Unbound | BindState::Failed => Err(Error::new(
                ResultCode::OPERATIONS_ERROR,
                "connection is not bound",
            )),
        }
    }
}

pub(crate) fn closed_error() -> Error {
    Error::network("connection is closed")
}

/// One logical connection to a directory server.
///
/// Dropping a connection closes it.
pub struct Connection {
    url: LdapUrl,
    options: DialOptions,
    search_base: String,
    state: Mutex<SessionState>,
}

impl Connection {
    /// Dials `address` with default [`DialOptions`].
    ///
    /// # Errors
    ///
    /// Returns a network error (code 200) if the address is not a supported LDAP URL.
    pub fn dial(address: &str) -> Result<Self> {
        Self::dial_with(address, DialOptions::default())
    }

    /// Dials `address` with explicit options. No transport is opened until a bind.
    ///
    /// # Errors
    ///
    /// Returns a network error (code 200) if the address is not a supported LDAP URL.
    pub fn dial_with(address: &str, options: DialOptions) -> Result<Self> {
        let url = match LdapUrl::parse(address) {
            Ok(url) => url,
            Err(err) => {
                options.logger.error(&format!("dial {address}: {err}"));
                return Err(err);
            }
        };
        options.logger.debug(&format!("dialed {url}"));

        Ok(Self {
            url,
            options,
            search_base: String::new(),
            state: Mutex::new(SessionState {
                phase: BindState::Unbound,
                session: None,
                start_tls: false,
                binding: None,
            }),
        })
    }

    /// Unbinds and releases the session. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.phase == BindState::Closed {
            return;
        }

        if let Some(mut session) = state.session.take() {
            if let Err(failure) = session.unbind() {
                let err = Error::from(failure);
                if err.should_log() {
                    self.logger().error(&format!("unbind {}: {err}", self.url));
                } else {
                    self.logger().debug(&format!("unbind {}: {err}", self.url));
                }
            }
        }
        state.phase = BindState::Closed;
        state.binding = None;
        state.start_tls = false;
        self.logger().debug(&format!("closed {}", self.url));
    }

    /// Current authentication state.
    #[must_use]
    pub fn state(&self) -> BindState {
        self.lock().phase
    }

    /// Dialed address.
    #[must_use]
    pub const fn url(&self) -> &LdapUrl {
        &self.url
    }

    /// URI of the server the connection is bound to.
    #[must_use]
    pub fn bound_uri(&self) -> Option<String> {
        self.lock()
            .binding
            .as_ref()
            .map(|binding| binding.bound_uri.clone())
    }

    /// Mechanism used by the successful bind.
    #[must_use]
    pub fn login_method(&self) -> Option<LoginMethod> {
        self.lock().binding.as_ref().map(|binding| binding.login_method)
    }

    /// Transport security of the bound session.
    #[must_use]
    pub fn transport_method(&self) -> Option<TransportMethod> {
        self.lock()
            .binding
            .as_ref()
            .map(|binding| binding.transport_method)
    }

    /// Default search base (set by [`Connection::login`], empty after a plain dial).
    #[must_use]
    pub fn search_base(&self) -> &str {
        &self.search_base
    }

    /// Transport establishment timeout.
    #[must_use]
    pub const fn network_timeout(&self) -> Option<Duration> {
        self.options.network_timeout
    }

    /// Per-operation time limit.
    #[must_use]
    pub const fn time_limit(&self) -> Option<Duration> {
        self.options.time_limit
    }

    pub(crate) fn set_search_base(&mut self, search_base: String) {
        self.search_base = search_base;
    }

    pub(crate) fn logger(&self) -> &dyn Logger {
        self.options.logger.as_ref()
    }

    pub(crate) fn connector(&self) -> &dyn SessionConnector {
        self.options.connector.as_ref()
    }

    pub(crate) fn transport_options(&self, start_tls: bool) -> TransportOptions {
        TransportOptions {
            network_timeout: self.options.network_timeout,
            time_limit: self.options.time_limit,
            start_tls,
            tls_verify: self.options.tls_verify,
            tls_ca_cert: self.options.tls_ca_cert.clone(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `operation` against the bound session while holding the connection lock.
    ///
    /// Failures are logged at error level and successes at debug level.
    pub(crate) fn with_bound_session<T, F>(&self, name: &str, operation: F) -> Result<T>
    where
        F: FnOnce(&mut (dyn DirectorySession + 'static)) -> Result<T>,
    {
        let mut state = self.lock();
        let result = match state.bound_session() {
            Ok(session) => operation(session),
            Err(err) => Err(err),
        };
        match &result {
            Ok(_) => self.logger().debug(&format!("{name} on {}: ok", self.url)),
            Err(err) => self.logger().error(&format!("{name} on {}: {err}", self.url)),
        }
        result
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .field("search_base", &self.search_base)
            .finish_non_exhaustive()
    }
}
