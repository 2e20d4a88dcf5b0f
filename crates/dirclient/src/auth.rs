//! Bind state machine.
//!
//! A connection moves from [`BindState::Unbound`] to [`BindState::Bound`] on a successful
//! bind and to [`BindState::Failed`] otherwise. There is no way back from `Failed` or
//! `Bound`; a new bind needs a fresh dial.

use crate::connection::{
    closed_error, BindState, Binding, LoginMethod, Scheme, SessionState, TransportMethod,
};
use crate::discovery::{ldap_servers, SystemResolver};
use crate::dn::domain_to_dn;
use crate::session::{DirectorySession, GssapiCredentials, SessionResult};
use crate::{Connection, ConnectionParams, DialOptions, Error, Result, ResultCode};
use std::path::Path;

impl Connection {
    /// Requests StartTLS for the next bind.
    ///
    /// # Errors
    ///
    /// Returns a network error if the connection is closed, and a param error if it is not
    /// unbound or was dialed with an `ldaps` URL.
    pub fn start_tls(&self) -> Result<()> {
        let mut state = self.lock();
        ensure_unbound(&state)?;
        if self.url().scheme() == Scheme::Ldaps {
            return Err(Error::param(
                "StartTLS cannot be combined with an ldaps URL",
            ));
        }
        state.start_tls = true;
        Ok(())
    }

    /// Opens the transport and performs a simple bind.
    ///
    /// # Errors
    ///
    /// Returns [`ResultCode::EMPTY_PASSWORD`](crate::ResultCode::EMPTY_PASSWORD) without
    /// opening a transport when `password` is empty, a param error when the connection is
    /// already bound or failed, and the translated server error when the bind is rejected.
    pub fn simple_bind(&self, dn: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::empty_password());
        }

        let mut state = self.lock();
        let start_tls = state.start_tls;
        self.bind_session(&mut state, LoginMethod::Simple, start_tls, |session| {
            session.simple_bind(dn, password)
        })
    }

    /// Opens the transport (without StartTLS) and performs one SASL/GSSAPI bind.
    ///
    /// `keytab` selects the credential store; `None` uses the default credential cache.
    ///
    /// # Process environment
    ///
    /// The Kerberos library reads the keytab location from `KRB5_CLIENT_KTNAME`, which is
    /// process-wide. Passing `Some(keytab)` sets that variable during the bind, so concurrent
    /// binds with different keytabs race. Callers that bind from several threads should set
    /// `KRB5_CLIENT_KTNAME` once at startup and pass `None` here.
    ///
    /// # Errors
    ///
    /// Returns a param error when the connection is already bound or failed, and the
    /// translated error when the bind is rejected.
    pub fn gssapi_bind(&self, realm: &str, keytab: Option<&Path>) -> Result<()> {
        let credentials = GssapiCredentials {
            realm: realm.to_string(),
            keytab: keytab.map(Path::to_path_buf),
            server_fqdn: self.url().host().to_string(),
        };

        let mut state = self.lock();
        state.start_tls = false;
        self.bind_session(&mut state, LoginMethod::Gssapi, false, |session| {
            session.gssapi_bind(&credentials)
        })
    }

    /// Logs in with `params`, trying each configured URI in order until one binds.
    ///
    /// When no URIs are configured but a domain is, the servers are discovered through DNS
    /// SRV records (site servers first, see [`crate::discovery::ldap_servers`]).
    ///
    /// The returned connection carries the configured search base, or the base derived
    /// from the domain when none is configured.
    ///
    /// # Errors
    ///
    /// Returns a param error when `params` fail validation or no server is configured or
    /// discovered, a network error when discovery fails, code 7
    /// (authMethodNotSupported) when `secured` is set without `use_gssapi`, otherwise the
    /// error of the last URI tried.
    pub fn login(params: &ConnectionParams, options: DialOptions) -> Result<Self> {
        params.ensure_valid()?;
        if params.secured && !params.use_gssapi {
            // DIGEST-MD5 is not available; never fall back to a plaintext simple bind.
            return Err(Error::new(
                ResultCode::AUTH_METHOD_NOT_SUPPORTED,
                "secured login requires GSSAPI; enable use_gssapi or clear secured",
            ));
        }

        let search_base = if params.search_base.is_empty() {
            domain_to_dn(&params.domain)
        } else {
            params.search_base.clone()
        };

        let mut options = options
            .with_network_timeout(params.network_timeout())
            .with_time_limit(params.time_limit())
            .with_tls_verify(params.tls_verify);
        if let Some(path) = &params.tls_ca_cert {
            options = options.with_tls_ca_cert(path.clone());
        }

        let uris = if params.uris.is_empty() && !params.domain.is_empty() {
            let servers = discover_servers(params, &options)?;
            options.logger.debug(&format!(
                "discovered {} servers for {}: {}",
                servers.len(),
                params.domain,
                servers.join(" ")
            ));
            servers
        } else {
            params.uris.clone()
        };

        let mut last_error = None;
        for uri in &uris {
            let address = with_default_scheme(uri, params.use_ldaps);
            match Self::login_one(&address, params, options.clone()) {
                Ok(mut conn) => {
                    conn.set_search_base(search_base);
                    return Ok(conn);
                }
                Err(err) => {
                    options.logger.error(&format!("login to {address}: {err}"));
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::param("no server URIs configured")))
    }

    fn login_one(address: &str, params: &ConnectionParams, options: DialOptions) -> Result<Self> {
        let conn = Self::dial_with(address, options)?;
        if params.use_start_tls {
            conn.start_tls()?;
        }

        if params.wants_gssapi() {
            conn.gssapi_bind(&params.domain, params.keytab.as_deref())?;
        } else {
            conn.simple_bind(&params.bind_dn, params.bind_password())?;
        }
        Ok(conn)
    }

    fn bind_session<F>(
        &self,
        state: &mut SessionState,
        login_method: LoginMethod,
        start_tls: bool,
        bind: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut (dyn DirectorySession + 'static)) -> SessionResult<()>,
    {
        ensure_unbound(state)?;

        let transport = self.transport_options(start_tls);
        let mut session = match self.connector().connect(self.url(), &transport) {
            Ok(session) => session,
            Err(failure) => {
                let err = Error::from(failure);
                self.logger()
                    .error(&format!("connect to {}: {err}", self.url()));
                state.phase = BindState::Failed;
                return Err(err);
            }
        };

        if let Err(failure) = bind(session.as_mut()) {
            let err = Error::from(failure);
            self.logger()
                .error(&format!("{login_method} bind to {}: {err}", self.url()));
            // The session stays unusable after a rejected bind.
            if let Err(failure) = session.unbind() {
                self.logger().debug(&format!(
                    "unbind {} after rejected bind: {}",
                    self.url(),
                    Error::from(failure)
                ));
            }
            state.phase = BindState::Failed;
            return Err(err);
        }

        let transport_method = if self.url().scheme() == Scheme::Ldaps {
            TransportMethod::Ldaps
        } else if start_tls {
            TransportMethod::StartTls
        } else {
            TransportMethod::Plain
        };
        self.logger().debug(&format!(
            "{login_method} bind to {} over {transport_method}",
            self.url()
        ));

        state.session = Some(session);
        state.phase = BindState::Bound;
        state.binding = Some(Binding {
            login_method,
            transport_method,
            bound_uri: self.url().as_str().to_string(),
        });
        Ok(())
    }
}

fn discover_servers(params: &ConnectionParams, options: &DialOptions) -> Result<Vec<String>> {
    match &options.resolver {
        Some(resolver) => ldap_servers(resolver.as_ref(), &params.domain, &params.site),
        None => ldap_servers(&SystemResolver::from_system_conf()?, &params.domain, &params.site),
    }
}

fn ensure_unbound(state: &SessionState) -> Result<()> {
    match state.phase {
        BindState::Unbound => Ok(()),
        BindState::Closed => Err(closed_error()),
        BindState::Bound => Err(Error::param("connection is already bound")),
        BindState::Failed => Err(Error::param(
            "a previous bind failed; dial a new connection",
        )),
    }
}

fn with_default_scheme(uri: &str, use_ldaps: bool) -> String {
    let uri = uri.trim();
    if uri.contains("://") {
        uri.to_string()
    } else if use_ldaps {
        format!("ldaps://{uri}")
    } else {
        format!("ldap://{uri}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MockSrvResolver;
    use crate::session::{MockDirectorySession, MockSessionConnector, SessionFailure};
    use crate::test_support::{
        bound, connector_for, options_with, session, RecordingLogger, ADDRESS, ADMIN_DN,
    };
    use crate::{ErrorKind, ResultCode};
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn simple_bind_success() {
        let mut session = session();
        session
            .expect_simple_bind()
            .with(eq(ADMIN_DN), eq("secret"))
            .times(1)
            .returning(|_, _| Ok(()));
        let conn = Connection::dial_with(ADDRESS, options_with(connector_for(session))).unwrap();

        conn.simple_bind(ADMIN_DN, "secret").unwrap();
        assert_eq!(conn.state(), BindState::Bound);
        assert_eq!(conn.login_method(), Some(LoginMethod::Simple));
        assert_eq!(conn.transport_method(), Some(TransportMethod::Plain));
        assert_eq!(conn.bound_uri().as_deref(), Some(ADDRESS));
    }

    #[test]
    fn empty_password_opens_no_transport() {
        let mut connector = MockSessionConnector::new();
        connector.expect_connect().never();
        let conn = Connection::dial_with(ADDRESS, options_with(connector)).unwrap();

        let err = conn.simple_bind(ADMIN_DN, "").unwrap_err();
        assert!(err.is(ResultCode::EMPTY_PASSWORD));
        assert_eq!(err.kind(), ErrorKind::ClientLocal);
        assert_eq!(conn.state(), BindState::Unbound);
    }

    #[test]
    fn rejected_bind_fails_connection_and_logs() {
        let mut session = MockDirectorySession::new();
        session
            .expect_simple_bind()
            .returning(|_, _| Err(SessionFailure::with_code(49, "invalid password")));
        session.expect_unbind().times(1).returning(|| Ok(()));
        let logger = Arc::new(RecordingLogger::default());
        let conn = Connection::dial_with(
            ADDRESS,
            options_with(connector_for(session)).with_logger(logger.clone()),
        )
        .unwrap();

        let err = conn.simple_bind(ADMIN_DN, "wrong").unwrap_err();
        assert!(err.is(ResultCode::INVALID_CREDENTIALS));
        assert_eq!(err.message(), "invalid password");
        assert_eq!(conn.state(), BindState::Failed);
        assert!(logger.errors()[0].contains("Invalid Credentials"));

        let err = conn.simple_bind(ADMIN_DN, "secret").unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn unbind_failure_after_rejected_bind_is_logged_at_debug() {
        let mut session = MockDirectorySession::new();
        session
            .expect_simple_bind()
            .returning(|_, _| Err(SessionFailure::with_code(49, "invalid password")));
        session
            .expect_unbind()
            .times(1)
            .returning(|| Err(SessionFailure::with_code(200, "broken pipe")));
        let logger = Arc::new(RecordingLogger::default());
        let conn = Connection::dial_with(
            ADDRESS,
            options_with(connector_for(session)).with_logger(logger.clone()),
        )
        .unwrap();

        let err = conn.simple_bind(ADMIN_DN, "wrong").unwrap_err();
        assert!(err.is(ResultCode::INVALID_CREDENTIALS));
        assert!(logger
            .debugs()
            .iter()
            .any(|line| line.contains("after rejected bind") && line.contains("broken pipe")));
        assert_eq!(logger.errors().len(), 1);
    }

    #[test]
    fn connect_failure_is_translated() {
        let mut connector = MockSessionConnector::new();
        connector
            .expect_connect()
            .returning(|_, _| Err(SessionFailure::with_code(200, "connection refused")));
        let conn = Connection::dial_with(ADDRESS, options_with(connector)).unwrap();

        let err = conn.simple_bind(ADMIN_DN, "secret").unwrap_err();
        assert!(err.is(ResultCode::NETWORK));
        assert_eq!(conn.state(), BindState::Failed);
    }

    #[test]
    fn rebind_is_rejected() {
        let conn = bound(session());
        let err = conn.simple_bind(ADMIN_DN, "secret").unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
        let err = conn.gssapi_bind("EXAMPLE.ORG", None).unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
        assert_eq!(conn.state(), BindState::Bound);
    }

    #[test]
    fn bind_after_close_is_network_error() {
        let connector = MockSessionConnector::new();
        let conn = Connection::dial_with(ADDRESS, options_with(connector)).unwrap();
        conn.close();
        let err = conn.simple_bind(ADMIN_DN, "secret").unwrap_err();
        assert!(err.is(ResultCode::NETWORK));
    }

    #[test]
    fn start_tls_is_passed_to_the_transport() {
        let mut session = session();
        session.expect_simple_bind().returning(|_, _| Ok(()));
        let mut connector = MockSessionConnector::new();
        connector
            .expect_connect()
            .withf(|_, options| options.start_tls)
            .times(1)
            .return_once(move |_, _| Ok(Box::new(session)));
        let conn = Connection::dial_with(ADDRESS, options_with(connector)).unwrap();

        conn.start_tls().unwrap();
        conn.simple_bind(ADMIN_DN, "secret").unwrap();
        assert_eq!(conn.transport_method(), Some(TransportMethod::StartTls));
    }

    #[test]
    fn start_tls_with_ldaps_is_rejected() {
        let connector = MockSessionConnector::new();
        let conn =
            Connection::dial_with("ldaps://ds1.example.org", options_with(connector)).unwrap();
        let err = conn.start_tls().unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn gssapi_bind_disables_start_tls_and_binds_once() {
        let mut session = session();
        session
            .expect_gssapi_bind()
            .withf(|creds| {
                creds.realm == "EXAMPLE.ORG"
                    && creds.server_fqdn == "ds1.example.org"
                    && creds.keytab == Some(PathBuf::from("/etc/krb5.keytab"))
            })
            .times(1)
            .returning(|_| Ok(()));
        session.expect_simple_bind().never();
        let mut connector = MockSessionConnector::new();
        connector
            .expect_connect()
            .withf(|_, options| !options.start_tls)
            .times(1)
            .return_once(move |_, _| Ok(Box::new(session)));
        let conn = Connection::dial_with(ADDRESS, options_with(connector)).unwrap();

        conn.start_tls().unwrap();
        conn.gssapi_bind("EXAMPLE.ORG", Some(Path::new("/etc/krb5.keytab")))
            .unwrap();
        assert_eq!(conn.state(), BindState::Bound);
        assert_eq!(conn.login_method(), Some(LoginMethod::Gssapi));
        assert_eq!(conn.transport_method(), Some(TransportMethod::Plain));
    }

    #[test]
    fn default_scheme_for_bare_hosts() {
        assert_eq!(with_default_scheme("ds1", false), "ldap://ds1");
        assert_eq!(with_default_scheme("ds1", true), "ldaps://ds1");
        assert_eq!(with_default_scheme("ldap://ds1", true), "ldap://ds1");
    }

    #[test]
    fn login_fails_over_to_next_uri() {
        let mut connector = MockSessionConnector::new();
        let mut sequence = mockall::Sequence::new();
        connector
            .expect_connect()
            .withf(|url, _| url.host() == "ds1.example.org")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Err(SessionFailure::with_code(200, "connection refused")));
        let mut second = session();
        second.expect_simple_bind().returning(|_, _| Ok(()));
        connector
            .expect_connect()
            .withf(|url, _| url.host() == "ds2.example.org")
            .times(1)
            .in_sequence(&mut sequence)
            .return_once(move |_, _| Ok(Box::new(second)));

        let params = ConnectionParams::new()
            .with_domain("example.org")
            .with_uris(["ds1.example.org", "ds2.example.org"])
            .with_simple_credentials(ADMIN_DN, "secret")
            .with_secured(false)
            .with_network_timeout_secs(5);
        let conn = Connection::login(&params, options_with(connector)).unwrap();

        assert_eq!(conn.bound_uri().as_deref(), Some("ldap://ds2.example.org"));
        assert_eq!(conn.search_base(), "DC=example,DC=org");
        assert_eq!(conn.network_timeout(), Some(std::time::Duration::from_secs(5)));
        assert_eq!(conn.time_limit(), None);
    }

    #[test]
    fn login_returns_last_error() {
        let mut connector = MockSessionConnector::new();
        connector
            .expect_connect()
            .times(2)
            .returning(|url, _| {
                Err(SessionFailure::with_code(
                    200,
                    format!("cannot reach {}", url.host()),
                ))
            });
        let params = ConnectionParams::new()
            .with_uris(["ds1.example.org", "ds2.example.org"])
            .with_simple_credentials(ADMIN_DN, "secret")
            .with_secured(false);

        let err = Connection::login(&params, options_with(connector)).unwrap_err();
        assert!(err.is(ResultCode::NETWORK));
        assert_eq!(err.message(), "cannot reach ds2.example.org");
    }

    #[test]
    fn login_uses_gssapi_when_secured() {
        let mut session = session();
        session
            .expect_gssapi_bind()
            .withf(|creds| creds.realm == "EXAMPLE.ORG" && creds.keytab.is_none())
            .times(1)
            .returning(|_| Ok(()));
        let params = ConnectionParams::new()
            .with_domain("EXAMPLE.ORG")
            .with_uris(["ldap://ds1.example.org"])
            .with_gssapi(None)
            .with_search_base("ou=people,dc=example,dc=org");

        let conn = Connection::login(&params, options_with(connector_for(session))).unwrap();
        assert_eq!(conn.login_method(), Some(LoginMethod::Gssapi));
        assert_eq!(conn.search_base(), "ou=people,dc=example,dc=org");
    }

    #[test]
    fn secured_login_without_gssapi_is_refused() {
        let mut connector = MockSessionConnector::new();
        connector.expect_connect().never();
        let params = ConnectionParams::new()
            .with_uris(["ds1.example.org"])
            .with_simple_credentials(ADMIN_DN, "secret");
        assert!(params.secured);

        let err = Connection::login(&params, options_with(connector)).unwrap_err();
        assert!(err.is(ResultCode::AUTH_METHOD_NOT_SUPPORTED));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn login_discovers_servers_when_no_uris_are_configured() {
        let mut resolver = MockSrvResolver::new();
        resolver
            .expect_lookup_srv()
            .with(eq("_ldap._tcp.Paris._sites.example.org"))
            .times(1)
            .returning(|_| Ok(vec!["ds2.example.org".to_string()]));
        resolver
            .expect_lookup_srv()
            .with(eq("_ldap._tcp.example.org"))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    "ds1.example.org".to_string(),
                    "ds2.example.org".to_string(),
                ])
            });

        let mut session = session();
        session.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        let mut connector = MockSessionConnector::new();
        connector
            .expect_connect()
            .withf(|url, _| url.as_str() == "ldap://ds2.example.org")
            .times(1)
            .return_once(move |_, _| Ok(Box::new(session)));
        let logger = Arc::new(RecordingLogger::default());
        let options = options_with(connector)
            .with_resolver(Arc::new(resolver))
            .with_logger(logger.clone());
        let params = ConnectionParams::new()
            .with_domain("example.org")
            .with_site("Paris")
            .with_simple_credentials(ADMIN_DN, "secret")
            .with_secured(false);

        let conn = Connection::login(&params, options).unwrap();
        assert_eq!(conn.bound_uri().as_deref(), Some("ldap://ds2.example.org"));
        assert!(logger
            .debugs()
            .iter()
            .any(|line| line.contains("discovered 2 servers")));
    }

    #[test]
    fn failed_discovery_is_returned() {
        let mut resolver = MockSrvResolver::new();
        resolver
            .expect_lookup_srv()
            .returning(|name| Err(Error::network(format!("no records for {name}"))));
        let mut connector = MockSessionConnector::new();
        connector.expect_connect().never();
        let params = ConnectionParams::new()
            .with_domain("example.org")
            .with_secured(false);

        let options = options_with(connector).with_resolver(Arc::new(resolver));
        let err = Connection::login(&params, options).unwrap_err();
        assert!(err.is(ResultCode::NETWORK));
    }

    #[test]
    fn login_without_uris_is_param_error() {
        let connector = MockSessionConnector::new();
        let params = ConnectionParams::new().with_secured(false);
        let err = Connection::login(&params, options_with(connector)).unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn login_rejects_invalid_params() {
        let mut connector = MockSessionConnector::new();
        connector.expect_connect().never();
        let params = ConnectionParams::new()
            .with_uris(["ds1.example.org"])
            .with_ldaps(true)
            .with_start_tls(true);
        let err = Connection::login(&params, options_with(connector)).unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn login_negotiates_start_tls_when_configured() {
        let mut session = session();
        session.expect_simple_bind().returning(|_, _| Ok(()));
        let mut connector = MockSessionConnector::new();
        connector
            .expect_connect()
            .withf(|url, options| url.as_str() == "ldap://ds1.example.org" && options.start_tls)
            .times(1)
            .return_once(move |_, _| Ok(Box::new(session)));
        let params = ConnectionParams::new()
            .with_uris(["ds1.example.org"])
            .with_simple_credentials(ADMIN_DN, "secret")
            .with_secured(false)
            .with_start_tls(true);

        let conn = Connection::login(&params, options_with(connector)).unwrap();
        assert_eq!(conn.transport_method(), Some(TransportMethod::StartTls));
    }
}
