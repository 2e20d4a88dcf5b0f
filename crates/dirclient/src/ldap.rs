//! Production session transport backed by `ldap3`'s blocking [`LdapConn`].

use crate::connection::{LdapUrl, Scheme};
use crate::dn::same_dn;
use crate::request::{Change, ChangeOperation, SearchScope};
use crate::session::{
    DirectorySession, GssapiCredentials, RawEntry, SessionConnector, SessionFailure,
    SessionResult, TransportOptions,
};
use crate::ResultCode;
use ldap3::{LdapConn, LdapConnSettings, LdapError, Mod, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use std::collections::HashSet;
use std::fs;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens [`Ldap3Session`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

impl Ldap3Connector {
    /// Creates a new connector instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SessionConnector for Ldap3Connector {
    fn connect(
        &self,
        url: &LdapUrl,
        options: &TransportOptions,
    ) -> SessionResult<Box<dyn DirectorySession>> {
        if url.scheme() == Scheme::Cldap {
            return Err(SessionFailure::with_code(
                ResultCode::NOT_SUPPORTED,
                "connectionless LDAP is not supported by this transport",
            ));
        }

        let settings = build_ldap_settings(options)?;
        debug!(url = %url, start_tls = options.start_tls, "opening LDAP transport");
        let conn =
            LdapConn::with_settings(settings, url.as_str()).map_err(failure_from_ldap_error)?;
        Ok(Box::new(Ldap3Session {
            inner: conn,
            time_limit: options.time_limit,
        }))
    }
}

/// One `ldap3` connection.
pub struct Ldap3Session {
    inner: LdapConn,
    time_limit: Option<Duration>,
}

impl Ldap3Session {
    /// Applies the per-operation time limit to the next request.
    fn handle(&mut self) -> &mut LdapConn {
        match self.time_limit {
            Some(limit) => self.inner.with_timeout(limit),
            None => &mut self.inner,
        }
    }
}

impl DirectorySession for Ldap3Session {
    fn simple_bind(&mut self, dn: &str, password: &str) -> SessionResult<()> {
        self.handle()
            .simple_bind(dn, password)
            .and_then(ldap3::LdapResult::success)
            .map_err(failure_from_ldap_error)?;
        Ok(())
    }

    #[cfg(feature = "gssapi")]
    fn gssapi_bind(&mut self, credentials: &GssapiCredentials) -> SessionResult<()> {
        if let Some(keytab) = &credentials.keytab {
            // Process-wide; see `Connection::gssapi_bind`.
            std::env::set_var("KRB5_CLIENT_KTNAME", keytab);
        }
        debug!(
            realm = %credentials.realm,
            server = %credentials.server_fqdn,
            "performing SASL/GSSAPI bind"
        );
        self.handle()
            .sasl_gssapi_bind(&credentials.server_fqdn)
            .and_then(ldap3::LdapResult::success)
            .map_err(failure_from_ldap_error)?;
        Ok(())
    }

    #[cfg(not(feature = "gssapi"))]
    fn gssapi_bind(&mut self, credentials: &GssapiCredentials) -> SessionResult<()> {
        warn!(realm = %credentials.realm, "GSSAPI requested but the gssapi feature is disabled");
        Err(SessionFailure::with_code(
            ResultCode::AUTH_METHOD_NOT_SUPPORTED,
            "GSSAPI support is not compiled in",
        ))
    }

    fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[String],
    ) -> SessionResult<Vec<RawEntry>> {
        let (entries, _) = self
            .handle()
            .search(base_dn, ldap_scope(scope), filter, attributes)
            .and_then(ldap3::SearchResult::success)
            .map_err(failure_from_ldap_error)?;

        let entries = entries
            .into_iter()
            .map(|entry| raw_entry(SearchEntry::construct(entry)))
            .collect();
        Ok(if scope == SearchScope::Subordinate {
            without_base(entries, base_dn)
        } else {
            entries
        })
    }

    fn modify(&mut self, dn: &str, change: &Change) -> SessionResult<()> {
        let values = change.values.iter().cloned().collect::<HashSet<_>>();
        let modification = match change.operation {
            ChangeOperation::Add => Mod::Add(change.attribute.clone(), values),
            ChangeOperation::Delete => Mod::Delete(change.attribute.clone(), values),
            ChangeOperation::Replace => Mod::Replace(change.attribute.clone(), values),
        };

        self.handle()
            .modify(dn, vec![modification])
            .and_then(ldap3::LdapResult::success)
            .map_err(failure_from_ldap_error)?;
        Ok(())
    }

    fn modify_dn(
        &mut self,
        dn: &str,
        new_rdn: &str,
        delete_old_rdn: bool,
        new_superior: &str,
    ) -> SessionResult<()> {
        let new_superior = (!new_superior.is_empty()).then_some(new_superior);
        self.handle()
            .modifydn(dn, new_rdn, delete_old_rdn, new_superior)
            .and_then(ldap3::LdapResult::success)
            .map_err(failure_from_ldap_error)?;
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> SessionResult<()> {
        self.handle()
            .delete(dn)
            .and_then(ldap3::LdapResult::success)
            .map_err(failure_from_ldap_error)?;
        Ok(())
    }

    fn unbind(&mut self) -> SessionResult<()> {
        self.inner.unbind().map_err(failure_from_ldap_error)
    }
}

fn build_ldap_settings(options: &TransportOptions) -> SessionResult<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_starttls(options.start_tls);
    if let Some(timeout) = options.network_timeout {
        settings = settings.set_conn_timeout(timeout);
    }

    if !options.tls_verify {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| local_failure(format!("failed to construct TLS connector: {err}")))?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = &options.tls_ca_cert {
        let pem = fs::read(cert_path).map_err(|err| {
            local_failure(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| local_failure(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| local_failure(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn local_failure(message: String) -> SessionFailure {
    SessionFailure::with_code(ResultCode::LOCAL_ERROR, message)
}

const fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::BaseObject => Scope::Base,
        SearchScope::SingleLevel => Scope::OneLevel,
        // ldap3 has no subordinate scope; the base entry is filtered out after the search.
        SearchScope::WholeSubtree | SearchScope::Subordinate | SearchScope::Default => {
            Scope::Subtree
        }
    }
}

/// Drops the base entry from a subtree result. DNs are compared in parsed form.
fn without_base(entries: Vec<RawEntry>, base_dn: &str) -> Vec<RawEntry> {
    entries
        .into_iter()
        .filter(|entry| !same_dn(&entry.dn, base_dn))
        .collect()
}

fn raw_entry(entry: SearchEntry) -> RawEntry {
    RawEntry {
        dn: entry.dn,
        attributes: entry.attrs.into_iter().collect(),
        binary_attributes: entry.bin_attrs.into_iter().collect(),
    }
}

fn failure_from_ldap_error(err: LdapError) -> SessionFailure {
    match &err {
        LdapError::LdapResult { result } => {
            let message = if result.text.is_empty() {
                ResultCode::new(i32::try_from(result.rc).unwrap_or(-1))
                    .description()
                    .to_string()
            } else {
                result.text.clone()
            };
            SessionFailure::with_code(result.rc, message)
        }
        LdapError::Timeout { .. } => SessionFailure::with_code(ResultCode::TIMEOUT, &err),
        LdapError::Io { .. } => SessionFailure::with_code(ResultCode::NETWORK, &err),
        _ => SessionFailure::new(err.to_string()),
    }
}
