//! Connection parameters for directory logins.
//!
//! [`ConnectionParams`] describes which servers to try, how to authenticate, and which
//! transport security to negotiate. It can be built in code or loaded from JSON; the
//! original option spellings (`uries`, `binddn`, `bindpw`, `nettimeout`, `timelimit`) are
//! accepted as aliases.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Timeout value meaning "wait indefinitely".
pub const UNBOUNDED: i64 = -1;

/// Parameters used to log in to one of a list of directory servers.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_transport_selection"))]
pub struct ConnectionParams {
    /// DNS domain (also used as the Kerberos realm for GSSAPI logins)
    #[serde(default)]
    pub domain: String,

    /// Site within the domain; its servers are tried first when servers are discovered
    #[serde(default)]
    pub site: String,

    /// Server URIs tried in order; entries without a scheme get `ldap://` or `ldaps://`.
    /// When empty, servers are discovered through DNS SRV records for `domain`
    #[serde(default, alias = "uries")]
    pub uris: Vec<String>,

    /// DN used for simple binds
    #[serde(default, alias = "binddn")]
    pub bind_dn: String,

    /// Password used for simple binds
    #[serde(
        default = "empty_secret",
        alias = "bindpw",
        deserialize_with = "deserialize_secret"
    )]
    pub bind_password: SecretString,

    /// Default search base (derived from `domain` when empty)
    #[serde(default)]
    pub search_base: String,

    /// Require a SASL bind; GSSAPI is the only mechanism offered, `false` selects a simple bind
    #[serde(default = "default_secured")]
    pub secured: bool,

    /// Use SASL/GSSAPI (Kerberos) authentication when `secured` is set
    #[serde(default)]
    pub use_gssapi: bool,

    /// Use implicit TLS (`ldaps://`)
    #[serde(default)]
    pub use_ldaps: bool,

    /// Negotiate StartTLS before binding
    #[serde(default, alias = "use_tls")]
    pub use_start_tls: bool,

    /// Transport establishment timeout in seconds, `-1` for unbounded
    #[validate(range(min = -1))]
    #[serde(default = "default_unbounded", alias = "nettimeout")]
    pub network_timeout_secs: i64,

    /// Per-operation time limit in seconds, `-1` for unbounded
    #[validate(range(min = -1))]
    #[serde(default = "default_unbounded", alias = "timelimit")]
    pub time_limit_secs: i64,

    /// Keytab used to obtain Kerberos credentials for GSSAPI logins
    #[serde(default)]
    pub keytab: Option<PathBuf>,

    /// Whether to verify server TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional PEM file with an additional trusted CA certificate
    #[serde(default)]
    pub tls_ca_cert: Option<PathBuf>,
}

const fn default_secured() -> bool {
    true
}

const fn default_unbounded() -> i64 {
    UNBOUNDED
}

const fn default_tls_verify() -> bool {
    true
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn validate_transport_selection(
    params: &ConnectionParams,
) -> std::result::Result<(), ValidationError> {
    if params.use_ldaps && params.use_start_tls {
        let mut error = ValidationError::new("transport");
        error.message = Some("use_ldaps and use_start_tls are mutually exclusive".into());
        return Err(error);
    }
    Ok(())
}

fn seconds(value: i64) -> Option<Duration> {
    u64::try_from(value).ok().map(Duration::from_secs)
}

impl ConnectionParams {
    /// Creates parameters with the defaults: secured, no protocol flags, unbounded timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            domain: String::new(),
            site: String::new(),
            uris: Vec::new(),
            bind_dn: String::new(),
            bind_password: empty_secret(),
            search_base: String::new(),
            secured: default_secured(),
            use_gssapi: false,
            use_ldaps: false,
            use_start_tls: false,
            network_timeout_secs: UNBOUNDED,
            time_limit_secs: UNBOUNDED,
            keytab: None,
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
        }
    }

    /// Parses and validates parameters from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a param error if the document is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let params: Self = serde_json::from_str(json)?;
        params.ensure_valid()?;
        Ok(params)
    }

    /// Runs the validation rules: timeouts are at least `-1` and `use_ldaps` excludes
    /// `use_start_tls`.
    ///
    /// # Errors
    ///
    /// Returns a param error describing every failed rule.
    pub fn ensure_valid(&self) -> Result<(), Error> {
        self.validate()?;
        Ok(())
    }

    /// Set the DNS domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the site whose servers discovery prefers.
    #[must_use]
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    /// Set the server URIs.
    #[must_use]
    pub fn with_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Set simple-bind credentials.
    #[must_use]
    pub fn with_simple_credentials(
        mut self,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Self {
        self.bind_dn = bind_dn.into();
        self.bind_password = SecretString::from(bind_password.into());
        self
    }

    /// Set the default search base.
    #[must_use]
    pub fn with_search_base(mut self, search_base: impl Into<String>) -> Self {
        self.search_base = search_base.into();
        self
    }

    /// Set whether a SASL mechanism is used.
    #[must_use]
    pub const fn with_secured(mut self, secured: bool) -> Self {
        self.secured = secured;
        self
    }

    /// Enable GSSAPI with an optional keytab.
    #[must_use]
    pub fn with_gssapi(mut self, keytab: Option<PathBuf>) -> Self {
        self.use_gssapi = true;
        self.secured = true;
        self.keytab = keytab;
        self
    }

    /// Select implicit TLS.
    #[must_use]
    pub const fn with_ldaps(mut self, use_ldaps: bool) -> Self {
        self.use_ldaps = use_ldaps;
        self
    }

    /// Select StartTLS.
    #[must_use]
    pub const fn with_start_tls(mut self, use_start_tls: bool) -> Self {
        self.use_start_tls = use_start_tls;
        self
    }

    /// Set the network timeout in seconds (`-1` for unbounded).
    #[must_use]
    pub const fn with_network_timeout_secs(mut self, seconds: i64) -> Self {
        self.network_timeout_secs = seconds;
        self
    }

    /// Set the per-operation time limit in seconds (`-1` for unbounded).
    #[must_use]
    pub const fn with_time_limit_secs(mut self, seconds: i64) -> Self {
        self.time_limit_secs = seconds;
        self
    }

    /// Set TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set an additional trusted CA certificate.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Network timeout as a duration; `None` means unbounded.
    #[must_use]
    pub fn network_timeout(&self) -> Option<Duration> {
        seconds(self.network_timeout_secs)
    }

    /// Operation time limit as a duration; `None` means unbounded.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        seconds(self.time_limit_secs)
    }

    /// Exposes the bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }

    /// Returns true when a login with these parameters uses GSSAPI.
    #[must_use]
    pub const fn wants_gssapi(&self) -> bool {
        self.secured && self.use_gssapi
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultCode;

    #[test]
    fn test_defaults() {
        let params = ConnectionParams::default();
        assert!(params.secured);
        assert!(!params.use_gssapi);
        assert!(!params.use_ldaps);
        assert!(!params.use_start_tls);
        assert_eq!(params.network_timeout_secs, -1);
        assert_eq!(params.time_limit_secs, -1);
        assert!(params.network_timeout().is_none());
        assert!(params.time_limit().is_none());
        assert!(params.tls_verify);
        assert_eq!(params.bind_password(), "");
    }

    #[test]
    fn test_builder() {
        let params = ConnectionParams::new()
            .with_domain("example.org")
            .with_site("Paris")
            .with_uris(["ds1.example.org", "ldap://ds2.example.org"])
            .with_simple_credentials("cn=admin,dc=example,dc=org", "secret")
            .with_search_base("dc=example,dc=org")
            .with_network_timeout_secs(5)
            .with_time_limit_secs(30)
            .with_start_tls(true);

        assert_eq!(params.site, "Paris");
        assert_eq!(params.uris.len(), 2);
        assert_eq!(params.bind_dn, "cn=admin,dc=example,dc=org");
        assert_eq!(params.bind_password(), "secret");
        assert_eq!(params.network_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(params.time_limit(), Some(Duration::from_secs(30)));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_json_with_original_spellings() {
        let json = r#"{
            "domain": "example.org",
            "site": "Paris",
            "uries": ["ldap://ds1.example.org"],
            "binddn": "cn=admin,dc=example,dc=org",
            "bindpw": "secret",
            "secured": false,
            "nettimeout": 10,
            "timelimit": -1
        }"#;
        let params = ConnectionParams::from_json(json).unwrap();
        assert_eq!(params.site, "Paris");
        assert_eq!(params.uris, vec!["ldap://ds1.example.org".to_string()]);
        assert_eq!(params.bind_dn, "cn=admin,dc=example,dc=org");
        assert_eq!(params.bind_password(), "secret");
        assert!(!params.secured);
        assert_eq!(params.network_timeout(), Some(Duration::from_secs(10)));
        assert!(params.time_limit().is_none());
    }

    #[test]
    fn test_from_json_defaults() {
        let params = ConnectionParams::from_json("{}").unwrap();
        assert!(params.secured);
        assert_eq!(params.network_timeout_secs, -1);
        assert!(params.uris.is_empty());
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let params = ConnectionParams::new().with_simple_credentials("cn=a", "hunter2");
        assert!(!format!("{params:?}").contains("hunter2"));
    }

    #[test]
    fn test_validation_rejects_conflicting_transport() {
        let params = ConnectionParams::new().with_ldaps(true).with_start_tls(true);
        assert!(params.validate().is_err());

        let err = ConnectionParams::from_json(r#"{"use_ldaps": true, "use_start_tls": true}"#)
            .unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn test_validation_timeout_range() {
        let params = ConnectionParams::new().with_network_timeout_secs(-2);
        assert!(params.validate().is_err());

        let params = ConnectionParams::new().with_time_limit_secs(-5);
        assert!(params.validate().is_err());

        let params = ConnectionParams::new().with_time_limit_secs(0);
        assert!(params.validate().is_ok());

        let err = ConnectionParams::new()
            .with_network_timeout_secs(-3)
            .ensure_valid()
            .unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn test_malformed_json_is_param_error() {
        let err = ConnectionParams::from_json("{not json").unwrap_err();
        assert!(err.is(ResultCode::PARAM_ERROR));
    }

    #[test]
    fn test_wants_gssapi() {
        assert!(ConnectionParams::new().with_gssapi(None).wants_gssapi());
        assert!(!ConnectionParams::new()
            .with_gssapi(None)
            .with_secured(false)
            .wants_gssapi());
    }
}
