//! Domain controller discovery through DNS SRV records.
//!
//! Servers of the caller's site (`_ldap._tcp.<site>._sites.<domain>`) come first, followed by
//! every other server of the domain (`_ldap._tcp.<domain>`), so a login still finds a
//! controller when the whole site is down.

use crate::{Error, Result};
use hickory_resolver::Resolver;
use std::fmt;

/// Looks up SRV records.
#[cfg_attr(test, mockall::automock)]
pub trait SrvResolver: Send + Sync {
    /// Returns the target host names of the SRV records at `name`, in answer order.
    fn lookup_srv(&self, name: &str) -> Result<Vec<String>>;
}

/// Resolver configured from the system (`/etc/resolv.conf` or the platform equivalent).
pub struct SystemResolver {
    inner: Resolver,
}

impl SystemResolver {
    /// Loads the system resolver configuration.
    ///
    /// # Errors
    ///
    /// Returns a network error (code 200) if the configuration cannot be read.
    pub fn from_system_conf() -> Result<Self> {
        let inner = Resolver::from_system_conf().map_err(|err| {
            Error::network(format!("failed to load resolver configuration: {err}"))
        })?;
        Ok(Self { inner })
    }
}

impl fmt::Debug for SystemResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemResolver").finish_non_exhaustive()
    }
}

impl SrvResolver for SystemResolver {
    fn lookup_srv(&self, name: &str) -> Result<Vec<String>> {
        let lookup = self
            .inner
            .srv_lookup(name)
            .map_err(|err| Error::network(format!("SRV lookup for {name} failed: {err}")))?;
        Ok(lookup
            .iter()
            .map(|srv| srv.target().to_utf8().trim_end_matches('.').to_string())
            .collect())
    }
}

/// Lists the LDAP servers of `domain`, site servers first when `site` is set.
///
/// A failed site lookup is ignored. Servers returned by both lookups appear once.
///
/// # Errors
///
/// Returns the error of the domain-wide lookup.
pub fn ldap_servers(resolver: &dyn SrvResolver, domain: &str, site: &str) -> Result<Vec<String>> {
    let mut servers = if site.is_empty() {
        Vec::new()
    } else {
        resolver
            .lookup_srv(&format!("_ldap._tcp.{site}._sites.{domain}"))
            .unwrap_or_default()
    };

    for server in resolver.lookup_srv(&format!("_ldap._tcp.{domain}"))? {
        if !servers.iter().any(|known| known.eq_ignore_ascii_case(&server)) {
            servers.push(server);
        }
    }
    Ok(servers)
}
