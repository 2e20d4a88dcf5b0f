//! Bind with Kerberos and print every entry below a base DN.
//!
//! ```text
//! cargo run -p dirclient --features gssapi --example search_subtree -- \
//!     ldap://dc1.example.org EXAMPLE.ORG dc=example,dc=org '(objectClass=user)' cn mail
//! ```

use anyhow::{bail, Context};
use dirclient::{Connection, DialOptions, Logger, SearchRequest, SearchScope};
use std::env;
use std::sync::Arc;

/// Writes connection activity to stderr.
struct StderrLogger;

impl Logger for StderrLogger {
    fn debug(&self, message: &str) {
        eprintln!("debug: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let (Some(address), Some(realm), Some(base_dn)) = (args.next(), args.next(), args.next())
    else {
        bail!("usage: search_subtree <ldap-url> <realm> <base-dn> [filter] [attribute...]");
    };
    let filter = args.next().unwrap_or_else(|| "(objectClass=*)".to_string());
    let attributes: Vec<String> = args.collect();

    let options = DialOptions::new().with_logger(Arc::new(StderrLogger));
    let conn = Connection::dial_with(&address, options)
        .with_context(|| format!("failed to dial {address}"))?;
    conn.gssapi_bind(&realm, None)
        .with_context(|| format!("GSSAPI bind to {address} in realm {realm} failed"))?;

    let request =
        SearchRequest::new(base_dn, SearchScope::WholeSubtree, filter).with_attributes(attributes);
    let result = conn.search(&request).context("search failed")?;

    println!("{} entries", result.len());
    print!("{}", result.pretty(2));
    conn.close();
    Ok(())
}
