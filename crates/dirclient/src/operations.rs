//! Search, modify, rename, move and delete on a bound connection.

use crate::dn::DistinguishedName;
use crate::entry::{Entry, SearchResult};
use crate::request::{
    Change, ChangeOperation, ModifyDnRequest, ModifyRequest, SearchRequest, SearchScope,
};
use crate::session::{DirectorySession, RawEntry};
use crate::{Connection, Error, Result, ResultCode};
use std::collections::BTreeMap;

/// Attribute list that asks the server for no attributes at all.
const NO_ATTRIBUTES: &str = "1.1";
/// Attribute list that asks for every user attribute.
const ALL_ATTRIBUTES: &str = "*";
const ANY_CLASS: &str = "*";
const ANY_OBJECT_FILTER: &str = "(objectclass=*)";

impl Connection {
    /// Runs a search.
    ///
    /// Matching DNs are enumerated first; each one is then read with a base-scope search for
    /// the requested attributes. Entries keep the enumeration order. A failure while reading
    /// any entry fails the whole search.
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let attributes = requested_or_all(&request.attributes);
        self.with_bound_session("search", |session| {
            let dns = enumerate_dns(session, &request.base_dn, &request.filter, request.scope)?;
            let entries = dns
                .into_iter()
                .map(|dn| read_entry(session, dn, &attributes))
                .collect::<Result<Vec<_>>>()?;
            Ok(SearchResult { entries })
        })
    }

    /// Returns the DNs matching `filter` without reading any attributes.
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn search_dns(
        &self,
        base_dn: &str,
        filter: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        self.with_bound_session("search_dns", |session| {
            enumerate_dns(session, base_dn, filter, scope)
        })
    }

    /// Applies the changes in order, one session call each.
    ///
    /// The first failing change stops the request; earlier changes stay applied. An add with
    /// no values is rejected before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns a param error for an empty add, otherwise the error of the failing change.
    pub fn modify(&self, request: &ModifyRequest) -> Result<()> {
        if let Some(change) = request
            .changes
            .iter()
            .find(|change| change.operation == ChangeOperation::Add && change.values.is_empty())
        {
            return Err(Error::param(format!(
                "add of `{}` on {} needs at least one value",
                change.attribute, request.dn
            )));
        }
        if request.changes.is_empty() {
            return Ok(());
        }

        self.with_bound_session("modify", |session| {
            for change in &request.changes {
                session.modify(&request.dn, change)?;
            }
            Ok(())
        })
    }

    /// Renames an entry, or moves it when `new_superior` is set.
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn modify_dn(&self, request: &ModifyDnRequest) -> Result<()> {
        self.with_bound_session("modify_dn", |session| {
            session.modify_dn(
                &request.dn,
                &request.new_rdn,
                request.delete_old_rdn,
                &request.new_superior,
            )?;
            Ok(())
        })
    }

    /// Deletes an entry.
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn delete(&self, dn: &str) -> Result<()> {
        self.with_bound_session("delete", |session| {
            session.delete(dn)?;
            Ok(())
        })
    }

    /// Renames an entry in place to `new_rdn` (`attr=value`), dropping the old RDN value.
    ///
    /// # Errors
    ///
    /// Returns a param error if `new_rdn` is not of the form `attr=value`.
    pub fn rename(&self, dn: &str, new_rdn: &str) -> Result<()> {
        let well_formed = new_rdn
            .split_once('=')
            .is_some_and(|(attr, value)| !attr.trim().is_empty() && !value.trim().is_empty());
        if !well_formed {
            return Err(Error::param(format!(
                "new RDN `{new_rdn}` is not of the form attr=value"
            )));
        }
        self.modify_dn(&ModifyDnRequest::rename(dn, new_rdn, true))
    }

    /// Moves an entry under `new_container`, keeping its RDN.
    ///
    /// # Errors
    ///
    /// Returns a param error if `new_container` does not exist and an invalid DN syntax error
    /// if `dn` does not parse.
    pub fn move_object(&self, dn: &str, new_container: &str) -> Result<()> {
        let new_rdn = DistinguishedName::parse(dn)?.first_rdn().to_string();
        self.with_bound_session("move_object", |session| {
            if !find_dn(session, new_container, ANY_CLASS)? {
                return Err(Error::param(format!(
                    "destination {new_container} does not exist"
                )));
            }
            session.modify_dn(dn, &new_rdn, true, new_container)?;
            Ok(())
        })
    }

    /// Values of `attribute` on `object`, matched case-insensitively. Empty when absent.
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn get_object_attribute(&self, object: &str, attribute: &str) -> Result<Vec<String>> {
        let attributes = self.get_object_attributes(object, &[attribute])?;
        Ok(attributes
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values)
            .unwrap_or_default())
    }

    /// Reads `attributes` of `object` (all user attributes when empty).
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn get_object_attributes<S: AsRef<str>>(
        &self,
        object: &str,
        attributes: &[S],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let attributes: Vec<String> = attributes.iter().map(|a| a.as_ref().to_string()).collect();
        let attributes = requested_or_all(&attributes);
        self.with_bound_session("get_object_attributes", |session| {
            let entries =
                session.search(object, SearchScope::BaseObject, ANY_OBJECT_FILTER, &attributes)?;
            Ok(entries
                .into_iter()
                .next()
                .map(|entry| entry.attributes)
                .unwrap_or_default())
        })
    }

    /// Replaces every value of `attribute` on `object`.
    ///
    /// # Errors
    ///
    /// Returns a param error when `values` is empty, before touching the connection.
    pub fn set_object_attribute<S: AsRef<str>>(
        &self,
        object: &str,
        attribute: &str,
        values: &[S],
    ) -> Result<()> {
        if values.is_empty() {
            return Err(Error::param(format!(
                "no values given for `{attribute}` on {object}"
            )));
        }
        let change = Change::new(
            ChangeOperation::Replace,
            attribute,
            values.iter().map(|value| value.as_ref().to_string()),
        );
        self.with_bound_session("set_object_attribute", |session| {
            session.modify(object, &change)?;
            Ok(())
        })
    }

    /// Removes `attribute` from `object`. An attribute that is already absent is not an error.
    ///
    /// # Errors
    ///
    /// Returns the translated session error.
    pub fn clear_object_attribute(&self, object: &str, attribute: &str) -> Result<()> {
        let change = Change::new(ChangeOperation::Delete, attribute, Vec::<String>::new());
        self.with_bound_session("clear_object_attribute", |session| {
            match session.modify(object, &change).map_err(Error::from) {
                Err(err) if err.is(ResultCode::NO_SUCH_ATTRIBUTE) => Ok(()),
                other => other,
            }
        })
    }

    /// Returns true if an entry exists at `dn`.
    ///
    /// # Errors
    ///
    /// Returns the translated session error for anything other than `noSuchObject`.
    pub fn dn_exists(&self, dn: &str) -> Result<bool> {
        self.dn_exists_with_class(dn, ANY_CLASS)
    }

    /// Returns true if an entry of `object_class` exists at `dn`.
    ///
    /// # Errors
    ///
    /// Returns the translated session error for anything other than `noSuchObject`.
    pub fn dn_exists_with_class(&self, dn: &str, object_class: &str) -> Result<bool> {
        self.with_bound_session("dn_exists", |session| find_dn(session, dn, object_class))
    }
}

fn requested_or_all(attributes: &[String]) -> Vec<String> {
    if attributes.is_empty() {
        vec![ALL_ATTRIBUTES.to_string()]
    } else {
        attributes.to_vec()
    }
}

fn enumerate_dns(
    session: &mut dyn DirectorySession,
    base_dn: &str,
    filter: &str,
    scope: SearchScope,
) -> Result<Vec<String>> {
    let entries = session.search(base_dn, scope, filter, &[NO_ATTRIBUTES.to_string()])?;
    Ok(entries.into_iter().map(|entry| entry.dn).collect())
}

fn read_entry(
    session: &mut dyn DirectorySession,
    dn: String,
    attributes: &[String],
) -> Result<Entry> {
    let entries = session.search(&dn, SearchScope::BaseObject, ANY_OBJECT_FILTER, attributes)?;
    Ok(match entries.into_iter().next() {
        Some(raw) => Entry::from(RawEntry { dn, ..raw }),
        None => Entry::empty(dn),
    })
}

fn find_dn(session: &mut dyn DirectorySession, dn: &str, object_class: &str) -> Result<bool> {
    let filter = format!("(objectclass={object_class})");
    match session
        .search(dn, SearchScope::BaseObject, &filter, &[NO_ATTRIBUTES.to_string()])
        .map_err(Error::from)
    {
        Ok(entries) => Ok(!entries.is_empty()),
        Err(err) if err.is(ResultCode::NO_SUCH_OBJECT) => Ok(false),
        Err(err) => Err(err),
    }
}
