//! Shared fixtures for unit tests.

use crate::session::{MockDirectorySession, MockSessionConnector};
use crate::{Connection, DialOptions, Logger, NullLogger};
use std::sync::{Arc, Mutex};

pub(crate) const ADDRESS: &str = "ldap://ds1.example.org";
pub(crate) const ADMIN_DN: &str = "cn=admin,dc=example,dc=org";

#[derive(Default)]
pub(crate) struct RecordingLogger {
    lines: Mutex<Vec<(bool, String)>>,
}

impl RecordingLogger {
    pub(crate) fn errors(&self) -> Vec<String> {
        self.filtered(true)
    }

    pub(crate) fn debugs(&self) -> Vec<String> {
        self.filtered(false)
    }

    fn filtered(&self, error: bool) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(is_error, _)| *is_error == error)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push((false, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push((true, message.to_string()));
    }
}

/// Session mock that tolerates the unbind issued when the connection is dropped.
pub(crate) fn session() -> MockDirectorySession {
    let mut session = MockDirectorySession::new();
    session.expect_unbind().returning(|| Ok(()));
    session
}

pub(crate) fn connector_for(session: MockDirectorySession) -> MockSessionConnector {
    let mut connector = MockSessionConnector::new();
    connector
        .expect_connect()
        .times(1)
        .return_once(move |_, _| Ok(Box::new(session)));
    connector
}

pub(crate) fn options_with(connector: MockSessionConnector) -> DialOptions {
    DialOptions::new()
        .with_logger(Arc::new(NullLogger))
        .with_connector(Arc::new(connector))
}

pub(crate) fn bound(session: MockDirectorySession) -> Connection {
    bound_with_logger(session, Arc::new(NullLogger))
}

pub(crate) fn bound_with_logger(
    mut session: MockDirectorySession,
    logger: Arc<dyn Logger>,
) -> Connection {
    session
        .expect_simple_bind()
        .times(1)
        .returning(|_, _| Ok(()));
    let options = options_with(connector_for(session)).with_logger(logger);
    let conn = Connection::dial_with(ADDRESS, options).unwrap();
    conn.simple_bind(ADMIN_DN, "secret").unwrap();
    conn
}
