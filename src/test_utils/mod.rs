#![allow(missing_docs)]

use axum_test::TestServer;
use rusqlite::Connection;

use crate::{AppState, Environment, build_router, db::initialize};

/// Get an in-memory database with all the tables created.
#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

/// Get a test server for the full router backed by an in-memory database.
///
/// The state is returned so that tests can inspect the database directly.
#[track_caller]
pub(crate) fn get_test_server_and_state() -> (TestServer, AppState) {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    let state = AppState::new(connection, Environment::Development)
        .expect("Could not create app state.");
    let server =
        TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");

    (server, state)
}
