//! Implements a struct that holds the state of the REST server.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// The environment the server is deployed in.
///
/// Controls how much detail about unexpected errors is sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Environment {
    /// Local development, error messages are included in 500 responses.
    Development,
    /// Error messages are only written to the server logs.
    #[default]
    Production,
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The environment the server is running in.
    pub environment: Environment,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, environment: Environment) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            environment,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
