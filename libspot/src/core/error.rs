//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid spot type '{0}'")]
    InvalidSpotType(String),

    #[error("marker '{0}' not found")]
    MarkerNotFound(String),

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    /// Whether this error was caused by the data the client supplied rather
    /// than by the server or the database
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::InvalidSpotType(_))
    }
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
