use thiserror::Error;

/// Error type for loader operations.
///
/// Every variant carries a rendered message; classification (retry or not) is
/// decided by [`LoaderError::is_transient`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("schema dependency error: {0}")]
    SchemaDependency(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transient store error: {0}")]
    TransientStore(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("dangling reference: {0}")]
    DanglingReference(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("fault injected: {0}")]
    FaultInjected(String),
}

impl LoaderError {
    pub fn schema_dependency<T: Into<String>>(msg: T) -> Self {
        LoaderError::SchemaDependency(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LoaderError::Validation(msg.into())
    }

    pub fn transient<T: Into<String>>(msg: T) -> Self {
        LoaderError::TransientStore(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        LoaderError::Store(msg.into())
    }

    pub fn dangling<T: Into<String>>(msg: T) -> Self {
        LoaderError::DanglingReference(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        LoaderError::Config(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        LoaderError::Io(msg.into())
    }

    pub fn fault_injection<T: Into<String>>(msg: T) -> Self {
        LoaderError::FaultInjected(msg.into())
    }

    /// Transient failures are the only ones worth retrying; everything else
    /// is deterministic and would fail the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(self, LoaderError::TransientStore(_))
    }

    /// Maps a rusqlite failure onto the taxonomy: busy/locked databases are
    /// transient, constraint and schema problems are fatal.
    pub fn from_sqlite(context: &str, err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                LoaderError::transient(format!("{context}: {err}"))
            }
            _ => LoaderError::store(format!("{context}: {err}")),
        }
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::io(err.to_string())
    }
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::io(err.to_string())
    }
}
