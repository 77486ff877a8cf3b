use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input rejected before any work is done.
    #[error("{0}")]
    Validation(String),

    /// Absent, soft-deleted, or owned by another user.
    #[error("{0}")]
    NotFound(String),

    /// Visible to the caller but owned by someone else.
    #[error("{0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The nutrition lookup service failed.
    #[error("nutrition lookup failed: {0}")]
    Lookup(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

/// Map "no rows" to a `NotFound` with the given message, pass everything else through.
pub(crate) fn not_found_or_store(err: rusqlite::Error, what: impl Into<String>) -> Error {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Error::NotFound(what.into()),
        other => Error::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err = not_found_or_store(rusqlite::Error::QueryReturnedNoRows, "Recipe 7 not found");
        assert!(matches!(err, Error::NotFound(ref m) if m == "Recipe 7 not found"));
    }

    #[test]
    fn test_other_errors_stay_store() {
        let err = not_found_or_store(rusqlite::Error::InvalidQuery, "ignored");
        assert!(matches!(err, Error::Store(_)));
    }
}
