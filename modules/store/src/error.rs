use apollo_common::db::DatabaseErrors;
use sea_orm::{DbErr, RuntimeErr};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("row not found")]
    NotFound,

    #[error("insert would duplicate an existing row")]
    UniqueViolation,

    #[error("transactional conflict")]
    Conflict,

    #[error(transparent)]
    Database(DbErr),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if err.is_duplicate() {
            return Self::UniqueViolation;
        }
        if is_serialization_failure(&err) {
            return Self::Conflict;
        }

        match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => Self::NotFound,
            err => Self::Database(err),
        }
    }
}

/// Postgres SQLSTATE 40001, the retryable serialization failure.
fn is_serialization_failure(err: &DbErr) -> bool {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(err)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(err))) => {
            err.code().as_deref() == Some("40001")
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct FakeDatabaseError(&'static str);

    impl std::fmt::Display for FakeDatabaseError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for FakeDatabaseError {}

    impl sqlx::error::DatabaseError for FakeDatabaseError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(self.0.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_err(code: &'static str) -> DbErr {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(Box::new(
            FakeDatabaseError(code),
        ))))
    }

    #[test]
    fn serialization_failure_maps_to_conflict() {
        assert!(matches!(Error::from(db_err("40001")), Error::Conflict));
    }

    #[test]
    fn other_database_errors_pass_through() {
        assert!(matches!(Error::from(db_err("23503")), Error::Database(_)));
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            Error::from(DbErr::RecordNotUpdated),
            Error::NotFound
        ));
    }
}
