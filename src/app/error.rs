use thiserror::Error;

/// Failures the content, comment, reaction and social services report to the HTTP edge.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unknown target kind: {0}")]
    InvalidKind(String),

    #[error("unsupported locale: {0}")]
    InvalidLocale(String),

    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("translation failed: {0}")]
    Translation(#[source] anyhow::Error),

    #[error("storage failed: {0}")]
    Storage(#[source] anyhow::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

/// Postgres SQLSTATE for foreign key violations.
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";
/// Postgres SQLSTATE for unique violations.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code.into_owned())
}

pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db_err| db_err.constraint())
        .map(str::to_string)
}

/// Maps a unique violation on the account tables to a conflict naming the
/// taken field. Other errors pass through as database errors.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> ServiceError {
    if sqlstate(&err).as_deref() != Some(UNIQUE_VIOLATION) {
        return err.into();
    }
    match violated_constraint(&err).as_deref() {
        Some("users_email_key") => ServiceError::Conflict("email already registered".to_string()),
        _ => ServiceError::Conflict("username already taken".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_constraint_errors_stay_database_errors() {
        let mapped = map_unique_violation(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, ServiceError::Database(sqlx::Error::RowNotFound)));
    }
}
