//! SQLSTATE classification shared by the Postgres adapters.

use chainaudit_core::AppError;

pub(crate) const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Wraps a failed `operation`, marking connection loss, pool exhaustion,
/// serialization failures and deadlocks as transient.
pub(crate) fn storage_error(operation: &str, error: &sqlx::Error) -> AppError {
    if is_transient(error) {
        AppError::TransientStorage(format!("failed to {operation}: {error}"))
    } else {
        AppError::Internal(format!("failed to {operation}: {error}"))
    }
}

pub(crate) fn database_code(error: &sqlx::Error) -> Option<String> {
    error
        .as_database_error()
        .and_then(|database_error| database_error.code())
        .map(|code| code.into_owned())
}

fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(_) => matches!(
            database_code(error).as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ),
        _ => false,
    }
}
