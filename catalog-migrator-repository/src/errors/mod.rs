//! Error types for the catalog migrator repository.
//! Consolidates and re-exports the error types of every repository trait.
mod checkpoint_repository;
mod source_catalog;
mod target_catalog;
mod translations;

pub use checkpoint_repository::CheckpointRepositoryError;
pub use source_catalog::SourceCatalogError;
pub use target_catalog::TargetRepositoryError;
pub use translations::TranslationRepositoryError;

/// Whether a sqlx error means the database can no longer be reached.
///
/// Query-level failures (constraint violations, statement timeouts, bad rows)
/// are not connection failures: they affect one operation and the next one may
/// well succeed.
pub(crate) fn is_connection_failure(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_unavailable_sqlstate(&code)),
        _ => false,
    }
}

/// Whether a SQLSTATE reports that the server dropped or refused the session:
/// class `08` (connection exception), an administrator or crash shutdown
/// (`57P01`, `57P02`), a server still starting up (`57P03`), or no free
/// connection slot (`53300`). Query cancellation (`57014`) is not one of them.
pub(crate) fn is_unavailable_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03" | "53300")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_sqlstates() {
        for code in ["08000", "08006", "08P01", "57P01", "57P02", "57P03", "53300"] {
            assert!(is_unavailable_sqlstate(code), "{code}");
        }
    }

    #[test]
    fn test_query_level_sqlstates_are_not_unavailable() {
        // statement timeout, FK violation, undefined table, serialization failure
        for code in ["57014", "23503", "42P01", "40001"] {
            assert!(!is_unavailable_sqlstate(code), "{code}");
        }
    }

    #[test]
    fn test_connection_failures() {
        assert!(is_connection_failure(&sqlx::Error::PoolTimedOut));
        assert!(is_connection_failure(&sqlx::Error::PoolClosed));
        assert!(!is_connection_failure(&sqlx::Error::RowNotFound));
    }
}
