//! Classification of PostgreSQL errors raised by the link store.

/// Name of the unique constraint guarding the code column of `links`.
pub const LINKS_CODE_CONSTRAINT: &str = "links_pkey";

/// Returns true when `e` is a unique violation on the links code key.
///
/// The conditional insert uses `ON CONFLICT DO NOTHING`, so this only fires
/// for statements that bypass it (bulk imports, manual inserts).
pub fn is_unique_violation_on_code(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some(LINKS_CODE_CONSTRAINT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_is_not_violation() {
        assert!(!is_unique_violation_on_code(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation_on_code(&sqlx::Error::PoolTimedOut));
    }
}
