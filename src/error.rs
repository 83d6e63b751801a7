//! Application error type shared by the link and analytics pipeline.
//!
//! Redirect callers only ever observe "resolved" or one of the unresolvable
//! variants ([`AppError::NotFound`], [`AppError::Expired`]). Creation callers
//! observe a created link or a specific creation failure. Cache, broker and
//! publish failures have their own error types and never surface here.

use crate::utils::db_error::is_unique_violation_on_code;

/// Errors returned by the core's inbound operations and its stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    /// The target URL failed validation at creation time.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A user-supplied custom code failed validation.
    #[error("Invalid code: {0}")]
    InvalidCode(String),

    /// The conditional insert found the code already taken.
    ///
    /// Recovered by the code generator through retry; surfaced only for
    /// custom codes or when reported by the store directly.
    #[error("Code already exists: {code}")]
    CodeAlreadyExists { code: String },

    /// Every candidate within the retry budget collided.
    #[error("Keyspace exhausted: no free code after {attempts} attempts")]
    ExhaustedKeyspace { attempts: u32 },

    /// No live link is registered under the code.
    #[error("Short link not found: {code}")]
    NotFound { code: String },

    /// The link exists but its expiry has passed.
    #[error("Short link expired: {code}")]
    Expired { code: String },

    /// The source of truth could not be reached or did not answer in time.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound { code: code.into() }
    }

    pub fn expired(code: impl Into<String>) -> Self {
        Self::Expired { code: code.into() }
    }

    pub fn already_exists(code: impl Into<String>) -> Self {
        Self::CodeAlreadyExists { code: code.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for the expected "cannot resolve" outcomes.
    ///
    /// These are not system faults and are the only errors a redirect caller
    /// should translate into a "not found" response.
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Expired { .. })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation_on_code(&e) {
            return Self::CodeAlreadyExists {
                code: String::new(),
            };
        }

        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::StoreUnavailable(e.to_string())
            }
            other => Self::Internal(format!("Database error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolvable_variants() {
        assert!(AppError::not_found("abc").is_unresolvable());
        assert!(AppError::expired("abc").is_unresolvable());
        assert!(!AppError::StoreUnavailable("down".to_string()).is_unresolvable());
        assert!(!AppError::ExhaustedKeyspace { attempts: 3 }.is_unresolvable());
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_display_includes_code() {
        let err = AppError::already_exists("abc1234");
        assert!(err.to_string().contains("abc1234"));
    }
}
