//! Repository trait for short link data access.

use crate::domain::entities::{Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable mapping of code to target URL; the source of truth.
///
/// The store knows nothing about caching. Its conditional insert is the only
/// place where code uniqueness is decided.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts the link only if its code is absent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CodeAlreadyExists`] if the code is taken by any link,
    /// live, expired or deleted. A rejected insert has no side effects.
    ///
    /// Returns [`AppError::StoreUnavailable`] or [`AppError::Internal`] on
    /// storage failures.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Reads a resolvable link.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no link holds the code or it was deleted
    /// - [`AppError::Expired`] if `expires_at` has passed
    async fn get(&self, code: &str) -> Result<Link, AppError>;

    /// Soft-deletes a link. The code stays reserved.
    ///
    /// Returns `Ok(true)` if a live link was deleted, `Ok(false)` if none was
    /// found or it was already deleted.
    async fn delete(&self, code: &str) -> Result<bool, AppError>;
}
