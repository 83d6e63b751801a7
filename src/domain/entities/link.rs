//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A shortened URL link with metadata.
///
/// The `code` is immutable once assigned and is never handed out again, even
/// after the link expires or is deleted. Cache entries are projections of this
/// struct and can always be rebuilt from the link store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Link {
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        code: String,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code,
            target_url,
            created_at,
            expires_at,
            deleted_at,
        }
    }

    /// Returns true if the link has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Time left until expiry, `None` for links that never expire.
    ///
    /// Already-expired links report a zero duration.
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|e| (e - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Input data for creating a new link.
///
/// `created_at` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub code: String,
    pub target_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn link(expires_at: Option<DateTime<Utc>>, deleted_at: Option<DateTime<Utc>>) -> Link {
        Link::new(
            "abc123".to_string(),
            "https://example.com".to_string(),
            Utc::now(),
            expires_at,
            deleted_at,
        )
    }

    #[test]
    fn test_link_without_expiry() {
        let link = link(None, None);

        assert!(!link.is_deleted());
        assert!(!link.is_expired());
        assert!(link.time_to_expiry(Utc::now()).is_none());
    }

    #[test]
    fn test_link_is_deleted() {
        assert!(link(None, Some(Utc::now())).is_deleted());
    }

    #[test]
    fn test_link_is_expired() {
        let link = link(Some(Utc::now() - ChronoDuration::seconds(1)), None);

        assert!(link.is_expired());
        assert_eq!(link.time_to_expiry(Utc::now()), Some(Duration::ZERO));
    }

    #[test]
    fn test_link_expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let link = link(Some(now), None);

        assert!(link.is_expired_at(now));
        assert!(!link.is_expired_at(now - ChronoDuration::milliseconds(1)));
    }

    #[test]
    fn test_time_to_expiry_in_future() {
        let now = Utc::now();
        let link = link(Some(now + ChronoDuration::seconds(90)), None);

        assert_eq!(link.time_to_expiry(now), Some(Duration::from_secs(90)));
    }
}
