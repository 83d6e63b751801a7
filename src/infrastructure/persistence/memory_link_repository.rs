//! In-process link repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Link store backed by a concurrent map.
///
/// The conditional insert runs under the map's shard lock for the code, which
/// gives the same insert-if-absent guarantee as a unique constraint. Used by
/// tests and single-process deployments.
#[derive(Default)]
pub struct MemoryLinkRepository {
    links: DashMap<String, Link>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of codes ever allocated, deleted ones included.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        match self.links.entry(new_link.code) {
            Entry::Occupied(entry) => Err(AppError::already_exists(entry.key().clone())),
            Entry::Vacant(entry) => {
                let link = Link::new(
                    entry.key().clone(),
                    new_link.target_url,
                    Utc::now(),
                    new_link.expires_at,
                    None,
                );
                entry.insert(link.clone());
                Ok(link)
            }
        }
    }

    async fn get(&self, code: &str) -> Result<Link, AppError> {
        let link = self
            .links
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(code))?;

        if link.is_deleted() {
            return Err(AppError::not_found(code));
        }
        if link.is_expired() {
            return Err(AppError::expired(code));
        }

        Ok(link)
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        let Some(mut entry) = self.links.get_mut(code) else {
            return Ok(false);
        };

        if entry.is_deleted() {
            return Ok(false);
        }

        entry.deleted_at = Some(Utc::now());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_link(code: &str) -> NewLink {
        NewLink {
            code: code.to_string(),
            target_url: "https://example.com/".to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = MemoryLinkRepository::new();

        let created = repo.create(new_link("abc123")).await.unwrap();
        let fetched = repo.get("abc123").await.unwrap();

        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn test_conditional_insert_rejects_taken_code() {
        let repo = MemoryLinkRepository::new();
        repo.create(new_link("abc123")).await.unwrap();

        let mut second = new_link("abc123");
        second.target_url = "https://other.example/".to_string();
        let result = repo.create(second).await;

        assert_eq!(result.unwrap_err(), AppError::already_exists("abc123"));
        assert_eq!(
            repo.get("abc123").await.unwrap().target_url,
            "https://example.com/"
        );
    }

    #[tokio::test]
    async fn test_get_unknown_and_expired() {
        let repo = MemoryLinkRepository::new();
        let mut expired = new_link("old1");
        expired.expires_at = Some(Utc::now() - Duration::seconds(1));
        repo.create(expired).await.unwrap();

        assert_eq!(
            repo.get("missing").await.unwrap_err(),
            AppError::not_found("missing")
        );
        assert_eq!(repo.get("old1").await.unwrap_err(), AppError::expired("old1"));
    }

    #[tokio::test]
    async fn test_deleted_code_is_never_reused() {
        let repo = MemoryLinkRepository::new();
        repo.create(new_link("abc123")).await.unwrap();

        assert!(repo.delete("abc123").await.unwrap());
        assert!(!repo.delete("abc123").await.unwrap());
        assert!(repo.get("abc123").await.unwrap_err().is_unresolvable());
        assert!(matches!(
            repo.create(new_link("abc123")).await,
            Err(AppError::CodeAlreadyExists { .. })
        ));
    }
}
