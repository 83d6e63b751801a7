//! Link creation and administration service.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_generator::{CodeGenerator, validate_custom_code};
use crate::utils::url_normalizer::normalize_url;

/// Service for creating and retrieving shortened links.
///
/// Normalizes target URLs, applies the default link lifetime and hands
/// the insert to the [`CodeGenerator`], whose conditional insert makes
/// codes collision-free.
pub struct LinkService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    generator: CodeGenerator,
    default_ttl: Option<TimeDelta>,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    /// Creates a new link service.
    ///
    /// `default_ttl` is applied to links created without an explicit expiry;
    /// `None` keeps such links forever.
    pub fn new(
        link_repository: Arc<L>,
        generator: CodeGenerator,
        default_ttl: Option<TimeDelta>,
    ) -> Self {
        Self {
            link_repository,
            generator,
            default_ttl,
        }
    }

    /// Creates a short link under a freshly generated code.
    ///
    /// An `expires_at` in the past is accepted; such a link resolves as
    /// expired right away.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidUrl`] if the target URL fails validation
    /// - [`AppError::ExhaustedKeyspace`] if every candidate code collided
    /// - [`AppError::StoreUnavailable`] / [`AppError::Internal`] on storage failures
    pub async fn create_link(
        &self,
        target_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        let normalized_url = normalize_url(target_url)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;
        let expires_at = self.effective_expiry(expires_at);

        let link = self
            .generator
            .generate(self.link_repository.as_ref(), &normalized_url, expires_at)
            .await?;

        info!(code = %link.code, "link created");
        Ok(link)
    }

    /// Creates a short link under a caller-chosen code.
    ///
    /// Unlike generated codes there is no retry: a taken code is reported
    /// back to the caller.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidCode`] if the code fails validation
    /// - [`AppError::CodeAlreadyExists`] if any link ever held the code
    /// - see [`Self::create_link`] for the rest
    pub async fn create_custom_link(
        &self,
        code: &str,
        target_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        validate_custom_code(code)?;
        let normalized_url = normalize_url(target_url)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;

        let link = self
            .link_repository
            .create(NewLink {
                code: code.to_string(),
                target_url: normalized_url,
                expires_at: self.effective_expiry(expires_at),
            })
            .await
            .map_err(|e| match e {
                AppError::CodeAlreadyExists { .. } => AppError::already_exists(code),
                other => other,
            })?;

        info!(code = %link.code, "custom link created");
        Ok(link)
    }

    /// Reads a link straight from the store, bypassing any cache.
    pub async fn get_link(&self, code: &str) -> Result<Link, AppError> {
        self.link_repository.get(code).await
    }

    /// Soft-deletes a link. Returns `false` if there was no live link.
    pub async fn delete_link(&self, code: &str) -> Result<bool, AppError> {
        let deleted = self.link_repository.delete(code).await?;
        if deleted {
            info!(code, "link deleted");
        }
        Ok(deleted)
    }

    /// Explicit expiry, else now plus the default lifetime.
    ///
    /// A default lifetime that runs past the representable date range means
    /// the link never expires.
    fn effective_expiry(&self, expires_at: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        if expires_at.is_some() {
            return expires_at;
        }

        let ttl = self.default_ttl?;
        let expiry = Utc::now().checked_add_signed(ttl);
        if expiry.is_none() {
            warn!("default link lifetime {} is out of range, link never expires", ttl);
        }
        expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;

    fn link_for(new_link: NewLink) -> Link {
        Link::new(
            new_link.code,
            new_link.target_url,
            Utc::now(),
            new_link.expires_at,
            None,
        )
    }

    fn service(repo: MockLinkRepository, default_ttl: Option<TimeDelta>) -> LinkService<MockLinkRepository> {
        LinkService::new(Arc::new(repo), CodeGenerator::default(), default_ttl)
    }

    #[tokio::test]
    async fn test_create_link_normalizes_url() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create()
            .withf(|new_link| new_link.target_url == "https://example.com/Path")
            .times(1)
            .returning(|new_link| Ok(link_for(new_link)));

        let link = service(mock_repo, None)
            .create_link("HTTPS://EXAMPLE.COM:443/Path#frag", None)
            .await
            .unwrap();

        assert_eq!(link.target_url, "https://example.com/Path");
        assert_eq!(link.code.len(), 7);
        assert!(link.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_create_link_rejects_invalid_url() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_create().never();

        let result = service(mock_repo, None)
            .create_link("javascript:alert(1)", None)
            .await;

        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_create_link_applies_default_ttl() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create()
            .withf(|new_link| new_link.expires_at.is_some())
            .times(1)
            .returning(|new_link| Ok(link_for(new_link)));

        let before = Utc::now();
        let link = service(mock_repo, Some(TimeDelta::days(30)))
            .create_link("https://example.com", None)
            .await
            .unwrap();

        let expires_at = link.expires_at.unwrap();
        assert!(expires_at >= before + TimeDelta::days(30));
        assert!(expires_at <= Utc::now() + TimeDelta::days(30));
    }

    #[tokio::test]
    async fn test_explicit_expiry_wins_over_default() {
        let explicit = Utc::now() - TimeDelta::seconds(1);
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create()
            .withf(move |new_link| new_link.expires_at == Some(explicit))
            .times(1)
            .returning(|new_link| Ok(link_for(new_link)));

        let link = service(mock_repo, Some(TimeDelta::days(30)))
            .create_link("https://example.com", Some(explicit))
            .await
            .unwrap();

        assert!(link.is_expired());
    }

    #[tokio::test]
    async fn test_create_custom_link_conflict() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::already_exists("")));

        let result = service(mock_repo, None)
            .create_custom_link("promo2026", "https://example.com", None)
            .await;

        assert_eq!(result.unwrap_err(), AppError::already_exists("promo2026"));
    }

    #[tokio::test]
    async fn test_create_custom_link_invalid_code() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_create().never();

        let result = service(mock_repo, None)
            .create_custom_link("no", "https://example.com", None)
            .await;

        assert!(matches!(result, Err(AppError::InvalidCode(_))));
    }

    #[tokio::test]
    async fn test_delete_link() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_delete()
            .withf(|code| code == "abc1234")
            .times(1)
            .returning(|_| Ok(true));

        assert!(service(mock_repo, None).delete_link("abc1234").await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_default_ttl_never_expires() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create()
            .withf(|new_link| new_link.expires_at.is_none())
            .times(1)
            .returning(|new_link| Ok(link_for(new_link)));

        let huge = TimeDelta::try_seconds(10_000_000_000_000).unwrap();
        let link = service(mock_repo, Some(huge))
            .create_link("https://example.com", None)
            .await
            .unwrap();

        assert!(link.expires_at.is_none());
        assert!(!link.is_expired());
    }
}
