//! Short code generation and validation.
//!
//! The generator only proposes candidates. Uniqueness is decided by the link
//! store's conditional insert: a candidate is accepted exactly when the insert
//! succeeds, so two concurrent creations can never end up with the same code.

use rand::Rng;
use tracing::{debug, warn};

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use chrono::{DateTime, Utc};

/// Case-sensitive base62 alphabet used for generated codes by default.
pub const BASE62_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const DEFAULT_CODE_LENGTH: usize = 7;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Bounds for user-provided custom codes.
pub const MIN_CUSTOM_CODE_LENGTH: usize = 4;
pub const MAX_CUSTOM_CODE_LENGTH: usize = 32;

/// Reserved codes that cannot be used as short links.
///
/// Kept free for the endpoints of the service boundaries in front of the core.
const RESERVED_CODES: &[&str] = &["stats", "health", "admin", "api", "dashboard", "metrics"];

/// Proposes random codes and claims one through the link store.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    alphabet: Vec<char>,
    length: usize,
    max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            alphabet: BASE62_ALPHABET.chars().collect(),
            length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl CodeGenerator {
    /// Creates a generator over `alphabet` producing codes of `length` characters.
    ///
    /// # Arguments
    ///
    /// * `alphabet` - Distinct ASCII letters and digits to draw from
    /// * `length` - Characters per code, at most 32
    /// * `max_attempts` - Collisions tolerated per creation before
    ///   [`AppError::ExhaustedKeyspace`]
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the alphabet is empty, contains
    /// non-alphanumeric or duplicate characters, or if `length` or
    /// `max_attempts` is zero.
    pub fn new(alphabet: &str, length: usize, max_attempts: u32) -> Result<Self, AppError> {
        let chars: Vec<char> = alphabet.chars().collect();

        if chars.is_empty() || !chars.iter().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::internal(
                "Code alphabet must be a non-empty set of ASCII letters and digits",
            ));
        }

        let mut deduped = chars.clone();
        deduped.sort_unstable();
        deduped.dedup();
        if deduped.len() != chars.len() {
            return Err(AppError::internal("Code alphabet contains duplicates"));
        }

        if length == 0 || length > MAX_CUSTOM_CODE_LENGTH {
            return Err(AppError::internal(format!(
                "Code length must be between 1 and {}",
                MAX_CUSTOM_CODE_LENGTH
            )));
        }

        if max_attempts == 0 {
            return Err(AppError::internal("Code max attempts must be at least 1"));
        }

        Ok(Self {
            alphabet: chars,
            length,
            max_attempts,
        })
    }

    /// Number of characters in every generated code.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Candidates tried by [`Self::generate`] before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number of distinct codes this generator can produce (saturating).
    pub fn keyspace_size(&self) -> u128 {
        (self.alphabet.len() as u128).saturating_pow(self.length as u32)
    }

    /// Draws one uniformly random candidate.
    ///
    /// Every character is picked independently from the alphabet, so codes
    /// reveal nothing about creation order. A candidate is only a proposal:
    /// it may already be taken.
    ///
    /// # Examples
    ///
    /// ```
    /// use url_shortener_core::utils::code_generator::CodeGenerator;
    ///
    /// let generator = CodeGenerator::new("ab", 5, 3).unwrap();
    /// let code = generator.candidate();
    ///
    /// assert_eq!(code.len(), 5);
    /// assert!(code.chars().all(|c| c == 'a' || c == 'b'));
    /// ```
    pub fn candidate(&self) -> String {
        let mut rng = rand::rng();

        (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
            .collect()
    }

    /// Generates a fresh code and persists `target_url` under it.
    ///
    /// Each candidate goes through [`LinkRepository::create`]. A
    /// [`AppError::CodeAlreadyExists`] answer means the candidate is taken and
    /// a new one is drawn; a rejected insert leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ExhaustedKeyspace`] once `max_attempts` candidates
    /// have all collided. Any other store error is returned immediately.
    pub async fn generate<L>(
        &self,
        store: &L,
        target_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError>
    where
        L: LinkRepository + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let new_link = NewLink {
                code: self.candidate(),
                target_url: target_url.to_string(),
                expires_at,
            };

            match store.create(new_link).await {
                Ok(link) => {
                    debug!(code = %link.code, attempt, "code allocated");
                    return Ok(link);
                }
                Err(AppError::CodeAlreadyExists { code }) => {
                    warn!(%code, attempt, "code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::ExhaustedKeyspace {
            attempts: self.max_attempts,
        })
    }
}

/// Cheap syntactic check run before any lookup.
///
/// Anything that no generator or custom code could have produced is rejected
/// without touching the cache or the store.
pub fn is_plausible_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CUSTOM_CODE_LENGTH
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validates a user-provided custom short code.
///
/// # Rules
///
/// - Length: 4-32 characters
/// - Allowed characters: ASCII letters and digits
/// - Cannot be a reserved system code (case-insensitive)
///
/// # Errors
///
/// Returns [`AppError::InvalidCode`] if any rule is violated.
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if code.len() < MIN_CUSTOM_CODE_LENGTH || code.len() > MAX_CUSTOM_CODE_LENGTH {
        return Err(AppError::InvalidCode(format!(
            "Custom code must be {}-{} characters, got {}",
            MIN_CUSTOM_CODE_LENGTH,
            MAX_CUSTOM_CODE_LENGTH,
            code.len()
        )));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidCode(
            "Custom code can only contain letters and digits".to_string(),
        ));
    }

    if RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
    {
        return Err(AppError::InvalidCode(format!("Code '{}' is reserved", code)));
    }

    Ok(())
}
