//! Helper functions used across the crate.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`url_normalizer`] - Target URL normalization and sanitization
//! - [`db_error`] - PostgreSQL error classification

pub mod code_generator;
pub mod db_error;
pub mod url_normalizer;
