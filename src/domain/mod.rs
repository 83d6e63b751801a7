//! Domain layer containing business entities and repository contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click event model and its versioned wire format
//!
//! # Click Processing Flow
//!
//! 1. [`crate::application::services::RedirectService`] resolves a code
//! 2. A [`click_event::ClickEvent`] is published from a detached task
//! 3. The message broker stores it with at-least-once delivery
//! 4. [`crate::application::services::StatsAggregator`] deduplicates and
//!    applies it through [`repositories::StatsRepository`]

pub mod click_event;
pub mod entities;
pub mod repositories;
