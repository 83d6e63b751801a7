//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository,
//! cache and broker calls. Services consume traits and provide a clean API
//! for the service boundaries in front of the core.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation and administration
//! - [`services::redirect_service::RedirectService`] - Cache-aside code resolution
//! - [`services::event_publisher::EventPublisher`] - Bounded click event publishing
//! - [`services::stats_aggregator::StatsAggregator`] - Idempotent click counting
//! - [`services::stats_service::StatsService`] - Click statistics queries

pub mod services;
