//! Business logic services for the application layer.

pub mod event_publisher;
pub mod link_service;
pub mod redirect_service;
pub mod stats_aggregator;
pub mod stats_service;

pub use event_publisher::{EventPublisher, PublishError};
pub use link_service::LinkService;
pub use redirect_service::{RedirectService, RedirectSettings};
pub use stats_aggregator::{AggregatorSettings, ProcessOutcome, StatsAggregator};
pub use stats_service::StatsService;
