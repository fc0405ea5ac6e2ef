//! Services module for subscription-service.

pub mod cost;
pub mod database;
pub mod metrics;
pub mod store;
pub mod subscription;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics, record_error, record_subscription_operation};
pub use store::{MemoryStore, SubscriptionStore};
pub use subscription::SubscriptionService;
