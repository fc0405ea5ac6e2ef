//! HTTP handlers for subscription-service.

pub mod health;
pub mod subscriptions;

pub use health::{health_check, metrics_handler, readiness_check};
pub use subscriptions::{
    create_subscription, delete_subscription, get_subscription, list_subscriptions,
    patch_subscription, total_cost,
};
