//! Domain models for subscription-service.

pub mod filter;
pub mod subscription;

pub use filter::{Predicate, SubscriptionFilter, TotalCostFilter};
pub use subscription::{CreateSubscription, Subscription, SubscriptionPatch, SubscriptionRecord};
