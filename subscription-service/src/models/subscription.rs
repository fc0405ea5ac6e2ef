//! Subscription model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A tracked subscription to a paid service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub service_name: String,
    /// Monthly price in minor currency units.
    pub price: i64,
    pub user_id: Uuid,
    /// First active month, normalized to the 1st.
    pub start_date: NaiveDate,
    /// Last active month; `None` means open-ended.
    pub end_date: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a subscription. Identity is minted by the service,
/// never supplied by the caller.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// A fully identified record ready for insertion.
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    pub subscription_id: Uuid,
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Partial update. Unset fields leave the stored value unchanged;
/// `start_date` and `user_id` are immutable after creation.
#[derive(Debug, Clone)]
pub struct SubscriptionPatch {
    pub subscription_id: Uuid,
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub end_date: Option<NaiveDate>,
}
