//! Persistence port for subscriptions.
//!
//! The service depends on this contract only; [`Database`](crate::services::Database)
//! satisfies it against Postgres and [`MemoryStore`] satisfies it in-process
//! for tests. The store is the sole source of truth for existence.

use crate::models::{
    Subscription, SubscriptionFilter, SubscriptionPatch, SubscriptionRecord, TotalCostFilter,
};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert a fully identified record. Fails with `Conflict` when the
    /// identity already exists.
    async fn create(&self, record: &SubscriptionRecord) -> Result<(), AppError>;

    /// Fetch a subscription, failing with `NotFound` when absent.
    async fn get_by_id(&self, subscription_id: Uuid) -> Result<Subscription, AppError>;

    async fn exists(&self, subscription_id: Uuid) -> Result<bool, AppError>;

    /// Merge the set fields of `patch` into the stored row; unset fields
    /// leave the stored values unchanged.
    async fn patch(&self, patch: &SubscriptionPatch) -> Result<(), AppError>;

    /// Delete a subscription, returning its last-known values.
    async fn delete(&self, subscription_id: Uuid) -> Result<Subscription, AppError>;

    async fn list(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>, AppError>;

    /// Subscriptions whose active range overlaps the filter period.
    async fn list_for_period(
        &self,
        filter: &TotalCostFilter,
    ) -> Result<Vec<Subscription>, AppError>;
}

/// In-memory store implementing the same contract as Postgres. Backs the
/// orchestrator unit tests; also usable as a throwaway backend.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Uuid, Subscription>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(subscription_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("subscription {} not found", subscription_id))
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn create(&self, record: &SubscriptionRecord) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&record.subscription_id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "subscription {} already exists",
                record.subscription_id
            )));
        }
        let now = Utc::now();
        rows.insert(
            record.subscription_id,
            Subscription {
                subscription_id: record.subscription_id,
                service_name: record.service_name.clone(),
                price: record.price,
                user_id: record.user_id,
                start_date: record.start_date,
                end_date: record.end_date,
                created_utc: now,
                updated_utc: now,
            },
        );
        Ok(())
    }

    async fn get_by_id(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.rows
            .lock()
            .await
            .get(&subscription_id)
            .cloned()
            .ok_or_else(|| not_found(subscription_id))
    }

    async fn exists(&self, subscription_id: Uuid) -> Result<bool, AppError> {
        Ok(self.rows.lock().await.contains_key(&subscription_id))
    }

    async fn patch(&self, patch: &SubscriptionPatch) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&patch.subscription_id)
            .ok_or_else(|| not_found(patch.subscription_id))?;

        if let Some(service_name) = &patch.service_name {
            row.service_name = service_name.clone();
        }
        if let Some(price) = patch.price {
            row.price = price;
        }
        if let Some(end_date) = patch.end_date {
            row.end_date = Some(end_date);
        }
        row.updated_utc = Utc::now();
        Ok(())
    }

    async fn delete(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.rows
            .lock()
            .await
            .remove(&subscription_id)
            .ok_or_else(|| not_found(subscription_id))
    }

    async fn list(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>, AppError> {
        let predicates = filter.predicates();
        let rows = self.rows.lock().await;
        let mut matched: Vec<Subscription> = rows
            .values()
            .filter(|sub| predicates.iter().all(|p| p.matches(sub)))
            .cloned()
            .collect();
        matched.sort_by_key(|sub| sub.subscription_id);
        Ok(matched)
    }

    async fn list_for_period(
        &self,
        filter: &TotalCostFilter,
    ) -> Result<Vec<Subscription>, AppError> {
        let predicates = filter.predicates();
        let rows = self.rows.lock().await;
        let mut matched: Vec<Subscription> = rows
            .values()
            .filter(|sub| predicates.iter().all(|p| p.matches(sub)))
            .cloned()
            .collect();
        matched.sort_by_key(|sub| sub.subscription_id);
        Ok(matched)
    }
}
