//! Subscription orchestration: validation, identity, delegation.
//!
//! Each operation has the same shape: validate the input, delegate to the
//! persistence port, map failures onto the error taxonomy. The orchestrator
//! never swallows a store error; it propagates or narrows it.

use crate::models::{
    CreateSubscription, Subscription, SubscriptionFilter, SubscriptionPatch, SubscriptionRecord,
    TotalCostFilter,
};
use crate::services::cost;
use crate::services::metrics::{record_error, record_subscription_operation};
use crate::services::store::SubscriptionStore;
use anyhow::anyhow;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Create a subscription and return its server-minted identifier.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, service_name = %input.service_name))]
    pub async fn create(&self, input: CreateSubscription) -> Result<Uuid, AppError> {
        let service_name = input.service_name.trim();
        if service_name.is_empty() {
            return Err(AppError::BadRequest(anyhow!("service_name must not be empty")));
        }
        if input.price < 0 {
            return Err(AppError::BadRequest(anyhow!("price must not be negative")));
        }
        if let Some(end_date) = input.end_date {
            if end_date < input.start_date {
                return Err(AppError::BadRequest(anyhow!(
                    "end_date cannot be before start_date"
                )));
            }
        }

        let subscription_id = Uuid::new_v4();
        let record = SubscriptionRecord {
            subscription_id,
            service_name: service_name.to_string(),
            price: input.price,
            user_id: input.user_id,
            start_date: input.start_date,
            end_date: input.end_date,
        };
        self.store
            .create(&record)
            .await
            .inspect_err(|_| record_error("create"))?;

        record_subscription_operation("create");
        info!(subscription_id = %subscription_id, "Subscription created");
        Ok(subscription_id)
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn get(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        let subscription = self.store.get_by_id(subscription_id).await?;
        record_subscription_operation("get");
        Ok(subscription)
    }

    /// Apply a partial update, then re-read and return the full record.
    /// The patch echo is never trusted; the store is the source of truth.
    #[instrument(skip(self, patch), fields(subscription_id = %patch.subscription_id))]
    pub async fn patch(&self, patch: SubscriptionPatch) -> Result<Subscription, AppError> {
        if let Some(service_name) = &patch.service_name {
            if service_name.trim().is_empty() {
                return Err(AppError::BadRequest(anyhow!("service_name must not be empty")));
            }
        }
        if let Some(price) = patch.price {
            if price < 0 {
                return Err(AppError::BadRequest(anyhow!("price must not be negative")));
            }
        }
        if let Some(end_date) = patch.end_date {
            // start_date is immutable, so it bounds the new end date.
            let current = self.store.get_by_id(patch.subscription_id).await?;
            if end_date < current.start_date {
                return Err(AppError::BadRequest(anyhow!(
                    "end_date cannot be before start_date"
                )));
            }
        }

        self.store
            .patch(&patch)
            .await
            .inspect_err(|_| record_error("patch"))?;
        let subscription = self.store.get_by_id(patch.subscription_id).await?;

        record_subscription_operation("patch");
        info!(subscription_id = %subscription.subscription_id, "Subscription patched");
        Ok(subscription)
    }

    /// Delete a subscription and return it as it existed before deletion.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn delete(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        let subscription = self
            .store
            .delete(subscription_id)
            .await
            .inspect_err(|_| record_error("delete"))?;

        record_subscription_operation("delete");
        info!(subscription_id = %subscription_id, "Subscription deleted");
        Ok(subscription)
    }

    /// List subscriptions matching the filter. An empty filter is the
    /// explicit "list all".
    #[instrument(skip(self, filter))]
    pub async fn list(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>, AppError> {
        if let (Some(start_date), Some(end_date)) = (filter.start_date, filter.end_date) {
            if start_date > end_date {
                return Err(AppError::BadRequest(anyhow!(
                    "start_date cannot be after end_date"
                )));
            }
        }

        let subscriptions = self
            .store
            .list(filter)
            .await
            .inspect_err(|_| record_error("list"))?;
        info!(matched = subscriptions.len(), "Subscriptions listed");
        Ok(subscriptions)
    }

    /// Total cost of all subscriptions active within the filter period.
    #[instrument(skip(self, filter), fields(period_start = %filter.start_date, period_end = %filter.end_date))]
    pub async fn total_cost(&self, filter: &TotalCostFilter) -> Result<i64, AppError> {
        if filter.start_date > filter.end_date {
            return Err(AppError::BadRequest(anyhow!(
                "start_date cannot be after end_date"
            )));
        }

        let subscriptions = self
            .store
            .list_for_period(filter)
            .await
            .inspect_err(|_| record_error("total_cost"))?;
        let total = cost::total_cost(&subscriptions, filter.start_date, filter.end_date);

        record_subscription_operation("total_cost");
        info!(
            total_cost = total,
            matched = subscriptions.len(),
            "Total cost computed"
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;
    use chrono::NaiveDate;

    fn month(year: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, m, 1).unwrap()
    }

    fn service() -> SubscriptionService {
        SubscriptionService::new(Arc::new(MemoryStore::new()))
    }

    fn new_subscription(
        service_name: &str,
        price: i64,
        user_id: Uuid,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> CreateSubscription {
        CreateSubscription {
            service_name: service_name.to_string(),
            price,
            user_id,
            start_date: start,
            end_date: end,
        }
    }

    #[tokio::test]
    async fn create_mints_identity_and_persists() {
        let service = service();
        let user_id = Uuid::new_v4();

        let id = service
            .create(new_subscription("Netflix", 500, user_id, month(2023, 1), None))
            .await
            .unwrap();

        let stored = service.get(id).await.unwrap();
        assert_eq!(stored.subscription_id, id);
        assert_eq!(stored.service_name, "Netflix");
        assert_eq!(stored.price, 500);
        assert_eq!(stored.user_id, user_id);
        assert_eq!(stored.start_date, month(2023, 1));
        assert_eq!(stored.end_date, None);
    }

    #[tokio::test]
    async fn create_rejects_empty_service_name() {
        let result = service()
            .create(new_subscription("  ", 500, Uuid::new_v4(), month(2023, 1), None))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn create_rejects_negative_price() {
        let result = service()
            .create(new_subscription("Netflix", -1, Uuid::new_v4(), month(2023, 1), None))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn create_rejects_inverted_date_range() {
        let result = service()
            .create(new_subscription(
                "Netflix",
                500,
                Uuid::new_v4(),
                month(2023, 6),
                Some(month(2023, 1)),
            ))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn get_unknown_subscription_is_not_found() {
        let result = service().get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn patch_merges_only_set_fields() {
        let service = service();
        let id = service
            .create(new_subscription(
                "Netflix",
                500,
                Uuid::new_v4(),
                month(2023, 1),
                Some(month(2023, 3)),
            ))
            .await
            .unwrap();

        let patched = service
            .patch(SubscriptionPatch {
                subscription_id: id,
                service_name: None,
                price: Some(700),
                end_date: None,
            })
            .await
            .unwrap();

        assert_eq!(patched.price, 700);
        assert_eq!(patched.service_name, "Netflix");
        assert_eq!(patched.start_date, month(2023, 1));
        assert_eq!(patched.end_date, Some(month(2023, 3)));

        // Re-fetch agrees with the patch result.
        let fetched = service.get(id).await.unwrap();
        assert_eq!(fetched, patched);
    }

    #[tokio::test]
    async fn patch_unknown_subscription_is_not_found() {
        let result = service()
            .patch(SubscriptionPatch {
                subscription_id: Uuid::new_v4(),
                service_name: None,
                price: Some(700),
                end_date: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn patch_rejects_end_date_before_start_date() {
        let service = service();
        let id = service
            .create(new_subscription("Netflix", 500, Uuid::new_v4(), month(2023, 6), None))
            .await
            .unwrap();

        let result = service
            .patch(SubscriptionPatch {
                subscription_id: id,
                service_name: None,
                price: None,
                end_date: Some(month(2023, 1)),
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn delete_returns_last_known_values_and_removes() {
        let service = service();
        let id = service
            .create(new_subscription("Spotify", 200, Uuid::new_v4(), month(2023, 2), None))
            .await
            .unwrap();

        let deleted = service.delete(id).await.unwrap();
        assert_eq!(deleted.subscription_id, id);
        assert_eq!(deleted.service_name, "Spotify");

        let result = service.get(id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_unknown_subscription_is_not_found() {
        let result = service().delete(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_is_idempotent_without_writes() {
        let service = service();
        let user_id = Uuid::new_v4();
        for name in ["Netflix", "Spotify"] {
            service
                .create(new_subscription(name, 100, user_id, month(2023, 1), None))
                .await
                .unwrap();
        }

        let first = service.list(&SubscriptionFilter::default()).await.unwrap();
        let second = service.list(&SubscriptionFilter::default()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn list_filters_by_user() {
        let service = service();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        service
            .create(new_subscription("Netflix", 500, user_a, month(2023, 1), None))
            .await
            .unwrap();
        service
            .create(new_subscription("Spotify", 200, user_b, month(2023, 1), None))
            .await
            .unwrap();

        let filter = SubscriptionFilter {
            user_id: Some(user_a),
            ..Default::default()
        };
        let matched = service.list(&filter).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].user_id, user_a);
    }

    #[tokio::test]
    async fn list_rejects_inverted_bounds() {
        let filter = SubscriptionFilter {
            start_date: Some(month(2023, 6)),
            end_date: Some(month(2023, 1)),
            ..Default::default()
        };
        let result = service().list(&filter).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn total_cost_rejects_inverted_period() {
        let filter = TotalCostFilter {
            start_date: month(2023, 6),
            end_date: month(2023, 1),
            user_id: None,
            service_name: None,
        };
        let result = service().total_cost(&filter).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn total_cost_sums_clamped_contributions() {
        let service = service();
        let user_id = Uuid::new_v4();
        service
            .create(new_subscription(
                "Netflix",
                500,
                user_id,
                month(2023, 1),
                Some(month(2023, 3)),
            ))
            .await
            .unwrap();
        service
            .create(new_subscription("Spotify", 200, user_id, month(2023, 2), None))
            .await
            .unwrap();

        let filter = TotalCostFilter {
            start_date: month(2023, 1),
            end_date: month(2023, 2),
            user_id: None,
            service_name: None,
        };
        // Netflix: 2 months x 500; Spotify: 1 month x 200.
        assert_eq!(service.total_cost(&filter).await.unwrap(), 1200);
    }

    #[tokio::test]
    async fn total_cost_excludes_subscriptions_outside_the_period() {
        let service = service();
        service
            .create(new_subscription(
                "Netflix",
                500,
                Uuid::new_v4(),
                month(2023, 1),
                Some(month(2023, 3)),
            ))
            .await
            .unwrap();

        let touching = TotalCostFilter {
            start_date: month(2023, 3),
            end_date: month(2023, 6),
            user_id: None,
            service_name: None,
        };
        assert_eq!(service.total_cost(&touching).await.unwrap(), 500);

        let disjoint = TotalCostFilter {
            start_date: month(2023, 4),
            end_date: month(2023, 6),
            user_id: None,
            service_name: None,
        };
        assert_eq!(service.total_cost(&disjoint).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn total_cost_filters_by_service_name() {
        let service = service();
        let user_id = Uuid::new_v4();
        service
            .create(new_subscription("Netflix", 500, user_id, month(2023, 1), None))
            .await
            .unwrap();
        service
            .create(new_subscription("Spotify", 200, user_id, month(2023, 1), None))
            .await
            .unwrap();

        let filter = TotalCostFilter {
            start_date: month(2023, 1),
            end_date: month(2023, 1),
            user_id: None,
            service_name: Some("Spotify".to_string()),
        };
        assert_eq!(service.total_cost(&filter).await.unwrap(), 200);
    }
}
