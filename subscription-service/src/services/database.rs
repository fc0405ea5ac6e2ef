//! Postgres adapter for the subscription store.
//!
//! Owns connection pooling, migrations, and the translation of composed
//! filter predicates into SQL. Storage-level "no rows" conditions surface
//! as `AppError::NotFound`; everything else becomes `DatabaseError`.

use crate::models::{
    Predicate, Subscription, SubscriptionFilter, SubscriptionPatch, SubscriptionRecord,
    TotalCostFilter,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::SubscriptionStore;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const SUBSCRIPTION_COLUMNS: &str =
    "subscription_id, service_name, price, user_id, start_date, end_date, created_utc, updated_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "subscription-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Append composed predicates as a conjunctive WHERE clause.
fn push_predicates(builder: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::UserIdEq(user_id) => {
                builder.push("user_id = ").push_bind(*user_id);
            }
            Predicate::ServiceNameEq(service_name) => {
                builder.push("service_name = ").push_bind(service_name.clone());
            }
            Predicate::PriceEq(price) => {
                builder.push("price = ").push_bind(*price);
            }
            Predicate::StartsOnOrAfter(date) => {
                builder.push("start_date >= ").push_bind(*date);
            }
            Predicate::EndsOnOrBefore(date) => {
                builder.push("end_date <= ").push_bind(*date);
            }
            Predicate::OverlapsPeriod { start, end } => {
                builder.push("start_date <= ").push_bind(*end);
                builder
                    .push(" AND (end_date IS NULL OR end_date >= ")
                    .push_bind(*start);
                builder.push(")");
            }
        }
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    #[instrument(skip(self, record), fields(subscription_id = %record.subscription_id))]
    async fn create(&self, record: &SubscriptionRecord) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_subscription"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (subscription_id, service_name, price, user_id, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.subscription_id)
        .bind(&record.service_name)
        .bind(record.price)
        .bind(record.user_id)
        .bind(record.start_date)
        .bind(record.end_date)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                anyhow::anyhow!("subscription {} already exists", record.subscription_id),
            ),
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create subscription: {}", e)),
        })?;

        timer.observe_duration();
        info!(subscription_id = %record.subscription_id, "Subscription stored");

        Ok(())
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    async fn get_by_id(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions WHERE subscription_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e)))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("subscription {} not found", subscription_id))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    async fn exists(&self, subscription_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["subscription_exists"])
            .start_timer();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscription_id = $1)",
        )
        .bind(subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check existence: {}", e))
        })?;

        timer.observe_duration();

        Ok(exists)
    }

    #[instrument(skip(self, patch), fields(subscription_id = %patch.subscription_id))]
    async fn patch(&self, patch: &SubscriptionPatch) -> Result<(), AppError> {
        // Existence check first, then merge. A concurrent delete between the
        // two races and surfaces as a late NotFound; callers must not assume
        // strict linearizability here.
        if !self.exists(patch.subscription_id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "subscription {} not found",
                patch.subscription_id
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["patch_subscription"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET service_name = COALESCE($1, service_name),
                price = COALESCE($2, price),
                end_date = COALESCE($3, end_date),
                updated_utc = now()
            WHERE subscription_id = $4
            "#,
        )
        .bind(patch.service_name.clone())
        .bind(patch.price)
        .bind(patch.end_date)
        .bind(patch.subscription_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to patch subscription: {}", e))
        })?;

        timer.observe_duration();
        info!(subscription_id = %patch.subscription_id, "Subscription patched");

        Ok(())
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    async fn delete(&self, subscription_id: Uuid) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "DELETE FROM subscriptions WHERE subscription_id = $1 RETURNING {}",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete subscription: {}", e))
        })?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("subscription {} not found", subscription_id))
        })?;

        timer.observe_duration();
        info!(subscription_id = %subscription_id, "Subscription deleted");

        Ok(subscription)
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscriptions"])
            .start_timer();

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM subscriptions",
            SUBSCRIPTION_COLUMNS
        ));
        push_predicates(&mut builder, &filter.predicates());
        builder.push(" ORDER BY subscription_id");

        let subscriptions = builder
            .build_query_as::<Subscription>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list subscriptions: {}", e))
            })?;

        timer.observe_duration();

        Ok(subscriptions)
    }

    #[instrument(skip(self, filter), fields(period_start = %filter.start_date, period_end = %filter.end_date))]
    async fn list_for_period(
        &self,
        filter: &TotalCostFilter,
    ) -> Result<Vec<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscriptions_for_period"])
            .start_timer();

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM subscriptions",
            SUBSCRIPTION_COLUMNS
        ));
        push_predicates(&mut builder, &filter.predicates());
        builder.push(" ORDER BY subscription_id");

        let subscriptions = builder
            .build_query_as::<Subscription>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to list subscriptions for period: {}",
                    e
                ))
            })?;

        timer.observe_duration();

        Ok(subscriptions)
    }
}
