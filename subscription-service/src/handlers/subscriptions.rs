//! Subscription CRUD and cost-aggregation handlers.

use crate::dtos::{
    CreateSubscriptionRequest, CreateSubscriptionResponse, ListSubscriptionsParams,
    ListSubscriptionsResponse, PatchSubscriptionRequest, SubscriptionResponse, TotalCostParams,
    TotalCostResponse,
};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = request.into_domain()?;
    let subscription_id = state.service.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSubscriptionResponse { subscription_id }),
    ))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let subscription = state.service.get(subscription_id).await?;
    Ok(Json(subscription.into()))
}

pub async fn patch_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(request): Json<PatchSubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let patch = request.into_domain(subscription_id)?;
    let subscription = state.service.patch(patch).await?;
    Ok(Json(subscription.into()))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let subscription = state.service.delete(subscription_id).await?;
    Ok(Json(subscription.into()))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<ListSubscriptionsParams>,
) -> Result<Json<ListSubscriptionsResponse>, AppError> {
    let filter = params.into_filter()?;
    let subscriptions = state.service.list(&filter).await?;
    Ok(Json(ListSubscriptionsResponse {
        subscriptions: subscriptions.into_iter().map(Into::into).collect(),
    }))
}

pub async fn total_cost(
    State(state): State<AppState>,
    Query(params): Query<TotalCostParams>,
) -> Result<Json<TotalCostResponse>, AppError> {
    let filter = params.into_filter()?;
    let total_cost = state.service.total_cost(&filter).await?;
    Ok(Json(TotalCostResponse { total_cost }))
}
