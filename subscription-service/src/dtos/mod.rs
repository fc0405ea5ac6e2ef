//! Wire types for the subscription HTTP API.
//!
//! Calendar months travel as `MM-YYYY` strings (e.g. `07-2025`) and are
//! normalized to the first day of the month on the way in.

use crate::models::{
    CreateSubscription, Subscription, SubscriptionFilter, SubscriptionPatch, TotalCostFilter,
};
use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

/// Parse a `MM-YYYY` month into the first day of that month.
pub fn parse_month(s: &str) -> Result<NaiveDate, AppError> {
    let invalid = || AppError::BadRequest(anyhow!("invalid month '{}', expected MM-YYYY", s));
    let (month, year) = s.split_once('-').ok_or_else(invalid)?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

/// Format a month as `MM-YYYY`.
pub fn format_month(date: NaiveDate) -> String {
    format!("{:02}-{}", date.month(), date.year())
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: String,
    pub end_date: Option<String>,
}

impl CreateSubscriptionRequest {
    pub fn into_domain(self) -> Result<CreateSubscription, AppError> {
        let start_date = parse_month(&self.start_date)?;
        let end_date = self.end_date.as_deref().map(parse_month).transpose()?;
        Ok(CreateSubscription {
            service_name: self.service_name,
            price: self.price,
            user_id: self.user_id,
            start_date,
            end_date,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSubscriptionResponse {
    pub subscription_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub subscription_id: Uuid,
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(subscription: Subscription) -> Self {
        Self {
            subscription_id: subscription.subscription_id,
            service_name: subscription.service_name,
            price: subscription.price,
            user_id: subscription.user_id,
            start_date: format_month(subscription.start_date),
            end_date: subscription.end_date.map(format_month),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PatchSubscriptionRequest {
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub end_date: Option<String>,
}

impl PatchSubscriptionRequest {
    pub fn into_domain(self, subscription_id: Uuid) -> Result<SubscriptionPatch, AppError> {
        let end_date = self.end_date.as_deref().map(parse_month).transpose()?;
        Ok(SubscriptionPatch {
            subscription_id,
            service_name: self.service_name,
            price: self.price,
            end_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsParams {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ListSubscriptionsParams {
    pub fn into_filter(self) -> Result<SubscriptionFilter, AppError> {
        let start_date = self.start_date.as_deref().map(parse_month).transpose()?;
        let end_date = self.end_date.as_deref().map(parse_month).transpose()?;
        Ok(SubscriptionFilter {
            user_id: self.user_id,
            service_name: self.service_name,
            price: self.price,
            start_date,
            end_date,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListSubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TotalCostParams {
    pub start_date: String,
    pub end_date: String,
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
}

impl TotalCostParams {
    pub fn into_filter(self) -> Result<TotalCostFilter, AppError> {
        Ok(TotalCostFilter {
            start_date: parse_month(&self.start_date)?,
            end_date: parse_month(&self.end_date)?,
            user_id: self.user_id,
            service_name: self.service_name,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalCostResponse {
    pub total_cost: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_month_normalizes_to_first_of_month() {
        assert_eq!(
            parse_month("07-2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
        assert_eq!(
            parse_month("12-1999").unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 1).unwrap()
        );
    }

    #[test]
    fn parse_month_rejects_malformed_input() {
        for input in ["2025-07", "13-2025", "00-2025", "july", "07/2025", ""] {
            assert!(
                matches!(parse_month(input), Err(AppError::BadRequest(_))),
                "expected rejection for {:?}",
                input
            );
        }
    }

    #[test]
    fn format_month_round_trips() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        assert_eq!(format_month(date), "03-2023");
        assert_eq!(parse_month(&format_month(date)).unwrap(), date);
    }
}
