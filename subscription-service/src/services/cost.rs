//! Cost aggregation engine.
//!
//! Pure month-granularity arithmetic over subscriptions already narrowed to
//! a query period by the store's overlap predicate. Billing counts whole
//! calendar months inclusively: a subscription overlapping any part of a
//! boundary month is billed for that entire month. That is the documented
//! rounding policy, not an accident.

use crate::models::Subscription;
use chrono::{Datelike, NaiveDate};

/// Inclusive month count between two dates, ignoring the day component.
fn months_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    let years = i64::from(end.year() - start.year());
    let months = i64::from(end.month() as i32 - start.month() as i32);
    years * 12 + months + 1
}

/// Billable contribution of one subscription within `[period_start, period_end]`.
///
/// Open-ended subscriptions are billed through `period_end`.
pub fn cost_for_period(
    subscription: &Subscription,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> i64 {
    let start = subscription.start_date.max(period_start);
    let end = match subscription.end_date {
        Some(end_date) => end_date.min(period_end),
        None => period_end,
    };

    // The overlap predicate should rule this out, but not every caller is
    // trusted to have applied it.
    if end < start {
        return 0;
    }

    months_inclusive(start, end) * subscription.price
}

/// Total cost of all candidate subscriptions over the period.
pub fn total_cost(
    subscriptions: &[Subscription],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> i64 {
    subscriptions
        .iter()
        .map(|subscription| cost_for_period(subscription, period_start, period_end))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn subscription(price: i64, start: NaiveDate, end: Option<NaiveDate>) -> Subscription {
        Subscription {
            subscription_id: Uuid::new_v4(),
            service_name: "Netflix".to_string(),
            price,
            user_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn open_ended_subscription_is_billed_through_period_end() {
        let sub = subscription(100, month(2023, 1), None);
        assert_eq!(cost_for_period(&sub, month(2023, 1), month(2023, 12)), 1200);
    }

    #[test]
    fn single_month_subscription_contributes_exactly_its_price() {
        let sub = subscription(300, month(2023, 5), Some(month(2023, 5)));
        assert_eq!(cost_for_period(&sub, month(2023, 1), month(2023, 12)), 300);
    }

    #[test]
    fn subscription_is_clamped_to_the_query_period() {
        // Active 2022-11 .. 2023-04, queried over 2023-01 .. 2023-02.
        let sub = subscription(500, month(2022, 11), Some(month(2023, 4)));
        assert_eq!(cost_for_period(&sub, month(2023, 1), month(2023, 2)), 1000);
    }

    #[test]
    fn boundary_month_is_billed_whole() {
        // Ends in the period's first month: one billable month.
        let sub = subscription(500, month(2023, 1), Some(month(2023, 3)));
        assert_eq!(cost_for_period(&sub, month(2023, 3), month(2023, 6)), 500);
    }

    #[test]
    fn disjoint_subscription_contributes_zero() {
        let sub = subscription(500, month(2023, 1), Some(month(2023, 3)));
        assert_eq!(cost_for_period(&sub, month(2023, 4), month(2023, 6)), 0);
    }

    #[test]
    fn month_counting_crosses_year_boundaries() {
        let sub = subscription(10, month(2022, 11), Some(month(2023, 2)));
        assert_eq!(cost_for_period(&sub, month(2022, 1), month(2023, 12)), 40);
    }

    #[test]
    fn total_sums_contributions() {
        // Netflix 500 for 2023-01..2023-03, Spotify 200 open-ended from
        // 2023-02, queried over 2023-01..2023-02.
        let subs = vec![
            subscription(500, month(2023, 1), Some(month(2023, 3))),
            subscription(200, month(2023, 2), None),
        ];
        assert_eq!(total_cost(&subs, month(2023, 1), month(2023, 2)), 1200);
    }

    #[test]
    fn total_of_no_subscriptions_is_zero() {
        assert_eq!(total_cost(&[], month(2023, 1), month(2023, 12)), 0);
    }
}
