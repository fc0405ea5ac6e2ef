//! Query filters and the predicate compositor.
//!
//! Filters are sparse: an absent field means "no constraint on that
//! attribute". Each present field composes to exactly one conjunctive
//! predicate; there is never disjunction between filter fields. The storage
//! adapter translates predicates to SQL, and [`Predicate::matches`] gives
//! the same semantics in-process for the in-memory store.

use crate::models::Subscription;
use chrono::NaiveDate;
use uuid::Uuid;

/// Optional narrowing predicates for listing subscriptions.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub price: Option<i64>,
    /// Lower bound on `start_date`, inclusive.
    pub start_date: Option<NaiveDate>,
    /// Upper bound on `end_date`, inclusive.
    pub end_date: Option<NaiveDate>,
}

/// Filter for cost aggregation: a mandatory inclusive month period plus
/// optional equality predicates. Unlike [`SubscriptionFilter`], the period
/// here is an overlap test, not a pair of bounds.
#[derive(Debug, Clone)]
pub struct TotalCostFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
}

/// One conjunctive predicate over subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    UserIdEq(Uuid),
    ServiceNameEq(String),
    PriceEq(i64),
    StartsOnOrAfter(NaiveDate),
    EndsOnOrBefore(NaiveDate),
    /// Active-range intersection with a query period. Open-ended
    /// subscriptions match whenever they start on or before `end`; getting
    /// this wrong silently excludes them from cost queries.
    OverlapsPeriod { start: NaiveDate, end: NaiveDate },
}

impl SubscriptionFilter {
    /// Compose the present fields into conjunctive predicates.
    /// An empty filter composes to no predicates (match-all).
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(user_id) = self.user_id {
            predicates.push(Predicate::UserIdEq(user_id));
        }
        if let Some(service_name) = &self.service_name {
            predicates.push(Predicate::ServiceNameEq(service_name.clone()));
        }
        if let Some(price) = self.price {
            predicates.push(Predicate::PriceEq(price));
        }
        if let Some(start_date) = self.start_date {
            predicates.push(Predicate::StartsOnOrAfter(start_date));
        }
        if let Some(end_date) = self.end_date {
            predicates.push(Predicate::EndsOnOrBefore(end_date));
        }
        predicates
    }
}

impl TotalCostFilter {
    /// Compose the period overlap test plus any equality predicates.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::OverlapsPeriod {
            start: self.start_date,
            end: self.end_date,
        }];
        if let Some(user_id) = self.user_id {
            predicates.push(Predicate::UserIdEq(user_id));
        }
        if let Some(service_name) = &self.service_name {
            predicates.push(Predicate::ServiceNameEq(service_name.clone()));
        }
        predicates
    }
}

impl Predicate {
    /// Evaluate this predicate against a single subscription.
    pub fn matches(&self, subscription: &Subscription) -> bool {
        match self {
            Predicate::UserIdEq(user_id) => subscription.user_id == *user_id,
            Predicate::ServiceNameEq(name) => subscription.service_name == *name,
            Predicate::PriceEq(price) => subscription.price == *price,
            Predicate::StartsOnOrAfter(date) => subscription.start_date >= *date,
            // An open-ended subscription has no end date and so never
            // satisfies an upper bound on it, matching SQL NULL comparison.
            Predicate::EndsOnOrBefore(date) => {
                subscription.end_date.is_some_and(|end| end <= *date)
            }
            Predicate::OverlapsPeriod { start, end } => {
                subscription.start_date <= *end
                    && subscription.end_date.map_or(true, |sub_end| sub_end >= *start)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn subscription(start: NaiveDate, end: Option<NaiveDate>) -> Subscription {
        Subscription {
            subscription_id: Uuid::new_v4(),
            service_name: "Netflix".to_string(),
            price: 500,
            user_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_composes_to_no_predicates() {
        assert!(SubscriptionFilter::default().predicates().is_empty());
    }

    #[test]
    fn each_present_field_composes_to_one_predicate() {
        let user_id = Uuid::new_v4();
        let filter = SubscriptionFilter {
            user_id: Some(user_id),
            service_name: Some("Spotify".to_string()),
            price: Some(200),
            start_date: Some(month(2023, 1)),
            end_date: Some(month(2023, 12)),
        };

        let predicates = filter.predicates();
        assert_eq!(predicates.len(), 5);
        assert!(predicates.contains(&Predicate::UserIdEq(user_id)));
        assert!(predicates.contains(&Predicate::ServiceNameEq("Spotify".to_string())));
        assert!(predicates.contains(&Predicate::PriceEq(200)));
        assert!(predicates.contains(&Predicate::StartsOnOrAfter(month(2023, 1))));
        assert!(predicates.contains(&Predicate::EndsOnOrBefore(month(2023, 12))));
    }

    #[test]
    fn cost_filter_always_carries_the_overlap_predicate() {
        let filter = TotalCostFilter {
            start_date: month(2023, 1),
            end_date: month(2023, 6),
            user_id: None,
            service_name: None,
        };

        assert_eq!(
            filter.predicates(),
            vec![Predicate::OverlapsPeriod {
                start: month(2023, 1),
                end: month(2023, 6),
            }]
        );
    }

    #[test]
    fn overlap_matches_boundary_month() {
        // Ends exactly where the period starts: still an overlap.
        let sub = subscription(month(2023, 1), Some(month(2023, 3)));
        let touching = Predicate::OverlapsPeriod {
            start: month(2023, 3),
            end: month(2023, 6),
        };
        let disjoint = Predicate::OverlapsPeriod {
            start: month(2023, 4),
            end: month(2023, 6),
        };

        assert!(touching.matches(&sub));
        assert!(!disjoint.matches(&sub));
    }

    #[test]
    fn overlap_includes_open_ended_subscriptions() {
        let sub = subscription(month(2022, 5), None);
        let predicate = Predicate::OverlapsPeriod {
            start: month(2023, 1),
            end: month(2023, 6),
        };
        assert!(predicate.matches(&sub));

        // Starts after the period ends: no overlap even when open-ended.
        let future = subscription(month(2024, 1), None);
        assert!(!predicate.matches(&future));
    }

    #[test]
    fn end_bound_excludes_open_ended_subscriptions() {
        let open_ended = subscription(month(2023, 1), None);
        let bounded = subscription(month(2023, 1), Some(month(2023, 6)));
        let predicate = Predicate::EndsOnOrBefore(month(2023, 12));

        assert!(!predicate.matches(&open_ended));
        assert!(predicate.matches(&bounded));
    }
}
