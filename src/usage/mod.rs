//! Per-identity generation-credit metering.
//!
//! Credits are tracked per (identity, UTC calendar month) row. The row is the
//! only durable shared-mutation target in the pipeline; the store must offer
//! atomic upsert/increment semantics. The pre-check and the commit are
//! separated by the model call, so two concurrent requests for the same
//! identity can both pass the check before either commits. That overshoot is
//! bounded by one in-flight request's cost and is accepted in favor of
//! availability over strict billing precision.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{NamecraftError, Result};
use crate::types::{Plan, PipelineConfig, Subscription, UsagePeriod};

/// UTC calendar-month boundaries for `now`: start inclusive, end exclusive.
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = first_of_month(now.year(), now.month());
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    (start, first_of_month(next_year, next_month))
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Month is always 1-12 here, so the date is always representable.
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC)
}

/// Effective per-period credit limit for an identity's subscription.
///
/// The pro limit applies only while the status keeps the plan in effect, and
/// either the stored plan is PRO or the billing price reference matches the
/// configured pro price.
pub fn effective_limit(subscription: Option<&Subscription>, config: &PipelineConfig) -> Decimal {
    let Some(sub) = subscription else {
        return config.free_limit;
    };
    if !sub.status.is_entitled() {
        return config.free_limit;
    }

    let pro_by_plan = sub.plan == Plan::Pro;
    let pro_by_price = match (&config.pro_price_ref, &sub.price_ref) {
        (Some(configured), Some(stored)) => configured == stored,
        _ => false,
    };

    if pro_by_plan || pro_by_price {
        config.pro_limit
    } else {
        config.free_limit
    }
}

/// Durable credit ledger, one row per (identity, billing period).
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Look up or create the row for the current period with zero credits.
    async fn open_period(&self, identity_id: &str, now: DateTime<Utc>) -> Result<UsagePeriod>;

    /// Atomically add `delta` credits to a previously opened row.
    async fn commit(&self, period_id: &str, delta: Decimal) -> Result<()>;
}

/// In-memory ledger for tests and single-instance deployments.
pub struct MemoryUsageLedger {
    rows: Mutex<HashMap<String, UsagePeriod>>,
}

impl MemoryUsageLedger {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a period with already-consumed credits.
    pub async fn seed(&self, identity_id: &str, now: DateTime<Utc>, used: Decimal) -> Result<()> {
        let period = self.open_period(identity_id, now).await?;
        self.commit(&period.id, used).await
    }

    fn row_id(identity_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{identity_id}:{}:{}",
            start.timestamp(),
            end.timestamp()
        )
    }
}

impl Default for MemoryUsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    async fn open_period(&self, identity_id: &str, now: DateTime<Utc>) -> Result<UsagePeriod> {
        let (period_start, period_end) = month_window(now);
        let id = Self::row_id(identity_id, period_start, period_end);

        let mut rows = self.rows.lock();
        let row = rows.entry(id.clone()).or_insert_with(|| UsagePeriod {
            id,
            period_start,
            period_end,
            used_credits: Decimal::ZERO,
        });
        Ok(row.clone())
    }

    async fn commit(&self, period_id: &str, delta: Decimal) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(period_id).ok_or_else(|| {
            NamecraftError::internal(format!("unknown usage period: {period_id}"))
        })?;
        row.used_credits += delta;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubscriptionStatus;
    use chrono::TimeZone;

    #[test]
    fn test_month_window_mid_month() {
        let now = Utc.with_ymd_and_hms(2025, 6, 17, 15, 42, 9).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_window_december_rollover() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_window_boundary_is_inclusive_exclusive() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let (start, _) = month_window(now);
        assert_eq!(start, now);
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            pro_price_ref: Some("price_pro_monthly".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_effective_limit_free_without_subscription() {
        let cfg = config();
        assert_eq!(effective_limit(None, &cfg), cfg.free_limit);
    }

    #[test]
    fn test_effective_limit_collapses_on_bad_status() {
        let cfg = config();
        for status in [
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Unpaid,
        ] {
            let sub = Subscription {
                plan: Plan::Pro,
                status,
                price_ref: Some("price_pro_monthly".to_string()),
            };
            assert_eq!(effective_limit(Some(&sub), &cfg), cfg.free_limit);
        }
    }

    #[test]
    fn test_effective_limit_pro_by_plan_or_price() {
        let cfg = config();
        let by_plan = Subscription {
            plan: Plan::Pro,
            status: SubscriptionStatus::Active,
            price_ref: None,
        };
        assert_eq!(effective_limit(Some(&by_plan), &cfg), cfg.pro_limit);

        let by_price = Subscription {
            plan: Plan::Free,
            status: SubscriptionStatus::Trialing,
            price_ref: Some("price_pro_monthly".to_string()),
        };
        assert_eq!(effective_limit(Some(&by_price), &cfg), cfg.pro_limit);

        let neither = Subscription {
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            price_ref: Some("price_other".to_string()),
        };
        assert_eq!(effective_limit(Some(&neither), &cfg), cfg.free_limit);
    }

    #[tokio::test]
    async fn test_open_period_upserts_once() {
        let ledger = MemoryUsageLedger::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 17, 10, 0, 0).unwrap();

        let first = ledger.open_period("user-1", now).await.unwrap();
        assert_eq!(first.used_credits, Decimal::ZERO);

        ledger.commit(&first.id, Decimal::from(2u32)).await.unwrap();

        let again = ledger.open_period("user-1", now).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.used_credits, Decimal::from(2u32));
    }

    #[tokio::test]
    async fn test_new_month_gets_new_row() {
        let ledger = MemoryUsageLedger::new();
        let june = Utc.with_ymd_and_hms(2025, 6, 30, 23, 0, 0).unwrap();
        let july = Utc.with_ymd_and_hms(2025, 7, 1, 1, 0, 0).unwrap();

        let june_row = ledger.open_period("user-1", june).await.unwrap();
        ledger.commit(&june_row.id, Decimal::ONE).await.unwrap();

        let july_row = ledger.open_period("user-1", july).await.unwrap();
        assert_ne!(july_row.id, june_row.id);
        assert_eq!(july_row.used_credits, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_commit_unknown_period_fails() {
        let ledger = MemoryUsageLedger::new();
        assert!(ledger.commit("missing", Decimal::ONE).await.is_err());
    }
}
