//! Prepaid token estimates.
//!
//! The balance is simulated from recent spend; there is no token ledger
//! behind these numbers.

use chrono::{Datelike, NaiveDate};

use crate::config::TokenConfig;
use crate::models::{BillingRecord, DailyUsage, TokenAnalytics, UsageMetrics};
use crate::trend;

pub fn simulated_balance(avg_daily_cost: f64, tokens: &TokenConfig) -> f64 {
    (tokens.starting_balance - avg_daily_cost * tokens.horizon_days as f64).max(0.0)
}

pub fn days_remaining(balance: f64, avg_daily_cost: f64) -> u32 {
    if avg_daily_cost > 0.0 {
        (balance / avg_daily_cost).floor().max(0.0) as u32
    } else {
        0
    }
}

pub fn monthly_spending(billing: &[BillingRecord], today: NaiveDate) -> f64 {
    billing
        .iter()
        .filter(|bill| {
            bill.billing_date.year() == today.year() && bill.billing_date.month() == today.month()
        })
        .map(|bill| bill.amount)
        .sum()
}

/// `series` is the oldest-first daily series used for the cost trend.
pub fn token_analytics(
    metrics: &UsageMetrics,
    series: &[DailyUsage],
    billing: &[BillingRecord],
    today: NaiveDate,
    trend_window: usize,
    tokens: &TokenConfig,
) -> TokenAnalytics {
    let avg_cost = metrics.weekly_cost_average;
    let balance = simulated_balance(avg_cost, tokens);
    let recent_first: Vec<f64> = series.iter().rev().map(|day| day.cost).collect();

    TokenAnalytics {
        current_balance: balance,
        daily_consumption_avg: metrics.weekly_average,
        estimated_days_remaining: days_remaining(balance, avg_cost),
        monthly_spending: monthly_spending(billing, today),
        trend: trend::usage_trend(&recent_first, trend_window).trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trend;
    use chrono::Duration;
    use uuid::Uuid;

    fn bill(date: NaiveDate, amount: f64) -> BillingRecord {
        BillingRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            meter_number: "37182045123".to_string(),
            billing_date: date,
            amount,
            units_kwh: amount / 25.0,
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, n).unwrap()
    }

    #[test]
    fn balance_is_floored_at_zero() {
        let tokens = TokenConfig::default();
        assert_eq!(simulated_balance(20.0, &tokens), 360.0);
        assert_eq!(simulated_balance(100.0, &tokens), 0.0);
        assert_eq!(simulated_balance(0.0, &tokens), 500.0);
    }

    #[test]
    fn days_remaining_floors_and_guards_zero_cost() {
        assert_eq!(days_remaining(360.0, 20.0), 18);
        assert_eq!(days_remaining(100.0, 30.0), 3);
        assert_eq!(days_remaining(500.0, 0.0), 0);
    }

    #[test]
    fn monthly_spending_only_counts_current_month() {
        let billing = vec![
            bill(day(2), 1500.0),
            bill(day(10), 500.0),
            bill(day(1) - Duration::days(1), 9000.0),
        ];
        assert_eq!(monthly_spending(&billing, day(14)), 2000.0);
        assert_eq!(monthly_spending(&[], day(14)), 0.0);
    }

    #[test]
    fn analytics_combine_metrics_and_billing() {
        let metrics = UsageMetrics {
            weekly_average: 8.0,
            weekly_cost_average: 40.0,
            ..UsageMetrics::default()
        };
        let series: Vec<DailyUsage> = (1..=4)
            .map(|n| DailyUsage {
                date: day(10 + n),
                kwh: 2.0,
                cost: if n > 2 { 60.0 } else { 20.0 },
            })
            .collect();

        let analytics = token_analytics(
            &metrics,
            &series,
            &[bill(day(3), 750.0)],
            day(14),
            2,
            &TokenConfig::default(),
        );

        assert_eq!(analytics.current_balance, 220.0);
        assert_eq!(analytics.estimated_days_remaining, 5);
        assert_eq!(analytics.daily_consumption_avg, 8.0);
        assert_eq!(analytics.monthly_spending, 750.0);
        assert_eq!(analytics.trend, Trend::Increasing);
    }
}
