use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate;
use crate::balance;
use crate::config::AppConfig;
use crate::insights::{self, InsightContext};
use crate::models::{
    BillingRecord, DailyUsage, DeviceUsage, Insight, Reading, TokenAnalytics, Trend, UsageMetrics,
};
use crate::trend;

/// Everything the dashboard derives from one reading window.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub today: NaiveDate,
    pub reading_count: usize,
    pub metrics: UsageMetrics,
    pub usage_trend: Trend,
    pub daily: Vec<DailyUsage>,
    pub tokens: TokenAnalytics,
    pub insights: Vec<Insight>,
}

/// Number of days of readings needed to fill both trend windows.
pub fn lookback_days(cfg: &AppConfig) -> usize {
    (cfg.analysis.trend_window_days * 2).max(7)
}

pub fn analyze(
    readings: &[Reading],
    billing: &[BillingRecord],
    devices: &[DeviceUsage],
    today: NaiveDate,
    cfg: &AppConfig,
) -> Analysis {
    let window = cfg.analysis.trend_window_days;
    let metrics = aggregate::usage_metrics(readings, today, &cfg.analysis);
    let daily =
        aggregate::daily_series(readings, today, lookback_days(cfg), cfg.analysis.offset());

    let recent_first: Vec<f64> = daily.iter().rev().map(|day| day.kwh).collect();
    let usage_trend = trend::usage_trend(&recent_first, window);

    let tokens = balance::token_analytics(&metrics, &daily, billing, today, window, &cfg.tokens);
    let ctx = InsightContext {
        metrics: &metrics,
        usage_trend,
        tokens: &tokens,
        devices,
    };
    let insights = insights::generate_insights(&ctx, &cfg.rules);

    tracing::debug!(
        readings = readings.len(),
        trend = usage_trend.trend.label(),
        insights = insights.len(),
        "analysis complete"
    );

    Analysis {
        today,
        reading_count: readings.len(),
        metrics,
        usage_trend: usage_trend.trend,
        daily,
        tokens,
        insights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{reading_at, today};
    use crate::models::{InsightCategory, Severity};

    #[test]
    fn empty_window_degrades_to_placeholder() {
        let analysis = analyze(&[], &[], &[], today(), &AppConfig::default());
        assert_eq!(analysis.reading_count, 0);
        assert_eq!(analysis.metrics, UsageMetrics::default());
        assert_eq!(analysis.usage_trend, Trend::Stable);
        assert_eq!(analysis.tokens.estimated_days_remaining, 0);
        assert_eq!(analysis.tokens.current_balance, 500.0);
        assert_eq!(analysis.insights.len(), 1);
        assert_eq!(analysis.insights[0].category, InsightCategory::General);
        assert_eq!(analysis.daily.len(), 14);
    }

    #[test]
    fn rising_week_is_flagged() {
        let mut readings = Vec::new();
        for days_ago in 0..14 {
            let kwh = if days_ago < 7 { 12.0 } else { 8.0 };
            readings.push(reading_at(days_ago, 9, kwh, kwh * 20.0));
        }

        let analysis = analyze(&readings, &[], &[], today(), &AppConfig::default());
        assert_eq!(analysis.usage_trend, Trend::Increasing);
        assert_eq!(analysis.metrics.daily_total, 12.0);
        assert_eq!(analysis.metrics.weekly_average, 12.0);
        assert_eq!(analysis.metrics.efficiency_score, 83);
        assert_eq!(analysis.tokens.trend, Trend::Increasing);
        // 500 - 240 * 7 floors at zero.
        assert_eq!(analysis.tokens.current_balance, 0.0);

        let trend = analysis
            .insights
            .iter()
            .find(|i| i.category == InsightCategory::Trend)
            .unwrap();
        assert_eq!(trend.severity, Severity::Warning);
        assert!(trend.description.contains("up 50%"));
        assert!(analysis
            .insights
            .iter()
            .any(|i| i.category == InsightCategory::Balance));
    }

    #[test]
    fn new_meter_trend_has_no_percentage() {
        let readings: Vec<Reading> = (0..3)
            .map(|days_ago| reading_at(days_ago, 9, 5.0, 100.0))
            .collect();

        let analysis = analyze(&readings, &[], &[], today(), &AppConfig::default());
        assert_eq!(analysis.usage_trend, Trend::Increasing);

        let trend = analysis
            .insights
            .iter()
            .find(|i| i.category == InsightCategory::Trend)
            .unwrap();
        assert_eq!(trend.severity, Severity::Info);
        assert!(!trend.description.contains("up 0%"));
        assert!(trend.description.starts_with("Recent usage averages 2.1 kWh/day."));
    }

    #[test]
    fn sparse_week_agrees_with_trend_windows() {
        let mut readings = vec![reading_at(0, 9, 14.0, 280.0), reading_at(3, 9, 14.0, 280.0)];
        for days_ago in 7..14 {
            readings.push(reading_at(days_ago, 9, 4.0, 80.0));
        }

        let analysis = analyze(&readings, &[], &[], today(), &AppConfig::default());
        assert_eq!(analysis.metrics.weekly_average, 4.0);
        assert_eq!(analysis.metrics.weekly_cost_average, 80.0);
        assert_eq!(analysis.metrics.efficiency_score, 100);
        assert_eq!(analysis.usage_trend, Trend::Stable);
        assert_eq!(analysis.insights[0].title, "Excellent efficiency");
    }
}
