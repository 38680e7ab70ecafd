//! Threshold rules that turn usage metrics into insight cards.
//!
//! Every rule sees the same context and may add one insight. Rules never
//! suppress each other; the default insight is only added when the whole
//! list came back empty.

use crate::config::RuleThresholds;
use crate::models::{
    DeviceUsage, Impact, Insight, InsightCategory, Severity, TokenAnalytics, Trend, UsageMetrics,
};
use crate::trend::{self, WindowComparison};

#[derive(Debug, Clone, Copy)]
pub struct InsightContext<'a> {
    pub metrics: &'a UsageMetrics,
    /// Trend of daily kWh with the recent and prior window means.
    pub usage_trend: WindowComparison,
    pub tokens: &'a TokenAnalytics,
    pub devices: &'a [DeviceUsage],
}

impl InsightContext<'_> {
    fn has_consumption(&self) -> bool {
        self.metrics.weekly_average > 0.0
    }
}

type Rule = fn(&InsightContext<'_>, &RuleThresholds) -> Option<Insight>;

const RULES: &[Rule] = &[
    efficiency_rule,
    peak_hour_rule,
    device_share_rule,
    trend_rule,
    low_balance_rule,
];

pub fn generate_insights(ctx: &InsightContext<'_>, thresholds: &RuleThresholds) -> Vec<Insight> {
    let mut insights: Vec<Insight> = RULES
        .iter()
        .filter_map(|rule| rule(ctx, thresholds))
        .collect();

    if insights.is_empty() {
        insights.push(default_insight());
    }

    tracing::debug!(count = insights.len(), "generated insights");
    insights
}

fn insight(
    category: InsightCategory,
    severity: Severity,
    impact: Impact,
    title: &str,
    description: String,
) -> Insight {
    Insight {
        category,
        title: title.to_string(),
        description,
        severity,
        impact,
    }
}

fn default_insight() -> Insight {
    insight(
        InsightCategory::General,
        Severity::Info,
        Impact::Low,
        "Usage looks normal",
        "No thresholds were crossed by the current readings.".to_string(),
    )
}

fn efficiency_rule(ctx: &InsightContext<'_>, thresholds: &RuleThresholds) -> Option<Insight> {
    if !ctx.has_consumption() {
        return None;
    }

    let score = ctx.metrics.efficiency_score;
    let average = ctx.metrics.weekly_average;
    let card = if score >= thresholds.efficiency_excellent {
        insight(
            InsightCategory::Efficiency,
            Severity::Success,
            Impact::Low,
            "Excellent efficiency",
            format!(
                "Efficiency score {score}%. Averaging {average:.1} kWh/day, within your baseline."
            ),
        )
    } else if score >= thresholds.efficiency_fair {
        insight(
            InsightCategory::Efficiency,
            Severity::Warning,
            Impact::Medium,
            "Room for improvement",
            format!(
                "Efficiency score {score}%. Averaging {average:.1} kWh/day, above your baseline."
            ),
        )
    } else {
        insight(
            InsightCategory::Efficiency,
            Severity::Alert,
            Impact::High,
            "High consumption",
            format!(
                "Efficiency score {score}%. Averaging {average:.1} kWh/day, \
                 well above your baseline."
            ),
        )
    };
    Some(card)
}

fn peak_hour_rule(ctx: &InsightContext<'_>, thresholds: &RuleThresholds) -> Option<Insight> {
    let share = ctx.metrics.peak_hour_share;
    if share <= thresholds.peak_share_warning {
        return None;
    }

    Some(insight(
        InsightCategory::PeakUsage,
        Severity::Warning,
        Impact::Medium,
        "Heavy peak-hour usage",
        format!(
            "{:.0}% of this week's consumption fell in peak hours. \
             Shifting laundry or water heating earlier can cut costs.",
            share * 100.0
        ),
    ))
}

fn device_share_rule(ctx: &InsightContext<'_>, thresholds: &RuleThresholds) -> Option<Insight> {
    let total: f64 = ctx.devices.iter().map(|device| device.kwh).sum();
    if total <= 0.0 {
        return None;
    }

    let top = ctx
        .devices
        .iter()
        .max_by(|a, b| a.kwh.partial_cmp(&b.kwh).unwrap_or(std::cmp::Ordering::Equal))?;
    let share = top.kwh / total;
    if share <= thresholds.device_share_notice {
        return None;
    }

    Some(insight(
        InsightCategory::Device,
        Severity::Info,
        Impact::Medium,
        "Dominant appliance category",
        format!(
            "{} accounts for {:.0}% of tracked consumption ({:.1} kWh).",
            top.category,
            share * 100.0,
            top.kwh
        ),
    ))
}

fn trend_rule(ctx: &InsightContext<'_>, _thresholds: &RuleThresholds) -> Option<Insight> {
    let comparison = ctx.usage_trend;
    let recent = comparison.recent;
    let change = trend::percent_change(recent, comparison.prior);

    match comparison.trend {
        Trend::Increasing if !comparison.has_baseline() => Some(insight(
            InsightCategory::Trend,
            Severity::Info,
            Impact::Low,
            "New usage recorded",
            format!(
                "Recent usage averages {recent:.1} kWh/day. \
                 There is no earlier usage to compare against yet."
            ),
        )),
        Trend::Increasing => Some(insight(
            InsightCategory::Trend,
            Severity::Warning,
            Impact::Medium,
            "Usage is rising",
            format!(
                "Recent usage averages {recent:.1} kWh/day, up {:.0}% on the previous period.",
                change.abs()
            ),
        )),
        Trend::Decreasing => Some(insight(
            InsightCategory::Trend,
            Severity::Success,
            Impact::Low,
            "Usage is falling",
            format!(
                "Recent usage averages {recent:.1} kWh/day, down {:.0}% on the previous period.",
                change.abs()
            ),
        )),
        Trend::Stable => None,
    }
}

fn low_balance_rule(ctx: &InsightContext<'_>, thresholds: &RuleThresholds) -> Option<Insight> {
    let days_left = ctx.tokens.estimated_days_remaining;
    if !ctx.has_consumption() || days_left >= thresholds.low_balance_days {
        return None;
    }

    Some(insight(
        InsightCategory::Balance,
        Severity::Alert,
        Impact::High,
        "Token balance running low",
        format!(
            "About {days_left} day(s) of tokens left at the current spend. \
             Top up to avoid disconnection."
        ),
    ))
}
