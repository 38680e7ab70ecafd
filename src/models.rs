use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Reading {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meter_number: String,
    pub timestamp: DateTime<Utc>,
    pub kwh_consumed: f64,
    pub total_cost: f64,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct BillingRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meter_number: String,
    pub billing_date: NaiveDate,
    pub amount: f64,
    pub units_kwh: f64,
}

/// Consumption attributed to one appliance category over the current window.
#[derive(Debug, Clone)]
pub struct DeviceUsage {
    pub category: String,
    pub kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub kwh: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageMetrics {
    pub daily_total: f64,
    pub daily_cost: f64,
    pub weekly_average: f64,
    pub weekly_cost_average: f64,
    pub peak_hour_share: f64,
    pub efficiency_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenAnalytics {
    pub current_balance: f64,
    pub daily_consumption_avg: f64,
    pub estimated_days_remaining: u32,
    pub monthly_spending: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Alert,
    Warning,
    Success,
    Info,
}

impl Severity {
    pub fn color(self) -> &'static str {
        match self {
            Severity::Alert => "red",
            Severity::Warning => "amber",
            Severity::Success => "green",
            Severity::Info => "blue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Efficiency,
    PeakUsage,
    Device,
    Trend,
    Balance,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub impact: Impact,
}
