use crate::models::Trend;

const UPPER_BAND: f64 = 1.1;
const LOWER_BAND: f64 = 0.9;

pub fn classify_trend(recent: f64, prior: f64) -> Trend {
    if recent > prior * UPPER_BAND {
        Trend::Increasing
    } else if recent < prior * LOWER_BAND {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

pub fn window_average(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Label plus the two window means it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowComparison {
    pub trend: Trend,
    pub recent: f64,
    pub prior: f64,
}

impl WindowComparison {
    /// False when the prior window recorded no usage to compare against.
    pub fn has_baseline(&self) -> bool {
        self.prior > 0.0
    }
}

/// Compares the first `window` values of a most-recent-first series with the
/// `window` values that follow them.
pub fn usage_trend(recent_first: &[f64], window: usize) -> WindowComparison {
    let window = window.max(1);
    let split = window.min(recent_first.len());
    let (recent, rest) = recent_first.split_at(split);
    let prior = &rest[..window.min(rest.len())];

    let recent = window_average(recent);
    let prior = window_average(prior);
    WindowComparison {
        trend: classify_trend(recent, prior),
        recent,
        prior,
    }
}

pub fn percent_change(recent: f64, prior: f64) -> f64 {
    if prior == 0.0 {
        0.0
    } else {
        (recent - prior) / prior * 100.0
    }
}
