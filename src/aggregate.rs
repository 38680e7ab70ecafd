use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};

use crate::config::AnalysisConfig;
use crate::models::{DailyUsage, Reading, UsageMetrics};

const WEEK_DAYS: i64 = 7;

pub fn local_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

pub fn local_hour(timestamp: DateTime<Utc>, offset: FixedOffset) -> u32 {
    timestamp.with_timezone(&offset).hour()
}

fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days.max(1) - 1)
}

fn bucket_by_day(
    readings: &[Reading],
    start: NaiveDate,
    today: NaiveDate,
    offset: FixedOffset,
) -> BTreeMap<NaiveDate, (f64, f64)> {
    let mut buckets: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for reading in readings {
        let date = local_date(reading.timestamp, offset);
        if date < start || date > today {
            continue;
        }
        let entry = buckets.entry(date).or_insert((0.0, 0.0));
        entry.0 += reading.kwh_consumed;
        entry.1 += reading.total_cost;
    }

    buckets
}

/// Per-day totals for the `days` days ending on `today`, oldest first.
/// Days without readings are reported as zero.
pub fn daily_series(
    readings: &[Reading],
    today: NaiveDate,
    days: usize,
    offset: FixedOffset,
) -> Vec<DailyUsage> {
    let days = days.max(1) as i64;
    let start = window_start(today, days);
    let buckets = bucket_by_day(readings, start, today, offset);

    (0..days)
        .map(|i| {
            let date = start + Duration::days(i);
            let (kwh, cost) = buckets.get(&date).copied().unwrap_or((0.0, 0.0));
            DailyUsage { date, kwh, cost }
        })
        .collect()
}

/// Fraction of the week's kWh that fell inside the configured peak hours.
pub fn peak_hour_share(readings: &[Reading], today: NaiveDate, analysis: &AnalysisConfig) -> f64 {
    let offset = analysis.offset();
    let start = window_start(today, WEEK_DAYS);
    let mut total = 0.0;
    let mut peak = 0.0;

    for reading in readings {
        let date = local_date(reading.timestamp, offset);
        if date < start || date > today {
            continue;
        }
        total += reading.kwh_consumed;
        if analysis.is_peak_hour(local_hour(reading.timestamp, offset)) {
            peak += reading.kwh_consumed;
        }
    }

    if total > 0.0 {
        peak / total
    } else {
        0.0
    }
}

/// 0 means no consumption to score.
pub fn efficiency_score(weekly_average: f64, baseline_daily_kwh: f64) -> u8 {
    if weekly_average <= 0.0 {
        return 0;
    }
    if weekly_average <= baseline_daily_kwh {
        return 100;
    }
    (100.0 * baseline_daily_kwh / weekly_average)
        .round()
        .clamp(0.0, 100.0) as u8
}

pub fn usage_metrics(
    readings: &[Reading],
    today: NaiveDate,
    analysis: &AnalysisConfig,
) -> UsageMetrics {
    let offset = analysis.offset();
    let buckets = bucket_by_day(readings, window_start(today, WEEK_DAYS), today, offset);

    let (daily_total, daily_cost) = buckets.get(&today).copied().unwrap_or((0.0, 0.0));
    // Days without readings count as zero-usage days.
    let weekly_kwh: f64 = buckets.values().map(|(kwh, _)| kwh).sum();
    let weekly_cost: f64 = buckets.values().map(|(_, cost)| cost).sum();
    let weekly_average = weekly_kwh / WEEK_DAYS as f64;

    UsageMetrics {
        daily_total,
        daily_cost,
        weekly_average,
        weekly_cost_average: weekly_cost / WEEK_DAYS as f64,
        peak_hour_share: peak_hour_share(readings, today, analysis),
        efficiency_score: efficiency_score(weekly_average, analysis.baseline_daily_kwh),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    pub(crate) fn reading_at(days_ago: i64, hour: u32, kwh: f64, cost: f64) -> Reading {
        let offset = AnalysisConfig::default().offset();
        let date = today() - Duration::days(days_ago);
        let local = offset
            .from_local_datetime(&date.and_hms_opt(hour, 15, 0).unwrap())
            .single()
            .unwrap();
        Reading {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            meter_number: "37182045123".to_string(),
            timestamp: local.with_timezone(&Utc),
            kwh_consumed: kwh,
            total_cost: cost,
        }
    }

    #[test]
    fn empty_readings_yield_zero_metrics() {
        let metrics = usage_metrics(&[], today(), &AnalysisConfig::default());
        assert_eq!(metrics.daily_total, 0.0);
        assert_eq!(metrics.daily_cost, 0.0);
        assert_eq!(metrics.weekly_average, 0.0);
        assert_eq!(metrics.weekly_cost_average, 0.0);
        assert_eq!(metrics.peak_hour_share, 0.0);
        assert_eq!(metrics, UsageMetrics::default());
    }

    #[test]
    fn sums_current_day_usage_and_cost() {
        let readings = vec![
            reading_at(0, 20, 6.0, 120.0),
            reading_at(0, 8, 4.0, 80.0),
            reading_at(1, 9, 7.0, 140.0),
        ];
        let metrics = usage_metrics(&readings, today(), &AnalysisConfig::default());
        assert_eq!(metrics.daily_total, 10.0);
        assert_eq!(metrics.daily_cost, 200.0);
    }

    #[test]
    fn weekly_average_spreads_over_all_seven_days() {
        let readings = vec![
            reading_at(0, 9, 14.0, 280.0),
            reading_at(3, 9, 14.0, 280.0),
            reading_at(7, 9, 100.0, 2000.0),
        ];
        let metrics = usage_metrics(&readings, today(), &AnalysisConfig::default());
        assert_eq!(metrics.weekly_average, 4.0);
        assert_eq!(metrics.weekly_cost_average, 80.0);
        assert_eq!(metrics.efficiency_score, 100);
    }

    #[test]
    fn late_evening_utc_counts_toward_next_local_day() {
        // 22:30 UTC on the 13th is 01:30 on the 14th at +03:00.
        let reading = Reading {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 13, 22, 30, 0).unwrap(),
            ..reading_at(5, 9, 3.0, 60.0)
        };
        let metrics = usage_metrics(&[reading], today(), &AnalysisConfig::default());
        assert_eq!(metrics.daily_total, 3.0);
    }

    #[test]
    fn daily_series_is_zero_filled_oldest_first() {
        let readings = vec![reading_at(0, 9, 5.0, 100.0), reading_at(2, 9, 3.0, 60.0)];
        let series = daily_series(&readings, today(), 4, AnalysisConfig::default().offset());
        let kwh: Vec<f64> = series.iter().map(|day| day.kwh).collect();
        assert_eq!(kwh, vec![0.0, 3.0, 0.0, 5.0]);
        assert_eq!(series[3].date, today());
        assert_eq!(series[1].cost, 60.0);
    }

    #[test]
    fn peak_share_counts_evening_consumption() {
        let readings = vec![
            reading_at(0, 19, 3.0, 60.0),
            reading_at(1, 10, 1.0, 20.0),
            reading_at(2, 21, 4.0, 80.0),
        ];
        let share = peak_hour_share(&readings, today(), &AnalysisConfig::default());
        assert!((share - 7.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn efficiency_score_bands_against_baseline() {
        assert_eq!(efficiency_score(0.0, 10.0), 0);
        assert_eq!(efficiency_score(8.0, 10.0), 100);
        assert_eq!(efficiency_score(12.5, 10.0), 80);
        assert_eq!(efficiency_score(40.0, 10.0), 25);
    }
}
