use std::fmt::Write;

use crate::analysis::Analysis;
use crate::models::Insight;

const NO_DATA: &str = "No readings recorded for this window.";

pub fn format_insight(insight: &Insight) -> String {
    format!(
        "[{}] {}: {} ({:?} impact)",
        insight.severity.color(),
        insight.title,
        insight.description,
        insight.impact
    )
}

/// Short plain-text summary for the terminal.
pub fn build_summary(scope_label: &str, analysis: &Analysis) -> String {
    let mut output = String::new();
    let metrics = &analysis.metrics;
    let tokens = &analysis.tokens;

    let _ = writeln!(output, "Usage for {} on {}", scope_label, analysis.today);
    if analysis.reading_count == 0 {
        let _ = writeln!(output, "{NO_DATA}");
        return output;
    }

    let _ = writeln!(
        output,
        "- Today: {:.2} kWh, cost {:.2}",
        metrics.daily_total, metrics.daily_cost
    );
    let _ = writeln!(
        output,
        "- Weekly average: {:.2} kWh/day, cost {:.2}/day",
        metrics.weekly_average, metrics.weekly_cost_average
    );
    let _ = writeln!(
        output,
        "- Efficiency score: {}%, peak-hour share {:.0}%",
        metrics.efficiency_score,
        metrics.peak_hour_share * 100.0
    );
    let _ = writeln!(output, "- Usage trend: {}", analysis.usage_trend.label());
    let _ = writeln!(
        output,
        "- Estimated balance: {:.2} ({} days remaining, {} spend)",
        tokens.current_balance,
        tokens.estimated_days_remaining,
        tokens.trend.label()
    );
    let _ = writeln!(output, "- Spent this month: {:.2}", tokens.monthly_spending);
    output
}

pub fn build_report(scope_label: &str, analysis: &Analysis) -> String {
    let mut output = String::new();
    let metrics = &analysis.metrics;
    let tokens = &analysis.tokens;

    let _ = writeln!(output, "# Energy Usage Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} readings)",
        scope_label, analysis.today, analysis.reading_count
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Consumption");

    if analysis.reading_count == 0 {
        let _ = writeln!(output, "{NO_DATA}");
    } else {
        let _ = writeln!(
            output,
            "- Today: {:.2} kWh costing {:.2}",
            metrics.daily_total, metrics.daily_cost
        );
        let _ = writeln!(
            output,
            "- 7-day average: {:.2} kWh/day costing {:.2}/day",
            metrics.weekly_average, metrics.weekly_cost_average
        );
        let _ = writeln!(output, "- Efficiency score: {}%", metrics.efficiency_score);
        let _ = writeln!(output, "- Peak-hour share: {:.0}%", metrics.peak_hour_share * 100.0);
        let _ = writeln!(output, "- Trend: {}", analysis.usage_trend.label());
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Token Estimate");
    let _ = writeln!(output, "- Simulated balance: {:.2}", tokens.current_balance);
    let _ = writeln!(output, "- Days remaining: {}", tokens.estimated_days_remaining);
    let _ = writeln!(output, "- Spent this month: {:.2}", tokens.monthly_spending);
    let _ = writeln!(output, "- Spend trend: {}", tokens.trend.label());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");
    for insight in &analysis.insights {
        let _ = writeln!(output, "- {}", format_insight(insight));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Usage");
    if analysis.reading_count == 0 {
        let _ = writeln!(output, "{NO_DATA}");
    } else {
        let _ = writeln!(output, "| Date | kWh | Cost |");
        let _ = writeln!(output, "| --- | ---: | ---: |");
        for day in analysis.daily.iter().rev() {
            let _ = writeln!(output, "| {} | {:.2} | {:.2} |", day.date, day.kwh, day.cost);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{reading_at, today};
    use crate::analysis::analyze;
    use crate::config::AppConfig;

    #[test]
    fn empty_report_shows_placeholders() {
        let analysis = analyze(&[], &[], &[], today(), &AppConfig::default());
        let report = build_report("meter 37182045123", &analysis);
        assert!(report.starts_with("# Energy Usage Report"));
        assert!(report.contains("Generated for meter 37182045123 on 2026-03-14 (0 readings)"));
        assert_eq!(report.matches(NO_DATA).count(), 2);
        assert!(report.contains("[blue] Usage looks normal"));
    }

    #[test]
    fn report_lists_daily_rows_newest_first() {
        let readings = vec![reading_at(0, 9, 10.0, 200.0), reading_at(1, 9, 4.0, 80.0)];
        let analysis = analyze(&readings, &[], &[], today(), &AppConfig::default());
        let report = build_report("all meters", &analysis);

        assert!(report.contains("- Today: 10.00 kWh costing 200.00"));
        let newest = report.find("| 2026-03-14 | 10.00 | 200.00 |").unwrap();
        let older = report.find("| 2026-03-13 | 4.00 | 80.00 |").unwrap();
        assert!(newest < older);
    }

    #[test]
    fn summary_stops_at_placeholder_without_readings() {
        let analysis = analyze(&[], &[], &[], today(), &AppConfig::default());
        let summary = build_summary("all meters", &analysis);
        assert_eq!(summary.lines().count(), 2);
        assert!(summary.ends_with(&format!("{NO_DATA}\n")));
    }

    #[test]
    fn insight_line_carries_color_and_impact() {
        let readings: Vec<_> = (0..7)
            .map(|days_ago| reading_at(days_ago, 9, 40.0, 800.0))
            .collect();
        let analysis = analyze(&readings, &[], &[], today(), &AppConfig::default());
        let line = format_insight(&analysis.insights[0]);
        assert!(line.starts_with("[red] High consumption"));
        assert!(line.ends_with("(High impact)"));
    }
}
