use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{DailyAverage, DashboardSnapshot};

/// Busiest day in the window by average call duration, ignoring empty days.
pub fn longest_call_day(snapshot: &DashboardSnapshot) -> Option<&DailyAverage> {
    snapshot
        .daily_averages
        .iter()
        .filter(|day| day.avg_duration > 0.0)
        .max_by(|a, b| {
            a.avg_duration
                .partial_cmp(&b.avg_duration)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn build_report(snapshot: &DashboardSnapshot, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Carrier Call Dashboard");
    let _ = writeln!(
        output,
        "Generated {} across {} calls",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        snapshot.total_calls
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Outcomes");

    if snapshot.total_calls == 0 {
        let _ = writeln!(output, "No calls recorded yet.");
    } else {
        let _ = writeln!(output, "- Success rate: {:.1}%", snapshot.success_rate);
        let sentiment = &snapshot.sentiment_distribution;
        for (label, count) in [
            ("positive", sentiment.positive),
            ("negative", sentiment.negative),
            ("neutral", sentiment.neutral),
        ] {
            let _ = writeln!(
                output,
                "- {}: {} calls ({:.1}%)",
                label,
                count,
                share(count, sentiment.total())
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Last 7 Days");
    let _ = writeln!(
        output,
        "| Date | Avg duration (s) | Avg offer rounds | Avg offer gap |"
    );
    let _ = writeln!(output, "|---|---|---|---|");
    for day in &snapshot.daily_averages {
        let _ = writeln!(
            output,
            "| {} | {:.1} | {:.1} | {:.2} |",
            day.date, day.avg_duration, day.avg_offer_iterations, day.avg_offer_difference
        );
    }

    let _ = writeln!(output);
    match longest_call_day(snapshot) {
        Some(day) => {
            let _ = writeln!(
                output,
                "Longest calls on {} ({:.1}s on average).",
                day.date, day.avg_duration
            );
        }
        None => {
            let _ = writeln!(output, "No calls in the last 7 days.");
        }
    }

    output
}
