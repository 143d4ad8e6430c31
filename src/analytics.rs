use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{
    CallRecord, DailyAverage, DashboardSnapshot, Sentiment, SentimentDistribution,
};
use crate::store::{CallStore, StoreError};

pub const WINDOW_DAYS: i64 = 7;

pub fn aggregate(records: &[CallRecord], as_of: DateTime<Utc>) -> DashboardSnapshot {
    DashboardSnapshot {
        success_rate: success_rate(records),
        sentiment_distribution: sentiment_distribution(records),
        daily_averages: daily_averages(records, as_of.date_naive()),
        total_calls: records.len(),
    }
}

pub async fn dashboard(
    calls: &dyn CallStore,
    as_of: DateTime<Utc>,
) -> Result<DashboardSnapshot, StoreError> {
    let records = calls.all().await?;
    tracing::debug!(records = records.len(), "aggregating call records");
    Ok(aggregate(&records, as_of))
}

pub fn success_rate(records: &[CallRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let successful = records.iter().filter(|r| r.successful).count();
    successful as f64 / records.len() as f64 * 100.0
}

pub fn sentiment_distribution(records: &[CallRecord]) -> SentimentDistribution {
    let mut distribution = SentimentDistribution::default();
    for record in records {
        match Sentiment::classify(&record.sentiment) {
            Sentiment::Positive => distribution.positive += 1,
            Sentiment::Negative => distribution.negative += 1,
            Sentiment::Neutral => distribution.neutral += 1,
        }
    }
    distribution
}

/// First calendar day of the trailing window ending on `today`.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WINDOW_DAYS - 1)
}

#[derive(Default)]
struct DayTotals {
    count: usize,
    duration: f64,
    iterations: f64,
    offer_difference: f64,
}

/// One entry per day from `today - 6` through `today`, zero-filled for days
/// without calls. Days are UTC calendar dates of `created_at`.
pub fn daily_averages(records: &[CallRecord], today: NaiveDate) -> Vec<DailyAverage> {
    let start = window_start(today);
    let mut by_day: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();

    for record in records {
        let day = record.created_at.date_naive();
        if day < start || day > today {
            continue;
        }

        let totals = by_day.entry(day).or_default();
        totals.count += 1;
        totals.duration += record.duration as f64;
        totals.iterations += record.offer_iterations as f64;
        totals.offer_difference += (record.final_offer - record.final_counter_offer).abs();
    }

    (0..WINDOW_DAYS)
        .map(|offset| {
            let date = start + Duration::days(offset);
            match by_day.get(&date) {
                Some(totals) if totals.count > 0 => {
                    let count = totals.count as f64;
                    DailyAverage {
                        date,
                        avg_duration: totals.duration / count,
                        avg_offer_iterations: totals.iterations / count,
                        avg_offer_difference: totals.offer_difference / count,
                    }
                }
                _ => DailyAverage {
                    date,
                    avg_duration: 0.0,
                    avg_offer_iterations: 0.0,
                    avg_offer_difference: 0.0,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::memory::MemoryStore;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap()
    }

    fn sample_call(id: &str, days_ago: i64, successful: bool, sentiment: &str) -> CallRecord {
        CallRecord {
            id: id.to_string(),
            duration: 120,
            mc_number: 123_456,
            final_offer: 2500.0,
            final_counter_offer: 2700.0,
            offer_iterations: 2,
            successful,
            sentiment: sentiment.to_string(),
            created_at: as_of() - Duration::days(days_ago),
        }
    }

    #[test]
    fn empty_history_has_zero_success_rate() {
        let snapshot = aggregate(&[], as_of());
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.total_calls, 0);
        assert_eq!(snapshot.sentiment_distribution, SentimentDistribution::default());
        assert_eq!(snapshot.daily_averages.len(), 7);
        assert!(snapshot
            .daily_averages
            .iter()
            .all(|d| d.avg_duration == 0.0 && d.avg_offer_iterations == 0.0));
    }

    #[test]
    fn success_rate_is_unrounded_percentage() {
        let records = vec![
            sample_call("a", 0, true, "positive"),
            sample_call("b", 0, false, "negative"),
            sample_call("c", 0, true, "neutral"),
        ];
        let snapshot = aggregate(&records, as_of());
        assert!((snapshot.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.total_calls, 3);
    }

    #[test]
    fn sentiment_is_case_insensitive_and_exhaustive() {
        let records = vec![
            sample_call("a", 0, true, "Positive"),
            sample_call("b", 1, true, "POSITIVE"),
            sample_call("c", 2, false, "negative"),
            sample_call("d", 3, false, "NeGaTiVe"),
            sample_call("e", 30, false, "angry"),
            sample_call("f", 4, true, ""),
            sample_call("g", 5, true, " positive"),
        ];
        let distribution = sentiment_distribution(&records);
        assert_eq!(distribution.positive, 2);
        assert_eq!(distribution.negative, 2);
        assert_eq!(distribution.neutral, 3);
        assert_eq!(distribution.total(), records.len());
    }

    #[test]
    fn daily_averages_cover_seven_consecutive_days_ending_today() {
        let records = vec![sample_call("a", 2, true, "positive")];
        let days = daily_averages(&records, as_of().date_naive());

        assert_eq!(days.len(), 7);
        assert_eq!(days[6].date, as_of().date_naive());
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        for pair in days.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
    }

    #[test]
    fn daily_averages_group_by_calendar_day() {
        let mut first = sample_call("a", 1, true, "positive");
        first.duration = 100;
        first.offer_iterations = 1;
        first.final_offer = 2000.0;
        first.final_counter_offer = 2400.0;
        let mut second = sample_call("b", 1, false, "negative");
        second.duration = 300;
        second.offer_iterations = 4;
        second.final_offer = 3000.0;
        second.final_counter_offer = 2800.0;
        let today = sample_call("c", 0, true, "neutral");

        let days = daily_averages(&[first, second, today], as_of().date_naive());

        let yesterday = &days[5];
        assert_eq!(yesterday.avg_duration, 200.0);
        assert_eq!(yesterday.avg_offer_iterations, 2.5);
        assert_eq!(yesterday.avg_offer_difference, 300.0);

        assert_eq!(days[6].avg_duration, 120.0);
        assert_eq!(days[6].avg_offer_difference, 200.0);
        assert!(days[..5].iter().all(|d| d.avg_duration == 0.0));
    }

    #[test]
    fn window_uses_calendar_dates_not_rolling_hours() {
        let today = as_of().date_naive();
        let mut early = sample_call("edge", 0, true, "positive");
        // 00:05 six days back is outside a 7x24h window from 15:30 but inside the calendar window
        early.created_at = Utc.with_ymd_and_hms(2026, 3, 4, 0, 5, 0).unwrap();
        let mut stale = sample_call("stale", 0, true, "positive");
        stale.created_at = Utc.with_ymd_and_hms(2026, 3, 3, 23, 59, 0).unwrap();

        let days = daily_averages(&[early, stale], today);
        assert_eq!(days[0].avg_duration, 120.0);
        assert_eq!(days.iter().filter(|d| d.avg_duration > 0.0).count(), 1);
    }

    #[test]
    fn calls_outside_window_still_count_toward_totals() {
        let records = vec![
            sample_call("old", 40, true, "positive"),
            sample_call("new", 0, false, "negative"),
        ];
        let snapshot = aggregate(&records, as_of());
        assert_eq!(snapshot.total_calls, 2);
        assert_eq!(snapshot.success_rate, 50.0);
        assert_eq!(snapshot.daily_averages[6].avg_duration, 120.0);
        assert!(snapshot.daily_averages[..6].iter().all(|d| d.avg_duration == 0.0));
    }

    #[test]
    fn future_calls_are_left_out_of_daily_averages() {
        let mut future = sample_call("future", 0, true, "positive");
        future.created_at = as_of() + Duration::days(1);
        let days = daily_averages(&[future], as_of().date_naive());
        assert!(days.iter().all(|d| d.avg_duration == 0.0));
    }

    #[test]
    fn snapshot_serializes_with_dashboard_field_names() {
        let snapshot = aggregate(&[sample_call("a", 0, true, "positive")], as_of());
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["successRate"], 100.0);
        assert_eq!(value["totalCalls"], 1);
        assert_eq!(value["sentimentDistribution"]["positive"], 1);
        let today = &value["dailyAverages"][6];
        assert_eq!(today["date"], "2026-03-10");
        assert_eq!(today["avgDuration"], 120.0);
        assert_eq!(today["avgOfferIterations"], 2.0);
        assert_eq!(today["avgOfferDifference"], 200.0);
    }

    #[tokio::test]
    async fn dashboard_reads_every_stored_call() {
        let store = MemoryStore::with_calls(vec![
            sample_call("a", 0, true, "positive"),
            sample_call("b", 10, false, "negative"),
        ]);
        let snapshot = dashboard(&store, as_of()).await.unwrap();
        assert_eq!(snapshot.total_calls, 2);
        assert_eq!(snapshot.success_rate, 50.0);
    }

    #[tokio::test]
    async fn dashboard_propagates_store_errors() {
        let store = MemoryStore::failing();
        let err = dashboard(&store, as_of()).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
