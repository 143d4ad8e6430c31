use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Load {
    pub load_id: i64,
    pub origin: String,
    pub destination: String,
    pub pickup_datetime: DateTime<Utc>,
    pub delivery_datetime: DateTime<Utc>,
    pub equipment_type: String,
    pub loadboard_rate: f64,
    pub maximum_rate: f64,
    pub notes: String,
    pub weight: f64,
    pub commodity_type: String,
    pub num_of_pieces: i32,
    pub miles: f64,
    pub dimensions: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegotiationRequest {
    pub load_id: i64,
    pub offered_rate: f64,
    pub counter_offer: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NegotiationResult {
    pub new_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub id: String,
    pub duration: i64,
    pub mc_number: i64,
    pub final_offer: f64,
    pub final_counter_offer: f64,
    pub offer_iterations: i64,
    pub successful: bool,
    pub sentiment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn classify(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("positive") {
            Sentiment::Positive
        } else if raw.eq_ignore_ascii_case("negative") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverage {
    pub date: NaiveDate,
    pub avg_duration: f64,
    pub avg_offer_iterations: f64,
    pub avg_offer_difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub success_rate: f64,
    pub sentiment_distribution: SentimentDistribution,
    pub daily_averages: Vec<DailyAverage>,
    pub total_calls: usize,
}
