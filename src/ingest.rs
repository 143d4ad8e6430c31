//! Validation of inbound call records before they reach the store.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::CallRecord;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has the wrong type: {reason}")]
    WrongType { field: &'static str, reason: String },

    #[error("field `{field}` must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SuccessFlag {
    Bool(bool),
    Text(String),
}

impl SuccessFlag {
    pub fn normalize(self) -> Result<bool, ValidationError> {
        match self {
            SuccessFlag::Bool(value) => Ok(value),
            SuccessFlag::Text(text) if text == "Success" => Ok(true),
            SuccessFlag::Text(text) => Err(ValidationError::WrongType {
                field: "successful",
                reason: format!("expected boolean or \"Success\", got \"{text}\""),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallPayload {
    pub id: Option<String>,
    pub duration: Option<i64>,
    pub mc_number: Option<i64>,
    pub final_offer: Option<f64>,
    pub final_counter_offer: Option<f64>,
    pub offer_iterations: Option<i64>,
    pub successful: Option<SuccessFlag>,
    pub sentiment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CallPayload {
    pub fn from_json(input: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(input).map_err(|err| ValidationError::Malformed(err.to_string()))
    }

    /// `now` stands in for `created_at` when the payload leaves it out.
    pub fn validate(self, now: DateTime<Utc>) -> Result<CallRecord, ValidationError> {
        let id = required("id", self.id)?;
        if id.trim().is_empty() {
            return Err(ValidationError::MissingField("id"));
        }

        Ok(CallRecord {
            id,
            duration: non_negative("duration", required("duration", self.duration)?)?,
            mc_number: required("mc_number", self.mc_number)?,
            final_offer: finite("final_offer", required("final_offer", self.final_offer)?)?,
            final_counter_offer: finite(
                "final_counter_offer",
                required("final_counter_offer", self.final_counter_offer)?,
            )?,
            offer_iterations: non_negative(
                "offer_iterations",
                required("offer_iterations", self.offer_iterations)?,
            )?,
            successful: required("successful", self.successful)?.normalize()?,
            sentiment: required("sentiment", self.sentiment)?,
            created_at: self.created_at.unwrap_or(now),
        })
    }
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

fn non_negative(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::WrongType {
            field,
            reason: format!("expected a finite number, got {value}"),
        });
    }
    Ok(value)
}

/// Parses a textual `successful` column: `true`/`false` in any case, or `Success`.
pub fn parse_success_text(raw: &str) -> Result<bool, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        SuccessFlag::Text(trimmed.to_string()).normalize()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    const FULL: &str = r#"{
        "id": "call-001",
        "duration": 245,
        "mc_number": 998877,
        "final_offer": 2600,
        "final_counter_offer": 2750.5,
        "offer_iterations": 3,
        "successful": true,
        "sentiment": "Positive"
    }"#;

    #[test]
    fn accepts_complete_payload_and_defaults_created_at() {
        let record = CallPayload::from_json(FULL).unwrap().validate(now()).unwrap();
        assert_eq!(record.id, "call-001");
        assert_eq!(record.duration, 245);
        assert_eq!(record.final_offer, 2600.0);
        assert_eq!(record.final_counter_offer, 2750.5);
        assert!(record.successful);
        assert_eq!(record.sentiment, "Positive");
        assert_eq!(record.created_at, now());
    }

    #[test]
    fn keeps_supplied_created_at() {
        let payload = FULL.replace(
            "\"sentiment\"",
            "\"created_at\": \"2026-03-08T12:00:00Z\", \"sentiment\"",
        );
        let record = CallPayload::from_json(&payload).unwrap().validate(now()).unwrap();
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn success_literal_normalizes_to_true() {
        let payload = FULL.replace("\"successful\": true", "\"successful\": \"Success\"");
        let record = CallPayload::from_json(&payload).unwrap().validate(now()).unwrap();
        assert!(record.successful);
    }

    #[test]
    fn other_success_strings_are_type_errors() {
        for text in ["success", "yes", "true", ""] {
            let payload = FULL.replace(
                "\"successful\": true",
                &format!("\"successful\": \"{text}\""),
            );
            let err = CallPayload::from_json(&payload)
                .unwrap()
                .validate(now())
                .unwrap_err();
            assert!(
                matches!(err, ValidationError::WrongType { field: "successful", .. }),
                "{text}: {err:?}"
            );
        }
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let payload = FULL.replace("\"mc_number\": 998877,", "");
        let err = CallPayload::from_json(&payload)
            .unwrap()
            .validate(now())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("mc_number"));
    }

    #[test]
    fn blank_id_is_missing() {
        let payload = FULL.replace("call-001", "  ");
        let err = CallPayload::from_json(&payload)
            .unwrap()
            .validate(now())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("id"));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let payload = FULL.replace("\"offer_iterations\": 3", "\"offer_iterations\": -1");
        let err = CallPayload::from_json(&payload)
            .unwrap()
            .validate(now())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Negative {
                field: "offer_iterations",
                value: -1
            }
        );
    }

    #[test]
    fn non_numeric_fields_are_malformed() {
        let payload = FULL.replace("\"duration\": 245", "\"duration\": \"long\"");
        let err = CallPayload::from_json(&payload).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn textual_success_column() {
        assert_eq!(parse_success_text("TRUE"), Ok(true));
        assert_eq!(parse_success_text(" false "), Ok(false));
        assert_eq!(parse_success_text("Success"), Ok(true));
        assert!(parse_success_text("maybe").is_err());
    }
}
