use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// An exam submission whose direct grading call failed (or was made offline),
/// held locally until the grading endpoint accepts it.
///
/// `attempts` and `next_retry_at` are local retry bookkeeping and are not part
/// of the payload sent to the grading endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub exam_id: String,
    pub student_data: JsonValue,
    pub answers: Vec<JsonValue>,
    #[serde(default)]
    pub violations: Vec<JsonValue>,
    pub browser_info: JsonValue,
    pub time_taken_seconds: i64,
    pub created_locally_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl PendingSubmission {
    pub fn new(
        exam_id: impl Into<String>,
        student_data: JsonValue,
        answers: Vec<JsonValue>,
        violations: Vec<JsonValue>,
        browser_info: JsonValue,
        time_taken_seconds: i64,
    ) -> Self {
        Self {
            exam_id: exam_id.into(),
            student_data,
            answers,
            violations,
            browser_info,
            time_taken_seconds,
            created_locally_at: Utc::now(),
            attempts: 0,
            next_retry_at: None,
        }
    }

    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.next_retry_at {
            Some(at) => at <= now,
            None => true,
        }
    }
}
