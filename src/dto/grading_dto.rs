use crate::models::submission::PendingSubmission;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Body for `POST {base}/functions/v1/grade-exam`.
#[derive(Debug, Clone, Serialize)]
pub struct GradeRequest<'a> {
    pub exam_id: &'a str,
    pub student_data: &'a JsonValue,
    pub answers: &'a [JsonValue],
    pub violations: &'a [JsonValue],
    pub browser_info: &'a JsonValue,
    pub time_taken: i64,
}

impl<'a> GradeRequest<'a> {
    pub fn from_submission(submission: &'a PendingSubmission) -> Self {
        Self {
            exam_id: &submission.exam_id,
            student_data: &submission.student_data,
            answers: &submission.answers,
            violations: &submission.violations,
            browser_info: &submission.browser_info,
            time_taken: submission.time_taken_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeResponse {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
