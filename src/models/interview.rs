use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: InterviewStatus,
    pub stream_call_id: String,
    pub candidate_id: String,
    pub interviewer_ids: Vec<String>,
    pub student_answer: Option<String>,
    pub ai_feedback: Option<Json<AiFeedback>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status. Storage keeps a free-form string; anything outside the
/// four known values is carried as `Other`. `From<String>` also backs the
/// `try_from` conversion used when decoding rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InterviewStatus {
    Upcoming,
    Completed,
    Succeeded,
    Failed,
    Other(String),
}

impl InterviewStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InterviewStatus::Upcoming => "upcoming",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Succeeded => "succeeded",
            InterviewStatus::Failed => "failed",
            InterviewStatus::Other(raw) => raw,
        }
    }

    /// Succeeded and failed are final verdicts set by an interviewer.
    pub fn is_decided(&self) -> bool {
        matches!(self, InterviewStatus::Succeeded | InterviewStatus::Failed)
    }
}

impl From<String> for InterviewStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "upcoming" => InterviewStatus::Upcoming,
            "completed" => InterviewStatus::Completed,
            "succeeded" => InterviewStatus::Succeeded,
            "failed" => InterviewStatus::Failed,
            _ => InterviewStatus::Other(raw),
        }
    }
}

impl From<InterviewStatus> for String {
    fn from(status: InterviewStatus) -> Self {
        match status {
            InterviewStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AiFeedback {
    #[validate(length(min = 1))]
    pub feedback: String,
    #[validate(range(min = 0.0, max = 10.0, message = "Rating must be between 0 and 10"))]
    pub rating: f64,
    pub suggestions: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInterviewRequest {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub status: Option<InterviewStatus>,
    #[validate(length(min = 1, message = "Call id must not be empty"))]
    pub stream_call_id: String,
    #[validate(length(min = 1, message = "Candidate must be selected"))]
    pub candidate_id: String,
    #[validate(length(min = 1, message = "At least one interviewer is required"))]
    pub interviewer_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInterviewStatusRequest {
    pub status: InterviewStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAiFeedbackRequest {
    #[validate(length(min = 1, message = "Answer must not be empty"))]
    pub student_answer: String,
    #[validate]
    pub ai_feedback: AiFeedback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: InterviewStatus,
    pub stream_call_id: String,
    pub candidate_id: String,
    pub interviewer_ids: Vec<String>,
    pub student_answer: Option<String>,
    pub ai_feedback: Option<AiFeedback>,
    pub created_at: DateTime<Utc>,
}

impl From<Interview> for InterviewResponse {
    fn from(interview: Interview) -> Self {
        Self {
            id: interview.id,
            title: interview.title,
            description: interview.description,
            start_time: interview.start_time,
            end_time: interview.end_time,
            status: interview.status,
            stream_call_id: interview.stream_call_id,
            candidate_id: interview.candidate_id,
            interviewer_ids: interview.interviewer_ids,
            student_answer: interview.student_answer,
            ai_feedback: interview.ai_feedback.map(|feedback| feedback.0),
            created_at: interview.created_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_interview(
    title: &str,
    status: InterviewStatus,
    start_time: DateTime<Utc>,
    candidate_id: &str,
) -> Interview {
    let now = Utc::now();
    Interview {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        start_time,
        end_time: None,
        status,
        stream_call_id: Uuid::new_v4().to_string(),
        candidate_id: candidate_id.to_string(),
        interviewer_ids: vec!["teacher-1".to_string()],
        student_answer: None,
        ai_feedback: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_parse_to_variants() {
        assert_eq!(InterviewStatus::from("upcoming".to_string()), InterviewStatus::Upcoming);
        assert_eq!(InterviewStatus::from("failed".to_string()), InterviewStatus::Failed);
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status = InterviewStatus::from("cancelled".to_string());
        assert_eq!(status, InterviewStatus::Other("cancelled".to_string()));
        assert_eq!(String::from(status), "cancelled");
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&InterviewStatus::Succeeded).unwrap();
        assert_eq!(json, "\"succeeded\"");
        let parsed: InterviewStatus = serde_json::from_str("\"postponed\"").unwrap();
        assert_eq!(parsed.as_str(), "postponed");
    }

    #[test]
    fn feedback_rating_out_of_range_is_rejected() {
        let request = UpdateAiFeedbackRequest {
            student_answer: "I want to study engineering".to_string(),
            ai_feedback: AiFeedback {
                feedback: "Clear answer".to_string(),
                rating: 12.0,
                suggestions: None,
            },
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_request_requires_interviewers() {
        let request = CreateInterviewRequest {
            title: "Admission interview".to_string(),
            description: None,
            start_time: Utc::now(),
            status: None,
            stream_call_id: "call-1".to_string(),
            candidate_id: "student-1".to_string(),
            interviewer_ids: vec![],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("interviewer_ids"));
    }
}
