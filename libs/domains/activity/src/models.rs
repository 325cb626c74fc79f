//! Data models for the activity domain.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One aggregate activity entry, submitted once at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    /// Backend job-type id (resolved from the logical job identifier).
    pub job_id: i64,
    /// Actor the activity is attributed to.
    pub employee_id: i64,
    /// Number of emails sent.
    pub activity_count: u64,
    /// Optional candidate the campaign was run for; `0` is sent as `null`.
    pub candidate_id: Option<i64>,
    /// Free-text notes.
    pub notes: String,
    /// Serialized as ISO-8601 (`YYYY-MM-DD`).
    pub activity_date: NaiveDate,
}

impl ActivityRecord {
    pub fn new(
        job_id: i64,
        employee_id: i64,
        activity_count: u64,
        candidate_id: i64,
        notes: impl Into<String>,
        activity_date: NaiveDate,
    ) -> Self {
        Self {
            job_id,
            employee_id,
            activity_count,
            candidate_id: (candidate_id != 0).then_some(candidate_id),
            notes: notes.into(),
            activity_date,
        }
    }
}

/// Entry of the backend's job-type listing.
#[derive(Debug, Clone, Deserialize)]
pub struct JobType {
    pub id: i64,
    #[serde(default)]
    pub unique_id: Option<String>,
}

/// Definition used to create the job type when it does not exist yet.
#[derive(Debug, Clone, Serialize)]
pub struct JobTypeDefinition {
    pub unique_id: String,
    pub name: String,
    pub job_owner_id: i64,
    pub description: String,
    pub notes: String,
}

impl JobTypeDefinition {
    /// Default definition for the bulk vendor email sender.
    pub fn vendor_email_sender(unique_id: impl Into<String>, job_owner_id: i64) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: "Vendor Email Sender".to_string(),
            job_owner_id,
            description: "Automated mass email sender for vendor outreach".to_string(),
            notes: "Sends bulk emails to vendors and logs activity to the tracking backend"
                .to_string(),
        }
    }
}

/// Backend acknowledgement of a submitted activity record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogged {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedJobType {
    #[serde(default)]
    pub id: Option<i64>,
}
