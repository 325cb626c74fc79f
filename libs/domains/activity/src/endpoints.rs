//! Endpoint resolution for the activity backend.

/// Path segment every backend route lives under.
const API_SEGMENT: &str = "/api";

/// Fully-qualified endpoint URLs derived from a configured base URL.
///
/// The base may or may not already include the `/api` segment
/// (`https://host/api`, `https://host/api/`, `http://localhost:8000`); every
/// form resolves to the same API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    root: String,
}

impl ApiEndpoints {
    pub fn from_base_url(base_url: &str) -> Self {
        let trimmed = base_url.trim().trim_end_matches('/');
        let root = if trimmed.ends_with(API_SEGMENT) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, API_SEGMENT)
        };
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn login(&self) -> String {
        format!("{}/login", self.root)
    }

    pub fn job_types(&self) -> String {
        format!("{}/job-types", self.root)
    }

    pub fn activity_logs(&self) -> String {
        format!("{}/job_activity_logs", self.root)
    }
}
