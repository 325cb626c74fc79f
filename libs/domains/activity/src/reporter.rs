//! Authenticated activity reporter.
//!
//! Holds the bearer-token session for the process, resolves the job type and
//! submits activity records. A 401 on the first attempt of any request causes
//! exactly one re-login and one retry; anything else is terminal for the call.

use crate::endpoints::ApiEndpoints;
use crate::error::{ActivityError, ActivityResult};
use crate::models::{
    ActivityLogged, ActivityRecord, CreatedJobType, JobType, JobTypeDefinition, LoginResponse,
};
use chrono::{Local, NaiveDate};
use core_config::ConfigStore;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, error, info, warn};

/// Production backend.
pub const DEFAULT_API_URL: &str = "https://whitebox-learning.com/api";

/// Logical identifier of the bulk email sender job type.
pub const DEFAULT_JOB_UNIQUE_ID: &str = "vendors_mass_email_sender";

/// Configuration key the bearer token is persisted under.
pub const TOKEN_KEY: &str = "ACTIVITY_API_TOKEN";

/// Activity backend configuration.
#[derive(Clone)]
pub struct ReporterConfig {
    /// Base URL, with or without the `/api` segment.
    pub api_url: String,
    /// Token from a previous run, if any.
    pub api_token: Option<String>,
    /// Login email.
    pub email: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Logical job identifier resolved against `/job-types`.
    pub job_unique_id: String,
    /// Actor the activity is attributed to.
    pub employee_id: i64,
    /// Candidate attached to every record; `0` means none.
    pub candidate_id: i64,
}

impl ReporterConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_token: None,
            email: None,
            password: None,
            job_unique_id: DEFAULT_JOB_UNIQUE_ID.to_string(),
            employee_id: 411,
            candidate_id: 570,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.api_token = Some(token).filter(|t| !t.is_empty());
        self
    }

    pub fn with_credentials(mut self, email: String, password: String) -> Self {
        self.email = Some(email);
        self.password = Some(password);
        self
    }

    pub fn with_job_unique_id(mut self, job_unique_id: String) -> Self {
        self.job_unique_id = job_unique_id;
        self
    }

    pub fn with_employee_id(mut self, employee_id: i64) -> Self {
        self.employee_id = employee_id;
        self
    }

    pub fn with_candidate_id(mut self, candidate_id: i64) -> Self {
        self.candidate_id = candidate_id;
        self
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }
}

impl std::fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("job_unique_id", &self.job_unique_id)
            .field("employee_id", &self.employee_id)
            .field("candidate_id", &self.candidate_id)
            .finish()
    }
}

/// Client for the activity backend.
///
/// The store receives the token after every successful login so later
/// processes can reuse it without logging in again.
pub struct ActivityReporter<S: ConfigStore> {
    client: Client,
    config: ReporterConfig,
    endpoints: ApiEndpoints,
    token: Option<String>,
    disabled: bool,
    job_type_id: Option<i64>,
    store: S,
}

impl<S: ConfigStore> ActivityReporter<S> {
    pub fn new(config: ReporterConfig, store: S) -> Self {
        Self::with_client(Client::new(), config, store)
    }

    pub fn with_client(client: Client, config: ReporterConfig, store: S) -> Self {
        let endpoints = ApiEndpoints::from_base_url(&config.api_url);
        let token = config.api_token.clone();
        Self {
            client,
            config,
            endpoints,
            token,
            disabled: false,
            job_type_id: None,
            store,
        }
    }

    /// Whether a bearer token is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Make sure a token is held, logging in when there is none.
    ///
    /// Without a token and without credentials the reporter disables itself
    /// for the rest of the process.
    pub async fn ensure_authenticated(&mut self) -> ActivityResult<String> {
        if self.disabled {
            return Err(Self::disabled_error());
        }
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        if !self.config.has_credentials() {
            warn!(
                "No activity API token and no login credentials configured, activity reporting disabled"
            );
            self.disabled = true;
            return Err(Self::disabled_error());
        }

        self.login().await
    }

    fn disabled_error() -> ActivityError {
        ActivityError::Disabled("no API token and no login credentials configured".to_string())
    }

    /// Perform the login exchange and replace the held token.
    pub async fn login(&mut self) -> ActivityResult<String> {
        let (email, password) = self.config.credentials().ok_or_else(|| {
            ActivityError::Config(
                "cannot log in: activity email/password not configured".to_string(),
            )
        })?;

        info!(url = %self.endpoints.login(), "Logging in to activity API");

        let response = self
            .client
            .post(self.endpoints.login())
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ActivityError::AuthenticationFailed(format!(
                "login returned {}: {}",
                status, body
            )));
        }

        let login: LoginResponse = response.json().await?;
        let token = login
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ActivityError::AuthenticationFailed("no access_token in login response".to_string())
            })?;

        self.token = Some(token.clone());
        match self.store.set(TOKEN_KEY, &token) {
            Ok(()) => info!("Activity API token obtained and saved"),
            Err(e) => warn!(error = %e, "Activity API token obtained but could not be saved"),
        }

        Ok(token)
    }

    /// Send a request built by `build`, re-authenticating once on 401.
    async fn send_authorized<F>(&mut self, build: F) -> ActivityResult<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = self.ensure_authenticated().await?;
        let response = build(&self.client, &token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_status(response).await;
        }

        warn!("Activity API rejected the bearer token, re-authenticating");
        let token = self.login().await?;
        let response = build(&self.client, &token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ActivityError::Unauthorized);
        }

        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> ActivityResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ActivityError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Resolve a logical job identifier to the backend's numeric id.
    pub async fn resolve_job_type_id(&mut self, logical_id: &str) -> ActivityResult<i64> {
        if logical_id == self.config.job_unique_id {
            if let Some(id) = self.job_type_id {
                return Ok(id);
            }
        }

        let url = self.endpoints.job_types();
        let response = self
            .send_authorized(|client, token| client.get(&url).bearer_auth(token))
            .await?;
        let job_types: Vec<JobType> = response.json().await?;

        let id = job_types
            .iter()
            .find(|job_type| job_type.unique_id.as_deref() == Some(logical_id))
            .map(|job_type| job_type.id)
            .ok_or_else(|| ActivityError::JobTypeNotFound(logical_id.to_string()))?;

        debug!(job_unique_id = %logical_id, job_type_id = id, "Resolved job type");
        if logical_id == self.config.job_unique_id {
            self.job_type_id = Some(id);
        }
        Ok(id)
    }

    /// Resolve the job type, creating it from `definition` when it is missing.
    pub async fn ensure_job_type(&mut self, definition: &JobTypeDefinition) -> ActivityResult<i64> {
        match self.resolve_job_type_id(&definition.unique_id).await {
            Ok(id) => {
                info!(job_type_id = id, "Job type already exists");
                return Ok(id);
            }
            Err(ActivityError::JobTypeNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        info!(job_unique_id = %definition.unique_id, "Creating missing job type");
        let url = self.endpoints.job_types();
        let response = self
            .send_authorized(|client, token| client.post(&url).bearer_auth(token).json(definition))
            .await?;
        let created: CreatedJobType = response.json().await?;

        match created.id {
            Some(id) => {
                if definition.unique_id == self.config.job_unique_id {
                    self.job_type_id = Some(id);
                }
                Ok(id)
            }
            None => self.resolve_job_type_id(&definition.unique_id).await,
        }
    }

    /// Build and submit an activity record for `activity_date`.
    pub async fn submit(
        &mut self,
        count: u64,
        notes: &str,
        activity_date: NaiveDate,
    ) -> ActivityResult<ActivityLogged> {
        let job_unique_id = self.config.job_unique_id.clone();
        let job_id = self.resolve_job_type_id(&job_unique_id).await?;

        let record = ActivityRecord::new(
            job_id,
            self.config.employee_id,
            count,
            self.config.candidate_id,
            notes,
            activity_date,
        );

        let url = self.endpoints.activity_logs();
        let response = self
            .send_authorized(|client, token| client.post(&url).bearer_auth(token).json(&record))
            .await?;

        // the status is what counts; an empty or unexpected body is still a success
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// Report `count` sent emails for today.
    ///
    /// Never fails past this boundary: every error is logged and turned into `false`.
    pub async fn report(&mut self, count: u64, notes: &str) -> bool {
        let today = Local::now().date_naive();
        match self.submit(count, notes, today).await {
            Ok(logged) => {
                info!(
                    activity_count = count,
                    activity_id = ?logged.id,
                    "Activity logged"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to log activity");
                if let ActivityError::Api { body, .. } = &e {
                    match serde_json::from_str::<serde_json::Value>(body) {
                        Ok(details) => error!(details = %details, "Activity API error details"),
                        Err(_) => error!(response = %body, "Activity API response"),
                    }
                }
                false
            }
        }
    }
}
