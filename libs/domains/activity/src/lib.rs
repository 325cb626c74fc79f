//! Activity Domain
//!
//! Client for the activity-tracking backend that receives aggregate
//! "emails sent" counts at the end of a campaign run.
//!
//! # Protocol
//!
//! ```text
//! POST {api}/login               form: username, password   -> { access_token }
//! GET  {api}/job-types           Bearer                     -> [{ id, unique_id, ... }]
//! POST {api}/job-types           Bearer, JSON definition    -> { id, ... }
//! POST {api}/job_activity_logs   Bearer, JSON record        -> { id, ... }
//! ```
//!
//! Every authenticated request that is rejected with 401 triggers exactly one
//! re-login followed by exactly one retry of the same request.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_activity::{ActivityReporter, ReporterConfig};
//!
//! let config = ReporterConfig::new("https://tracker.example.com")
//!     .with_credentials("ops@example.com".into(), "secret".into());
//! let mut reporter = ActivityReporter::new(config, env_file);
//!
//! if !reporter.report(42, "Vendor email campaign completed. Sent 42 emails.").await {
//!     // already logged; sending is not affected
//! }
//! ```

pub mod endpoints;
pub mod error;
pub mod models;
pub mod reporter;

pub use endpoints::ApiEndpoints;
pub use error::{ActivityError, ActivityResult};
pub use models::{ActivityLogged, ActivityRecord, JobType, JobTypeDefinition};
pub use reporter::{ActivityReporter, ReporterConfig, DEFAULT_API_URL, DEFAULT_JOB_UNIQUE_ID, TOKEN_KEY};
