//! Error types for the campaign domain.

use thiserror::Error;

/// Result type for campaign operations.
pub type CampaignResult<T> = Result<T, CampaignError>;

/// Errors that can occur while setting up or running a campaign.
///
/// Per-recipient send failures are not errors; they are recorded as
/// [`SendOutcome`](crate::models::SendOutcome)s and the run continues.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// The recipient list is empty, there is no campaign to run.
    #[error("No recipients to send to")]
    NoRecipients,

    /// The recipient source could not be read.
    #[error("Recipient source error: {0}")]
    RecipientSource(String),

    /// The sender accounts file is missing or malformed.
    #[error("Sender accounts error: {0}")]
    Accounts(String),

    /// The account pool must hold at least one account.
    #[error("Sender account pool is empty")]
    EmptyAccountPool,

    /// Per-account quota must be positive.
    #[error("Per-account quota must be greater than zero")]
    InvalidQuota,

    /// The checkpoint could not be written.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// The campaign message could not be assembled.
    #[error("Message error: {0}")]
    Message(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for CampaignError {
    fn from(err: csv::Error) -> Self {
        CampaignError::RecipientSource(err.to_string())
    }
}

impl From<serde_json::Error> for CampaignError {
    fn from(err: serde_json::Error) -> Self {
        CampaignError::Accounts(format!("invalid JSON: {}", err))
    }
}
