//! Data models for the campaign domain.

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Sender accounts
// ============================================================================

/// SMTP mailbox credentials used as a sender.
///
/// Deserialized from the accounts file, where entries look like
/// `{"EMAIL_USER": "...", "EMAIL_PASS": "..."}`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SenderAccount {
    /// Mailbox login, also used as the From address.
    #[serde(rename = "EMAIL_USER", alias = "email", alias = "identity")]
    pub identity: String,
    /// Mailbox password or app password.
    #[serde(rename = "EMAIL_PASS", alias = "password", alias = "secret")]
    pub secret: String,
    /// Sends made with this account since it last became current.
    #[serde(skip)]
    pub sends_this_rotation: u32,
}

impl SenderAccount {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
            sends_this_rotation: 0,
        }
    }
}

impl std::fmt::Debug for SenderAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderAccount")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .field("sends_this_rotation", &self.sends_this_rotation)
            .finish()
    }
}

// ============================================================================
// Recipients
// ============================================================================

/// A campaign recipient and its ordinal position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub address: String,
    pub position: usize,
}

impl Recipient {
    pub fn new(address: impl Into<String>, position: usize) -> Self {
        Self {
            address: address.into(),
            position,
        }
    }

    /// Build an ordered recipient list from plain addresses.
    pub fn from_addresses<I, S>(addresses: I) -> Vec<Recipient>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addresses
            .into_iter()
            .enumerate()
            .map(|(position, address)| Recipient::new(address, position))
            .collect()
    }
}

// ============================================================================
// Send results
// ============================================================================

/// Classified failure reported by a mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendFailure {
    /// The provider signalled a sending limit for the current account.
    #[error("rate limited by provider: {detail}")]
    RateLimited { code: Option<u16>, detail: String },

    /// Any other failure; the recipient is skipped for this run.
    #[error("send failed: {detail}")]
    Rejected { code: Option<u16>, detail: String },
}

impl SendFailure {
    pub fn rejected(detail: impl Into<String>) -> Self {
        SendFailure::Rejected {
            code: None,
            detail: detail.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SendFailure::RateLimited { .. })
    }
}

/// What happened to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Sent on the first attempt.
    Sent { sender: String },
    /// First account was rate limited, the retry with the next account succeeded.
    RateLimitedThenSent { limited: String, sender: String },
    /// First account was rate limited and the single retry failed too.
    RateLimitedThenFailed {
        limited: String,
        sender: String,
        failure: SendFailure,
    },
    /// Failed for any reason other than a rate limit.
    Failed { sender: String, failure: SendFailure },
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(
            self,
            SendOutcome::Sent { .. } | SendOutcome::RateLimitedThenSent { .. }
        )
    }

    /// Account that made the last attempt.
    pub fn sender(&self) -> &str {
        match self {
            SendOutcome::Sent { sender }
            | SendOutcome::RateLimitedThenSent { sender, .. }
            | SendOutcome::RateLimitedThenFailed { sender, .. }
            | SendOutcome::Failed { sender, .. } => sender,
        }
    }

    pub fn failure(&self) -> Option<&SendFailure> {
        match self {
            SendOutcome::RateLimitedThenFailed { failure, .. }
            | SendOutcome::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Recipient abandoned for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecipient {
    pub position: usize,
    pub address: String,
    pub failure: SendFailure,
}

/// Result of a campaign run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Checkpoint the run resumed from.
    pub start_index: usize,
    /// Size of the recipient list.
    pub total_recipients: usize,
    /// Recipients processed in this run.
    pub attempted: usize,
    /// Recipients successfully sent to.
    pub sent: u64,
    /// Recipients abandoned for this run.
    pub failed: Vec<FailedRecipient>,
    /// Last checkpoint value saved (or the start index if nothing was saved).
    pub next_index: usize,
    /// `Some(result)` when the activity backend was called.
    pub reported: Option<bool>,
}
