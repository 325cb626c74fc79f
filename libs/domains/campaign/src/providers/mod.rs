//! Mail transport implementations.
//!
//! The dispatcher only sees [`MailTransport`]; each implementation is
//! responsible for classifying its failures into [`SendFailure`] so that
//! provider-side sending limits can be told apart from everything else.

mod smtp;

pub use smtp::{SmtpConfig, SmtpTransport};

use crate::message::CampaignMessage;
use crate::models::{Recipient, SendFailure, SenderAccount};
use async_trait::async_trait;

/// SMTP reply code providers use for "daily sending limit exceeded".
pub const RATE_LIMIT_CODE: u16 = 550;

const RATE_LIMIT_MARKERS: [&str; 3] = ["limit exceeded", "rate limit", "too many messages"];

/// Delivers one campaign message to one recipient as one sender account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        account: &SenderAccount,
        recipient: &Recipient,
        message: &CampaignMessage,
    ) -> Result<(), SendFailure>;
}

/// Classify a provider reply into a rate limit or a plain rejection.
pub fn classify_failure(code: Option<u16>, detail: &str) -> SendFailure {
    let lowered = detail.to_lowercase();
    let limited = code == Some(RATE_LIMIT_CODE)
        || RATE_LIMIT_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker));

    if limited {
        SendFailure::RateLimited {
            code,
            detail: detail.to_string(),
        }
    } else {
        SendFailure::Rejected {
            code,
            detail: detail.to_string(),
        }
    }
}
