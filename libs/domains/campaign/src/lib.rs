//! Campaign Domain
//!
//! Dispatch engine for a bulk outbound email campaign sent through a rotating
//! pool of sender mailboxes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ RecipientSource  │  ← CSV file, one address per row
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐      ┌──────────────┐
//! │    Dispatcher    │ ───> │ AccountPool  │  ← lease / forced rotation
//! └────────┬─────────┘      └──────────────┘
//!          │
//! ┌────────▼─────────┐
//! │  MailTransport   │  ← SMTP (lettre), classified failures
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │    Checkpoint    │  ← next unprocessed index, saved after each send
//! └────────┬─────────┘
//!          │ (end of run, sent > 0)
//! ┌────────▼─────────┐
//! │   ActivitySink   │  ← activity backend
//! └──────────────────┘
//! ```
//!
//! Sending is strictly sequential: one recipient is fully processed before
//! the next one starts, with a randomized pause between successful sends.

pub mod accounts;
pub mod checkpoint;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod models;
pub mod pacing;
pub mod providers;
pub mod recipients;

pub use accounts::{AccountPool, DEFAULT_QUOTA, load_accounts};
pub use checkpoint::{Checkpoint, FileCheckpoint, InMemoryCheckpoint};
pub use dispatcher::{ActivitySink, DEFAULT_CAMPAIGN_NAME, Dispatcher};
pub use error::{CampaignError, CampaignResult};
pub use message::{Attachment, CampaignMessage, DEFAULT_SUBJECT};
pub use models::{FailedRecipient, Recipient, RunSummary, SendFailure, SendOutcome, SenderAccount};
pub use pacing::SendPacing;
pub use providers::{MailTransport, SmtpConfig, SmtpTransport};
pub use recipients::{CsvRecipientSource, DEFAULT_COLUMN, RecipientSource};
