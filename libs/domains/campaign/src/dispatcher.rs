//! Campaign dispatcher.
//!
//! Walks the recipient list from the checkpoint onward. Per recipient:
//!
//! ```text
//! lease ──> send ──ok──────────────────────────────> Sent
//!             │
//!             ├─rate limited──> force_rotate ──> lease ──> send ──ok──> RateLimitedThenSent
//!             │                                              └─err──> RateLimitedThenFailed
//!             └─other failure──────────────────────────────────────> Failed
//! ```
//!
//! Only sent recipients advance the checkpoint. A failed recipient does not
//! write it, but the next success saves past it, so failures are not retried
//! on resume; they are listed in the [`RunSummary`] instead.

use crate::accounts::AccountPool;
use crate::checkpoint::Checkpoint;
use crate::error::{CampaignError, CampaignResult};
use crate::message::CampaignMessage;
use crate::models::{FailedRecipient, Recipient, RunSummary, SendFailure, SendOutcome};
use crate::pacing::SendPacing;
use crate::providers::MailTransport;
use async_trait::async_trait;
use core_config::ConfigStore;
use domain_activity::ActivityReporter;
use tracing::{error, info, warn};

/// Default campaign label used in activity notes.
pub const DEFAULT_CAMPAIGN_NAME: &str = "Vendor email campaign";

/// Receives the end-of-run activity report.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivitySink: Send {
    /// Report `count` sent emails; `true` when the backend accepted it.
    async fn report_sent(&mut self, count: u64, notes: &str) -> bool;
}

#[async_trait]
impl<S> ActivitySink for ActivityReporter<S>
where
    S: ConfigStore + Send + Sync,
{
    async fn report_sent(&mut self, count: u64, notes: &str) -> bool {
        self.report(count, notes).await
    }
}

/// Sequential campaign sender.
pub struct Dispatcher<T, C> {
    pool: AccountPool,
    transport: T,
    checkpoint: C,
    message: CampaignMessage,
    pacing: SendPacing,
    campaign_name: String,
}

impl<T, C> Dispatcher<T, C>
where
    T: MailTransport,
    C: Checkpoint,
{
    pub fn new(pool: AccountPool, transport: T, checkpoint: C, message: CampaignMessage) -> Self {
        Self {
            pool,
            transport,
            checkpoint,
            message,
            pacing: SendPacing::default(),
            campaign_name: DEFAULT_CAMPAIGN_NAME.to_string(),
        }
    }

    pub fn with_pacing(mut self, pacing: SendPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_campaign_name(mut self, campaign_name: impl Into<String>) -> Self {
        self.campaign_name = campaign_name.into();
        self
    }

    pub fn pool(&self) -> &AccountPool {
        &self.pool
    }

    pub fn checkpoint(&self) -> &C {
        &self.checkpoint
    }

    /// Notes attached to the activity record.
    pub fn activity_notes(&self, sent: u64) -> String {
        format!("{} completed. Sent {} emails.", self.campaign_name, sent)
    }

    /// Process one recipient, retrying once with the next account on a rate limit.
    pub async fn dispatch(&mut self, recipient: &Recipient) -> SendOutcome {
        let account = self.pool.lease();
        let failure = match self.transport.send(&account, recipient, &self.message).await {
            Ok(()) => {
                return SendOutcome::Sent {
                    sender: account.identity,
                };
            }
            Err(failure) => failure,
        };

        if !failure.is_rate_limited() {
            warn!(
                to = %recipient.address,
                from = %account.identity,
                error = %failure,
                "Failed to send email"
            );
            return SendOutcome::Failed {
                sender: account.identity,
                failure,
            };
        }

        warn!(
            from = %account.identity,
            error = %failure,
            "Limit reached for account, switching account"
        );
        self.pool.force_rotate();
        let retry = self.pool.lease();

        match self.transport.send(&retry, recipient, &self.message).await {
            Ok(()) => SendOutcome::RateLimitedThenSent {
                limited: account.identity,
                sender: retry.identity,
            },
            Err(failure) => {
                warn!(
                    to = %recipient.address,
                    from = %retry.identity,
                    error = %failure,
                    "Retry after account switch failed"
                );
                SendOutcome::RateLimitedThenFailed {
                    limited: account.identity,
                    sender: retry.identity,
                    failure,
                }
            }
        }
    }

    /// Send to every recipient from the checkpoint onward, then report activity.
    pub async fn run<A>(&mut self, recipients: &[Recipient], activity: &mut A) -> CampaignResult<RunSummary>
    where
        A: ActivitySink + ?Sized,
    {
        if recipients.is_empty() {
            warn!("Recipient list is empty, nothing to send");
            return Err(CampaignError::NoRecipients);
        }

        let start_index = self.checkpoint.load();
        let total = recipients.len();
        if start_index > 0 {
            info!(start_index, total, "Resuming from checkpoint");
        }
        if start_index >= total {
            warn!(start_index, total, "Checkpoint is past the end of the recipient list");
        }

        let mut summary = RunSummary {
            start_index,
            total_recipients: total,
            next_index: start_index,
            ..RunSummary::default()
        };

        for (index, recipient) in recipients.iter().enumerate().skip(start_index) {
            summary.attempted += 1;
            let outcome = self.dispatch(recipient).await;

            if !outcome.is_sent() {
                let failure = outcome
                    .failure()
                    .cloned()
                    .unwrap_or_else(|| SendFailure::rejected("unknown failure"));
                summary.failed.push(FailedRecipient {
                    position: recipient.position,
                    address: recipient.address.clone(),
                    failure,
                });
                continue;
            }

            summary.sent += 1;
            info!(
                to = %recipient.address,
                from = %outcome.sender(),
                index,
                "Sent email"
            );

            match self.checkpoint.save(index + 1) {
                Ok(()) => summary.next_index = index + 1,
                Err(e) => error!(error = %e, index = index + 1, "Failed to save checkpoint"),
            }

            if index + 1 < total {
                let delay = self.pacing.next_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        info!(
            "Campaign completed: {} successful sends out of {} attempts",
            summary.sent, summary.attempted
        );

        if summary.sent > 0 {
            let notes = self.activity_notes(summary.sent);
            summary.reported = Some(activity.report_sent(summary.sent, &notes).await);
        } else {
            info!("No emails sent, skipping activity report");
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpoint;
    use crate::models::SenderAccount;
    use crate::providers::{MockMailTransport, classify_failure};
    use mockall::predicate::*;

    fn pool(identities: &[&str], quota: u32) -> AccountPool {
        let accounts = identities
            .iter()
            .map(|identity| SenderAccount::new(*identity, "pw"))
            .collect();
        AccountPool::new(accounts, quota).unwrap()
    }

    fn dispatcher(
        transport: MockMailTransport,
        pool: AccountPool,
        start: usize,
    ) -> Dispatcher<MockMailTransport, InMemoryCheckpoint> {
        Dispatcher::new(
            pool,
            transport,
            InMemoryCheckpoint::new(start),
            CampaignMessage::new("Subject", "Body"),
        )
        .with_pacing(SendPacing::none())
    }

    fn rate_limited() -> SendFailure {
        classify_failure(Some(550), "Daily user sending limit exceeded")
    }

    #[tokio::test]
    async fn test_sends_everything_and_reports_once() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|account, _, _| account.identity == "a@example.com")
            .times(3)
            .returning(|_, _, _| Ok(()));

        let mut activity = MockActivitySink::new();
        activity
            .expect_report_sent()
            .with(eq(3u64), eq("Vendor email campaign completed. Sent 3 emails."))
            .times(1)
            .returning(|_, _| true);

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com", "b@example.com"], 100), 0);
        let recipients = Recipient::from_addresses(["x@t.test", "y@t.test", "z@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();

        assert_eq!(summary.sent, 3);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.next_index, 3);
        assert_eq!(summary.reported, Some(true));
        assert!(summary.failed.is_empty());
        assert_eq!(dispatcher.checkpoint().saves(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rate_limit_rotates_and_retries_with_next_account() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|account, recipient, _| {
                account.identity == "a@example.com" && recipient.address == "x@t.test"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        transport
            .expect_send()
            .withf(|account, recipient, _| {
                account.identity == "a@example.com" && recipient.address == "y@t.test"
            })
            .times(1)
            .returning(|_, _, _| Err(rate_limited()));
        transport
            .expect_send()
            .withf(|account, recipient, _| {
                account.identity == "b@example.com" && recipient.address == "y@t.test"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut activity = MockActivitySink::new();
        activity
            .expect_report_sent()
            .with(eq(2u64), always())
            .times(1)
            .returning(|_, _| true);

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com", "b@example.com"], 100), 0);
        let recipients = Recipient::from_addresses(["x@t.test", "y@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(dispatcher.pool().current().identity, "b@example.com");
        assert_eq!(dispatcher.pool().current().sends_this_rotation, 1);
        assert_eq!(dispatcher.checkpoint().load(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_outcome_names_both_accounts() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|account, _, _| account.identity == "a@example.com")
            .times(1)
            .returning(|_, _, _| Err(rate_limited()));
        transport
            .expect_send()
            .withf(|account, _, _| account.identity == "b@example.com")
            .times(1)
            .returning(|_, _, _| Err(SendFailure::rejected("mailbox unavailable")));

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com", "b@example.com"], 100), 0);
        let outcome = dispatcher.dispatch(&Recipient::new("y@t.test", 0)).await;

        assert_eq!(
            outcome,
            SendOutcome::RateLimitedThenFailed {
                limited: "a@example.com".into(),
                sender: "b@example.com".into(),
                failure: SendFailure::rejected("mailbox unavailable"),
            }
        );
    }

    #[tokio::test]
    async fn test_other_failure_skips_recipient_without_rotation() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|_, recipient, _| recipient.address == "bad@t.test")
            .times(1)
            .returning(|_, _, _| Err(SendFailure::rejected("550 5.1.1 user unknown")));
        transport
            .expect_send()
            .withf(|account, recipient, _| {
                account.identity == "a@example.com" && recipient.address != "bad@t.test"
            })
            .times(2)
            .returning(|_, _, _| Ok(()));

        let mut activity = MockActivitySink::new();
        activity
            .expect_report_sent()
            .with(eq(2u64), always())
            .times(1)
            .returning(|_, _| false);

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com", "b@example.com"], 100), 0);
        let recipients = Recipient::from_addresses(["x@t.test", "bad@t.test", "z@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].position, 1);
        assert_eq!(summary.failed[0].address, "bad@t.test");
        assert_eq!(summary.reported, Some(false));
        // failed recipient is saved past by the next success
        assert_eq!(dispatcher.checkpoint().saves(), &[1, 3]);
        assert_eq!(dispatcher.pool().current_index(), 0);
    }

    #[tokio::test]
    async fn test_resumes_from_checkpoint() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|_, recipient, _| recipient.position >= 2)
            .times(2)
            .returning(|_, _, _| Ok(()));

        let mut activity = MockActivitySink::new();
        activity
            .expect_report_sent()
            .with(eq(2u64), always())
            .times(1)
            .returning(|_, _| true);

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com"], 100), 2);
        let recipients = Recipient::from_addresses(["w@t.test", "x@t.test", "y@t.test", "z@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();

        assert_eq!(summary.start_index, 2);
        assert_eq!(summary.attempted, 2);
        assert_eq!(dispatcher.checkpoint().saves(), &[3, 4]);
    }

    #[tokio::test]
    async fn test_empty_list_sends_nothing_and_reports_nothing() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().never();
        let mut activity = MockActivitySink::new();
        activity.expect_report_sent().never();

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com"], 100), 0);
        let err = dispatcher.run(&[], &mut activity).await.unwrap_err();

        assert!(matches!(err, CampaignError::NoRecipients));
        assert!(dispatcher.checkpoint().saves().is_empty());
    }

    #[tokio::test]
    async fn test_no_successes_means_no_report() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(2)
            .returning(|_, _, _| Err(SendFailure::rejected("connection refused")));
        let mut activity = MockActivitySink::new();
        activity.expect_report_sent().never();

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com"], 100), 0);
        let recipients = Recipient::from_addresses(["x@t.test", "y@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();

        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.reported, None);
        assert_eq!(summary.next_index, 0);
        assert!(dispatcher.checkpoint().saves().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_past_end_sends_nothing() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().never();
        let mut activity = MockActivitySink::new();
        activity.expect_report_sent().never();

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com"], 100), 5);
        let recipients = Recipient::from_addresses(["x@t.test", "y@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.next_index, 5);
    }

    #[tokio::test]
    async fn test_quota_rotation_during_run() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|account, recipient, _| {
                let expected = if recipient.position < 2 { "a@example.com" } else { "b@example.com" };
                account.identity == expected
            })
            .times(3)
            .returning(|_, _, _| Ok(()));
        let mut activity = MockActivitySink::new();
        activity.expect_report_sent().times(1).returning(|_, _| true);

        let mut dispatcher = dispatcher(transport, pool(&["a@example.com", "b@example.com"], 2), 0);
        let recipients = Recipient::from_addresses(["x@t.test", "y@t.test", "z@t.test"]);

        let summary = dispatcher.run(&recipients, &mut activity).await.unwrap();
        assert_eq!(summary.sent, 3);
        assert_eq!(dispatcher.pool().current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_between_sends_but_not_after_last() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(2).returning(|_, _, _| Ok(()));
        let mut activity = MockActivitySink::new();
        activity.expect_report_sent().returning(|_, _| true);

        let pacing = SendPacing::new(
            std::time::Duration::from_secs(5),
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let mut dispatcher =
            dispatcher(transport, pool(&["a@example.com"], 100), 0).with_pacing(pacing);
        let recipients = Recipient::from_addresses(["x@t.test", "y@t.test"]);

        let started = tokio::time::Instant::now();
        dispatcher.run(&recipients, &mut activity).await.unwrap();

        assert_eq!(started.elapsed(), std::time::Duration::from_secs(5));
    }
}
