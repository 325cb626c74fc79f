//! Subcommand implementations.

use crate::config::Config;
use core_config::ConfigStore;
use domain_activity::{ActivityReporter, JobTypeDefinition};
use domain_campaign::{
    AccountPool, Checkpoint, CsvRecipientSource, Dispatcher, FileCheckpoint, Recipient,
    RecipientSource, SmtpTransport, load_accounts,
};
use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{error, info, warn};

/// Progress of the campaign as seen from the checkpoint.
#[derive(Debug, Serialize)]
pub struct CampaignStatus {
    pub progress_file: String,
    pub next_index: usize,
    pub total_recipients: usize,
    pub remaining: usize,
}

/// Run the campaign from the checkpoint to the end of the recipient list.
pub async fn send<S>(config: &Config, store: S) -> Result<()>
where
    S: ConfigStore + Send + Sync,
{
    info!("Starting email campaign");

    let recipients = load_recipients(config)?;
    if recipients.is_empty() {
        warn!(path = %config.recipients_file.display(), "No recipients found, nothing to send");
        return Ok(());
    }
    info!(count = recipients.len(), "Loaded recipients");

    let mut reporter = ActivityReporter::new(config.activity.clone(), store);
    if let Err(e) = reporter.ensure_authenticated().await {
        warn!(error = %e, "Activity reporting unavailable, sending continues");
    }

    let accounts_file = config.accounts_file()?;
    let accounts = load_accounts(accounts_file)
        .wrap_err_with(|| format!("Failed to load sender accounts from {}", accounts_file.display()))?;
    let pool = AccountPool::new(accounts, config.max_emails_per_account)?;

    let transport = SmtpTransport::new(config.smtp()?);
    let checkpoint = FileCheckpoint::new(&config.progress_file);
    let mut dispatcher = Dispatcher::new(pool, transport, checkpoint, config.message()?)
        .with_pacing(config.pacing()?)
        .with_campaign_name(config.campaign.name.clone());

    let summary = dispatcher.run(&recipients, &mut reporter).await?;

    for failed in &summary.failed {
        error!(
            position = failed.position,
            to = %failed.address,
            error = %failed.failure,
            "Recipient not sent in this run"
        );
    }
    if summary.reported == Some(false) {
        warn!(sent = summary.sent, "Campaign finished but the activity report was not recorded");
    }

    Ok(())
}

fn load_recipients(config: &Config) -> Result<Vec<Recipient>> {
    let recipients = CsvRecipientSource::new(&config.recipients_file)
        .with_column(config.recipients_column.clone())
        .list_recipients()
        .wrap_err("Failed to load recipients")?;
    Ok(recipients)
}

pub fn status(config: &Config) -> Result<CampaignStatus> {
    let checkpoint = FileCheckpoint::new(&config.progress_file);
    let recipients = load_recipients(config)?;

    let next_index = checkpoint.load();
    Ok(CampaignStatus {
        progress_file: config.progress_file.display().to_string(),
        next_index,
        total_recipients: recipients.len(),
        remaining: recipients.len().saturating_sub(next_index),
    })
}

pub fn reset(config: &Config, index: usize) -> Result<()> {
    let mut checkpoint = FileCheckpoint::new(&config.progress_file);
    let previous = checkpoint.load();
    checkpoint.save(index)?;
    info!(previous, index, path = %config.progress_file.display(), "Checkpoint reset");
    Ok(())
}

/// Log in now and persist the token for later runs.
pub async fn login<S>(config: &Config, store: S) -> Result<()>
where
    S: ConfigStore,
{
    let mut reporter = ActivityReporter::new(config.activity.clone(), store);
    reporter.login().await.wrap_err("Activity API login failed")?;
    Ok(())
}

/// Make sure the configured job type exists, creating it when missing.
pub async fn ensure_job_type<S>(config: &Config, store: S) -> Result<i64>
where
    S: ConfigStore,
{
    let definition = JobTypeDefinition::vendor_email_sender(
        config.activity.job_unique_id.clone(),
        config.activity.employee_id,
    );
    let mut reporter = ActivityReporter::new(config.activity.clone(), store);
    let id = reporter
        .ensure_job_type(&definition)
        .await
        .wrap_err("Failed to ensure job type")?;

    info!(job_type_id = id, job_unique_id = %definition.unique_id, "Job type ready");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::{ConfigSource, FromSource, MemoryStore};

    fn config_in(dir: &std::path::Path) -> Config {
        let recipients = dir.join("vendoremails.csv");
        std::fs::write(&recipients, "Email\na@t.test\nb@t.test\nc@t.test\n").unwrap();

        let store = MemoryStore::new()
            .with("RECIPIENTS_FILE", recipients.to_str().unwrap())
            .with("PROGRESS_FILE", dir.join("last_index.txt").to_str().unwrap());
        Config::from_source(&store).unwrap()
    }

    #[test]
    fn test_status_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let initial = status(&config).unwrap();
        assert_eq!(initial.next_index, 0);
        assert_eq!(initial.total_recipients, 3);
        assert_eq!(initial.remaining, 3);

        reset(&config, 2).unwrap();
        let after = status(&config).unwrap();
        assert_eq!(after.next_index, 2);
        assert_eq!(after.remaining, 1);

        reset(&config, 10).unwrap();
        assert_eq!(status(&config).unwrap().remaining, 0);
    }

    #[tokio::test]
    async fn test_send_with_empty_recipient_list_never_contacts_activity_api() {
        let dir = tempfile::tempdir().unwrap();
        let recipients = dir.path().join("vendoremails.csv");
        std::fs::write(&recipients, "Email\n").unwrap();

        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", "/api/login")
            .with_status(200)
            .with_body(r#"{"access_token":"t"}"#)
            .expect(0)
            .create_async()
            .await;

        let source = MemoryStore::new()
            .with("RECIPIENTS_FILE", recipients.to_str().unwrap())
            .with("PROGRESS_FILE", dir.path().join("last_index.txt").to_str().unwrap())
            .with("ACTIVITY_API_URL", &server.url())
            .with("ACTIVITY_EMAIL", "ops@example.com")
            .with("ACTIVITY_PASSWORD", "secret");
        let config = Config::from_source(&source).unwrap();

        let mut store = MemoryStore::new();
        send(&config, &mut store).await.unwrap();

        login.assert_async().await;
        assert_eq!(store.get("ACTIVITY_API_TOKEN"), None);
        assert!(!dir.path().join("last_index.txt").exists());
    }

    #[tokio::test]
    async fn test_send_without_accounts_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let result = send(&config, MemoryStore::new()).await;
        assert!(result.is_err());
        assert!(!dir.path().join("last_index.txt").exists());
    }
}
