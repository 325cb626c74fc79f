//! Configuration for the campaign sender

use core_config::{
    ConfigError, ConfigSource, Environment, FromSource, value_optional, value_or_default,
    value_parsed,
};
use domain_activity::{DEFAULT_API_URL, DEFAULT_JOB_UNIQUE_ID, ReporterConfig};
use domain_campaign::{
    Attachment, CampaignMessage, DEFAULT_CAMPAIGN_NAME, DEFAULT_COLUMN, DEFAULT_QUOTA,
    DEFAULT_SUBJECT, SendPacing, SmtpConfig,
};
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Directory for per-run log files
    pub log_dir: PathBuf,
    pub accounts_file: Option<PathBuf>,
    pub smtp: SmtpSettings,
    pub recipients_file: PathBuf,
    pub recipients_column: String,
    pub progress_file: PathBuf,
    pub max_emails_per_account: u32,
    pub send_delay_min_secs: u64,
    pub send_delay_max_secs: u64,
    pub campaign: CampaignSettings,
    pub activity: ReporterConfig,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CampaignSettings {
    pub name: String,
    pub subject: String,
    /// Plain-text body; the built-in body is used when unset
    pub body_file: Option<PathBuf>,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub attachment: Option<PathBuf>,
}

impl FromSource for Config {
    fn from_source(source: &impl ConfigSource) -> Result<Self, ConfigError> {
        let mut activity = ReporterConfig::new(value_or_default(source, "ACTIVITY_API_URL", DEFAULT_API_URL))
            .with_job_unique_id(value_or_default(source, "ACTIVITY_JOB_UNIQUE_ID", DEFAULT_JOB_UNIQUE_ID))
            .with_employee_id(value_parsed(source, "ACTIVITY_EMPLOYEE_ID", 411)?)
            .with_candidate_id(value_parsed(source, "ACTIVITY_CANDIDATE_ID", 570)?);
        if let Some(token) = value_optional(source, "ACTIVITY_API_TOKEN") {
            activity = activity.with_token(token);
        }
        if let (Some(email), Some(password)) = (
            value_optional(source, "ACTIVITY_EMAIL"),
            value_optional(source, "ACTIVITY_PASSWORD"),
        ) {
            activity = activity.with_credentials(email, password);
        }

        Ok(Config {
            environment: Environment::from_source(source),
            log_dir: PathBuf::from(value_or_default(source, "CAMPAIGN_LOG_DIR", "logs")),
            accounts_file: value_optional(source, "EMAIL_ACCOUNTS_FILE").map(PathBuf::from),
            smtp: SmtpSettings {
                server: value_optional(source, "SMTP_SERVER"),
                port: value_parsed(source, "SMTP_PORT", 587)?,
                timeout_secs: value_parsed(source, "SMTP_TIMEOUT_SECS", 60)?,
            },
            recipients_file: PathBuf::from(value_or_default(
                source,
                "RECIPIENTS_FILE",
                "vendoremails.csv",
            )),
            recipients_column: value_or_default(source, "RECIPIENTS_COLUMN", DEFAULT_COLUMN),
            progress_file: PathBuf::from(value_or_default(source, "PROGRESS_FILE", "last_index.txt")),
            max_emails_per_account: value_parsed(source, "MAX_EMAILS_PER_ACCOUNT", DEFAULT_QUOTA)?,
            send_delay_min_secs: value_parsed(source, "SEND_DELAY_MIN_SECS", 5)?,
            send_delay_max_secs: value_parsed(source, "SEND_DELAY_MAX_SECS", 15)?,
            campaign: CampaignSettings {
                name: value_or_default(source, "CAMPAIGN_NAME", DEFAULT_CAMPAIGN_NAME),
                subject: value_or_default(source, "CAMPAIGN_SUBJECT", DEFAULT_SUBJECT),
                body_file: value_optional(source, "CAMPAIGN_BODY_FILE").map(PathBuf::from),
                from_name: value_optional(source, "CAMPAIGN_FROM_NAME"),
                reply_to: value_optional(source, "REPLY_TO_EMAIL"),
                attachment: value_optional(source, "CAMPAIGN_ATTACHMENT").map(PathBuf::from),
            },
            activity,
        })
    }
}

impl Config {
    pub fn accounts_file(&self) -> Result<&Path, ConfigError> {
        self.accounts_file
            .as_deref()
            .ok_or_else(|| ConfigError::MissingKey("EMAIL_ACCOUNTS_FILE".to_string()))
    }

    pub fn smtp(&self) -> Result<SmtpConfig, ConfigError> {
        let server = self
            .smtp
            .server
            .clone()
            .ok_or_else(|| ConfigError::MissingKey("SMTP_SERVER".to_string()))?;

        Ok(SmtpConfig::new(server)
            .with_port(self.smtp.port)
            .with_timeout(Duration::from_secs(self.smtp.timeout_secs)))
    }

    pub fn pacing(&self) -> Result<SendPacing> {
        Ok(SendPacing::new(
            Duration::from_secs(self.send_delay_min_secs),
            Duration::from_secs(self.send_delay_max_secs),
        )?)
    }

    /// Assemble the message sent to every recipient.
    pub fn message(&self) -> Result<CampaignMessage> {
        let campaign = &self.campaign;
        let attachment = match &campaign.attachment {
            Some(path) => Attachment::load(path).wrap_err("Failed to load campaign attachment")?,
            None => None,
        };

        let message = CampaignMessage::load(campaign.subject.clone(), campaign.body_file.as_deref())
            .wrap_err("Failed to load campaign body")?
            .with_from_name(campaign.from_name.clone())
            .with_reply_to(campaign.reply_to.clone())
            .with_attachment(attachment);

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::MemoryStore;

    #[test]
    fn test_defaults() {
        let config = Config::from_source(&MemoryStore::new()).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.recipients_file, PathBuf::from("vendoremails.csv"));
        assert_eq!(config.recipients_column, "Email");
        assert_eq!(config.progress_file, PathBuf::from("last_index.txt"));
        assert_eq!(config.max_emails_per_account, 100);
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.campaign.name, "Vendor email campaign");
        assert_eq!(config.activity.api_url, "https://whitebox-learning.com/api");
        assert_eq!(config.activity.employee_id, 411);
        assert_eq!(config.activity.candidate_id, 570);
        assert!(config.activity.api_token.is_none());
        assert!(!config.activity.has_credentials());
    }

    #[test]
    fn test_send_keys_are_required_on_use() {
        let config = Config::from_source(&MemoryStore::new()).unwrap();
        assert!(matches!(config.smtp(), Err(ConfigError::MissingKey(key)) if key == "SMTP_SERVER"));
        assert!(matches!(
            config.accounts_file(),
            Err(ConfigError::MissingKey(key)) if key == "EMAIL_ACCOUNTS_FILE"
        ));
    }

    #[test]
    fn test_values_from_source() {
        let store = MemoryStore::new()
            .with("APP_ENV", "production")
            .with("SMTP_SERVER", "smtp.gmail.com")
            .with("SMTP_PORT", "2525")
            .with("MAX_EMAILS_PER_ACCOUNT", "40")
            .with("ACTIVITY_API_TOKEN", "tok")
            .with("ACTIVITY_EMAIL", "ops@example.com")
            .with("ACTIVITY_PASSWORD", "secret")
            .with("ACTIVITY_CANDIDATE_ID", "0")
            .with("REPLY_TO_EMAIL", "replies@example.com");

        let config = Config::from_source(&store).unwrap();

        assert!(config.environment.is_production());
        let smtp = config.smtp().unwrap();
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(config.max_emails_per_account, 40);
        assert_eq!(config.activity.api_token.as_deref(), Some("tok"));
        assert!(config.activity.has_credentials());
        assert_eq!(config.activity.candidate_id, 0);
        assert_eq!(config.campaign.reply_to.as_deref(), Some("replies@example.com"));
    }

    #[test]
    fn test_invalid_number_is_a_parse_error() {
        let store = MemoryStore::new().with("SMTP_PORT", "smtp");
        let err = Config::from_source(&store).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { key, .. } if key == "SMTP_PORT"));
    }

    #[test]
    fn test_inverted_delay_range_is_rejected() {
        let store = MemoryStore::new()
            .with("SEND_DELAY_MIN_SECS", "20")
            .with("SEND_DELAY_MAX_SECS", "10");
        let config = Config::from_source(&store).unwrap();
        assert!(config.pacing().is_err());
    }

    #[test]
    fn test_message_with_missing_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let body = dir.path().join("body.txt");
        std::fs::write(&body, "Hello vendor").unwrap();

        let store = MemoryStore::new()
            .with("CAMPAIGN_SUBJECT", "AI Engineer | USC")
            .with("CAMPAIGN_BODY_FILE", body.to_str().unwrap())
            .with("CAMPAIGN_FROM_NAME", "Recruiting Team")
            .with("CAMPAIGN_ATTACHMENT", dir.path().join("resume.pdf").to_str().unwrap());

        let message = Config::from_source(&store).unwrap().message().unwrap();
        assert_eq!(message.subject, "AI Engineer | USC");
        assert_eq!(message.text_body, "Hello vendor");
        assert_eq!(message.from_name.as_deref(), Some("Recruiting Team"));
        assert!(message.attachment.is_none());
    }
}
