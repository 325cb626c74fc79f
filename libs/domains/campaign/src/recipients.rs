//! Recipient sources.

use crate::error::{CampaignError, CampaignResult};
use crate::models::Recipient;
use std::path::PathBuf;
use tracing::{debug, info};

/// Column holding addresses in the default recipients file.
pub const DEFAULT_COLUMN: &str = "Email";

/// Ordered list of addresses a campaign is sent to.
pub trait RecipientSource {
    fn list_recipients(&self) -> CampaignResult<Vec<Recipient>>;
}

/// Recipients read from one column of a CSV file with a header row.
///
/// Blank cells are skipped; positions are assigned after skipping so they
/// stay dense and line up with checkpoint indices.
#[derive(Debug, Clone)]
pub struct CsvRecipientSource {
    path: PathBuf,
    column: String,
}

impl CsvRecipientSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            column: DEFAULT_COLUMN.to_string(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

impl RecipientSource for CsvRecipientSource {
    fn list_recipients(&self) -> CampaignResult<Vec<Recipient>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| {
                CampaignError::RecipientSource(format!("cannot open {}: {}", self.path.display(), e))
            })?;

        let column = reader
            .headers()?
            .iter()
            .position(|header| header.eq_ignore_ascii_case(&self.column))
            .ok_or_else(|| {
                CampaignError::RecipientSource(format!(
                    "column '{}' not found in {}",
                    self.column,
                    self.path.display()
                ))
            })?;

        let mut recipients = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            match record.get(column) {
                Some(address) if !address.is_empty() => {
                    let position = recipients.len();
                    recipients.push(Recipient::new(address, position));
                }
                _ => debug!(row = row + 1, "Skipping row without an address"),
            }
        }

        info!(count = recipients.len(), path = %self.path.display(), "Loaded recipients");
        Ok(recipients)
    }
}
