//! Sender account rotation.

use crate::error::{CampaignError, CampaignResult};
use crate::models::SenderAccount;
use std::path::Path;
use tracing::info;

/// Sends per account before a quota rotation.
pub const DEFAULT_QUOTA: u32 = 100;

/// Ordered pool of sender accounts with a cursor on the current one.
///
/// Two independent triggers move the cursor: the local per-account quota
/// (checked on [`lease`](Self::lease)) and a provider-side limit signalled by
/// the transport ([`force_rotate`](Self::force_rotate)).
#[derive(Debug, Clone)]
pub struct AccountPool {
    accounts: Vec<SenderAccount>,
    current: usize,
    quota: u32,
}

impl AccountPool {
    pub fn new(accounts: Vec<SenderAccount>, quota: u32) -> CampaignResult<Self> {
        if accounts.is_empty() {
            return Err(CampaignError::EmptyAccountPool);
        }
        if quota == 0 {
            return Err(CampaignError::InvalidQuota);
        }

        Ok(Self {
            accounts,
            current: 0,
            quota,
        })
    }

    /// Lease the current account, rotating first if it has used up its quota.
    pub fn lease(&mut self) -> SenderAccount {
        if self.accounts[self.current].sends_this_rotation >= self.quota {
            self.rotate();
        }

        let account = &mut self.accounts[self.current];
        account.sends_this_rotation += 1;
        account.clone()
    }

    /// Move to the next account regardless of its quota state.
    ///
    /// Does not resend anything; the caller leases again and retries.
    pub fn force_rotate(&mut self) {
        self.rotate();
    }

    fn rotate(&mut self) {
        self.current = (self.current + 1) % self.accounts.len();
        let account = &mut self.accounts[self.current];
        account.sends_this_rotation = 0;
        info!(account = %account.identity, "Switching to email account");
    }

    pub fn current(&self) -> &SenderAccount {
        &self.accounts[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }
}

/// Read sender accounts from a JSON file (array of `EMAIL_USER`/`EMAIL_PASS` objects).
pub fn load_accounts(path: &Path) -> CampaignResult<Vec<SenderAccount>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CampaignError::Accounts(format!("cannot read {}: {}", path.display(), e))
    })?;
    let accounts: Vec<SenderAccount> = serde_json::from_str(&content)?;

    if accounts.is_empty() {
        return Err(CampaignError::EmptyAccountPool);
    }

    info!(count = accounts.len(), path = %path.display(), "Loaded sender accounts");
    Ok(accounts)
}
