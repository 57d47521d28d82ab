use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::accounts::model::{Account, OWNER_REF_KEY, RECORD_TYPE};
use crate::identity::IdentityProvider;
use crate::record::{FieldValue, Record, Reference};
use crate::store::{Predicate, RecordStore, SavePolicy};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("record store error: {0}")]
    Remote(#[source] anyhow::Error),
    #[error("no matching account record could be decoded")]
    Decode,
    #[error("no identity is signed in")]
    NoIdentity,
    #[error("records unexpectedly remained after delete")]
    UnexpectedRecordsFound,
}

/// Account CRUD scoped to whatever identity the provider resolves. Identity
/// resolution happens before any store traffic.
#[derive(Clone)]
pub struct AccountRepository {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn RecordStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Wrap the current identity id as a storable reference. `None` when
    /// nobody is signed in.
    async fn resolve_owner_reference(&self) -> Result<Option<Reference>, AccountError> {
        let id = self
            .identity
            .current_identity_id()
            .await
            .map_err(AccountError::Remote)?;
        Ok(id.map(Reference::new))
    }

    fn owner_predicate(owner: Reference) -> Predicate {
        Predicate::FieldEquals {
            key: OWNER_REF_KEY.to_string(),
            value: FieldValue::Reference(owner),
        }
    }

    /// Create the caller's account with an empty bio and return the
    /// store-acknowledged copy.
    pub async fn create_account(&self, username: &str) -> Result<Account, AccountError> {
        let owner = self
            .resolve_owner_reference()
            .await?
            .ok_or(AccountError::NoIdentity)?;
        let account = Account::new(username, owner);
        let ack = self
            .store
            .save(Record::from(&account))
            .await
            .map_err(AccountError::Remote)?;
        let saved = Account::from_record(&ack).ok_or(AccountError::Decode)?;
        debug!(account_id = %saved.id, "created account");
        Ok(saved)
    }

    /// Look up the account whose owner reference matches the caller.
    pub async fn fetch_account(&self) -> Result<Account, AccountError> {
        let owner = self
            .resolve_owner_reference()
            .await?
            .ok_or(AccountError::NoIdentity)?;
        let records = self
            .store
            .query(RECORD_TYPE, Self::owner_predicate(owner))
            .await
            .map_err(AccountError::Remote)?;
        records
            .first()
            .and_then(Account::from_record)
            .ok_or(AccountError::Decode)
    }

    /// Re-submit an edited account under its existing id.
    pub async fn update_account(&self, account: &Account) -> Result<Account, AccountError> {
        let outcome = self
            .store
            .modify(vec![Record::from(account)], vec![], SavePolicy::ChangedKeys)
            .await
            .map_err(AccountError::Remote)?;
        let updated = outcome
            .saved
            .first()
            .and_then(Account::from_record)
            .ok_or(AccountError::Decode)?;
        debug!(account_id = %updated.id, "updated account");
        Ok(updated)
    }

    /// Delete succeeds only when the store reports no matching record left.
    pub async fn delete_account(&self, account: &Account) -> Result<(), AccountError> {
        let outcome = self
            .store
            .modify(vec![], vec![account.id], SavePolicy::ChangedKeys)
            .await
            .map_err(AccountError::Remote)?;
        if outcome.remaining == 0 {
            debug!(account_id = %account.id, "deleted account");
            Ok(())
        } else {
            Err(AccountError::UnexpectedRecordsFound)
        }
    }
}
