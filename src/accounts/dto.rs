use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::model::Account;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
}

/// Partial profile edit; absent fields are left as they are.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub bio: String,
    pub owner_id: Uuid,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            bio: account.bio,
            owner_id: account.owner_ref.record_id,
        }
    }
}
