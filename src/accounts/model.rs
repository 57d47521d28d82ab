use uuid::Uuid;

use crate::record::{FieldValue, Record, Reference};

pub const RECORD_TYPE: &str = "User";
const USERNAME_KEY: &str = "username";
const BIO_KEY: &str = "bio";
// legacy key name, kept so records written by earlier clients keep decoding
pub(crate) const OWNER_REF_KEY: &str = "appleUserRef";

/// Profile owned by one authenticated identity. `owner_ref` is the lookup
/// key for "find my account"; at most one account should exist per identity
/// (a query convention, not a store constraint).
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub bio: String,
    pub owner_ref: Reference,
}

impl Account {
    pub fn new(username: &str, owner_ref: Reference) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            bio: String::new(),
            owner_ref,
        }
    }

    pub fn from_record(record: &Record) -> Option<Self> {
        let username = record.text(USERNAME_KEY)?;
        let bio = record.text(BIO_KEY)?;
        let owner_ref = record.reference(OWNER_REF_KEY)?;
        Some(Self {
            id: record.id,
            username: username.to_string(),
            bio: bio.to_string(),
            owner_ref,
        })
    }
}

impl From<&Account> for Record {
    fn from(account: &Account) -> Self {
        let mut record = Record::new(RECORD_TYPE, account.id);
        record.set(USERNAME_KEY, FieldValue::Text(account.username.clone()));
        record.set(BIO_KEY, FieldValue::Text(account.bio.clone()));
        record.set(OWNER_REF_KEY, FieldValue::Reference(account.owner_ref));
        record
    }
}
