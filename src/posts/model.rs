use time::OffsetDateTime;
use uuid::Uuid;

use crate::record::{FieldValue, Record};

pub const RECORD_TYPE: &str = "Post";
const BODY_KEY: &str = "body";
const TIMESTAMP_KEY: &str = "timestamp";

/// One short text post. The id doubles as the remote record key.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
}

impl Post {
    pub fn new(body: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Rebuild a post from a store record. `None` unless `body` and
    /// `timestamp` are both present with the right types.
    pub fn from_record(record: &Record) -> Option<Self> {
        let body = record.text(BODY_KEY)?;
        let created_at = record.timestamp(TIMESTAMP_KEY)?;
        Some(Self {
            id: record.id,
            body: body.to_string(),
            created_at,
        })
    }
}

impl From<&Post> for Record {
    fn from(post: &Post) -> Self {
        let mut record = Record::new(RECORD_TYPE, post.id);
        record.set(BODY_KEY, FieldValue::Text(post.body.clone()));
        record.set(TIMESTAMP_KEY, FieldValue::Timestamp(post.created_at));
        record
    }
}

/// Posts are the same post iff the ids match; body and timestamp edits do
/// not change identity.
impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Post {}
