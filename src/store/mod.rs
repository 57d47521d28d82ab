pub mod memory;
pub mod postgres;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{FieldValue, Record};

/// Filter applied by [`RecordStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every record of the requested type.
    All,
    RecordId(Uuid),
    FieldEquals { key: String, value: FieldValue },
}

/// Write policy for [`RecordStore::modify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// Replace the stored field bag with the submitted one.
    AllKeys,
    /// Merge submitted fields over the stored bag, leaving other keys alone.
    ChangedKeys,
}

/// Result of a batch modify.
#[derive(Debug, Default)]
pub struct ModifyOutcome {
    /// Acknowledged copies of every record that was saved.
    pub saved: Vec<Record>,
    /// How many records from the delete list still exist after the operation.
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTrigger {
    RecordCreation,
}

/// What the push channel should show when a subscription fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationInfo {
    pub title: String,
    pub body: String,
}

/// Standing server-side watch on a record type. One subscription per
/// (record type, trigger) pair; saving again overwrites the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub record_type: String,
    pub trigger: SubscriptionTrigger,
    pub notification: NotificationInfo,
}

/// Payload delivered when a subscription fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub record_type: String,
    pub record_id: Uuid,
    pub title: String,
    pub body: String,
}

/// The remote record database. Repositories talk only to this trait; the
/// Postgres backend serves production, the memory backend serves tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert a single record and return the acknowledged server copy.
    async fn save(&self, record: Record) -> anyhow::Result<Record>;

    async fn query(&self, record_type: &str, predicate: Predicate)
        -> anyhow::Result<Vec<Record>>;

    /// Batch save/delete in one round trip.
    async fn modify(
        &self,
        saves: Vec<Record>,
        deletes: Vec<Uuid>,
        policy: SavePolicy,
    ) -> anyhow::Result<ModifyOutcome>;

    async fn save_subscription(&self, subscription: Subscription) -> anyhow::Result<()>;
}
