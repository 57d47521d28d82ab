use std::collections::HashMap;

use axum::async_trait;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::record::{FieldValue, Record};
use crate::store::{
    ModifyOutcome, NotificationInfo, Predicate, PushNotification, RecordStore, SavePolicy,
    Subscription, SubscriptionTrigger,
};

#[derive(Clone)]
struct StoredRecord {
    record_type: String,
    fields: HashMap<String, FieldValue>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, StoredRecord>,
    subscriptions: HashMap<(String, SubscriptionTrigger), NotificationInfo>,
}

/// In-process record store with the same semantics as the Postgres backend.
/// Used by tests and local runs without a database; creation pushes are
/// delivered on a broadcast channel instead of `pg_notify`.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    pushes: broadcast::Sender<PushNotification>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (pushes, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner::default()),
            pushes,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receiver for push notifications fired by creation subscriptions.
    pub fn watch_pushes(&self) -> broadcast::Receiver<PushNotification> {
        self.pushes.subscribe()
    }

    fn matches(id: Uuid, stored: &StoredRecord, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::All => true,
            Predicate::RecordId(wanted) => id == *wanted,
            Predicate::FieldEquals { key, value } => stored.fields.get(key) == Some(value),
        }
    }
}

impl Inner {
    /// Apply one save, returning the acknowledged record and whether it was
    /// a fresh insert.
    fn upsert(&mut self, record: Record, policy: SavePolicy) -> (Record, bool) {
        let inserted = !self.records.contains_key(&record.id);
        let entry = self
            .records
            .entry(record.id)
            .or_insert_with(|| StoredRecord {
                record_type: record.record_type.clone(),
                fields: HashMap::new(),
            });
        match policy {
            SavePolicy::AllKeys => entry.fields = record.fields,
            SavePolicy::ChangedKeys => entry.fields.extend(record.fields),
        }
        let saved = Record {
            record_type: entry.record_type.clone(),
            id: record.id,
            fields: entry.fields.clone(),
        };
        (saved, inserted)
    }

    fn creation_push(&self, record: &Record) -> Option<PushNotification> {
        let key = (record.record_type.clone(), SubscriptionTrigger::RecordCreation);
        self.subscriptions.get(&key).map(|info| PushNotification {
            record_type: record.record_type.clone(),
            record_id: record.id,
            title: info.title.clone(),
            body: info.body.clone(),
        })
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: Record) -> anyhow::Result<Record> {
        let mut inner = self.inner.lock().await;
        let (saved, inserted) = inner.upsert(record, SavePolicy::AllKeys);
        if inserted {
            if let Some(push) = inner.creation_push(&saved) {
                // nobody listening is fine
                let _ = self.pushes.send(push);
            }
        }
        Ok(saved)
    }

    async fn query(
        &self,
        record_type: &str,
        predicate: Predicate,
    ) -> anyhow::Result<Vec<Record>> {
        let inner = self.inner.lock().await;
        let records = inner
            .records
            .iter()
            .filter(|(id, stored)| {
                stored.record_type == record_type && Self::matches(**id, stored, &predicate)
            })
            .map(|(id, stored)| Record {
                record_type: stored.record_type.clone(),
                id: *id,
                fields: stored.fields.clone(),
            })
            .collect();
        Ok(records)
    }

    async fn modify(
        &self,
        saves: Vec<Record>,
        deletes: Vec<Uuid>,
        policy: SavePolicy,
    ) -> anyhow::Result<ModifyOutcome> {
        let mut inner = self.inner.lock().await;
        let mut outcome = ModifyOutcome::default();
        let mut created = Vec::new();

        for record in saves {
            let (saved, inserted) = inner.upsert(record, policy);
            if inserted {
                created.push(saved.clone());
            }
            outcome.saved.push(saved);
        }
        for id in &deletes {
            inner.records.remove(id);
        }
        outcome.remaining = deletes
            .iter()
            .filter(|id| inner.records.contains_key(id))
            .count();

        for record in created {
            if let Some(push) = inner.creation_push(&record) {
                let _ = self.pushes.send(push);
            }
        }
        Ok(outcome)
    }

    async fn save_subscription(&self, subscription: Subscription) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.subscriptions.insert(
            (subscription.record_type, subscription.trigger),
            subscription.notification,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_record(record_type: &str, key: &str, value: &str) -> Record {
        let mut record = Record::new(record_type, Uuid::new_v4());
        record.set(key, FieldValue::Text(value.into()));
        record
    }

    #[tokio::test]
    async fn save_then_query_round_trips() {
        let store = MemoryStore::new();
        let record = text_record("Post", "body", "hello");
        let saved = store.save(record.clone()).await.expect("save");
        assert_eq!(saved, record);

        let found = store.query("Post", Predicate::All).await.expect("query");
        assert_eq!(found, vec![record]);

        // other record types are invisible
        let none = store.query("User", Predicate::All).await.expect("query");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn field_equals_predicate_filters() {
        let store = MemoryStore::new();
        store
            .save(text_record("Post", "body", "hello"))
            .await
            .expect("save");
        store
            .save(text_record("Post", "body", "other"))
            .await
            .expect("save");

        let found = store
            .query(
                "Post",
                Predicate::FieldEquals {
                    key: "body".into(),
                    value: FieldValue::Text("hello".into()),
                },
            )
            .await
            .expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text("body"), Some("hello"));
    }

    #[tokio::test]
    async fn changed_keys_merges_into_stored_bag() {
        let store = MemoryStore::new();
        let mut record = Record::new("Post", Uuid::new_v4());
        record.set("body", FieldValue::Text("hello".into()));
        record.set("extra", FieldValue::Text("kept".into()));
        store.save(record.clone()).await.expect("save");

        let mut patch = Record::new("Post", record.id);
        patch.set("body", FieldValue::Text("edited".into()));
        let outcome = store
            .modify(vec![patch], vec![], SavePolicy::ChangedKeys)
            .await
            .expect("modify");

        let saved = &outcome.saved[0];
        assert_eq!(saved.text("body"), Some("edited"));
        assert_eq!(saved.text("extra"), Some("kept"));
    }

    #[tokio::test]
    async fn delete_reports_remaining() {
        let store = MemoryStore::new();
        let record = text_record("Post", "body", "hello");
        store.save(record.clone()).await.expect("save");

        let outcome = store
            .modify(vec![], vec![record.id], SavePolicy::ChangedKeys)
            .await
            .expect("modify");
        assert_eq!(outcome.remaining, 0);
        assert!(store
            .query("Post", Predicate::All)
            .await
            .expect("query")
            .is_empty());
    }

    #[tokio::test]
    async fn creation_subscription_fires_once_per_new_record() {
        let store = MemoryStore::new();
        let subscription = Subscription {
            record_type: "Post".into(),
            trigger: SubscriptionTrigger::RecordCreation,
            notification: NotificationInfo {
                title: "New Hype".into(),
                body: "Someone just posted a new Hype".into(),
            },
        };
        // idempotent: saving twice keeps a single subscription
        store
            .save_subscription(subscription.clone())
            .await
            .expect("subscribe");
        store
            .save_subscription(subscription)
            .await
            .expect("subscribe again");

        let mut pushes = store.watch_pushes();
        let record = text_record("Post", "body", "hello");
        store.save(record.clone()).await.expect("save");
        // updating the same record must not fire again
        store.save(record.clone()).await.expect("re-save");

        let push = pushes.try_recv().expect("one push");
        assert_eq!(push.record_id, record.id);
        assert_eq!(push.title, "New Hype");
        assert!(pushes.try_recv().is_err());
    }
}
