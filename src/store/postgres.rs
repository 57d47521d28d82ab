use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use serde_json::json;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::record::{FieldValue, Record};
use crate::store::{
    ModifyOutcome, Predicate, PushNotification, RecordStore, SavePolicy, Subscription,
    SubscriptionTrigger,
};

/// Postgres NOTIFY channel that carries [`PushNotification`] payloads.
pub const PUSH_CHANNEL: &str = "hype_push";

const CREATION_TRIGGER: &str = "record_creation";

/// Record store backed by a `records` JSONB table plus a `subscriptions`
/// table. Creation subscriptions fire through `pg_notify`.
#[derive(Clone)]
pub struct PgRecordStore {
    db: PgPool,
}

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    record_type: String,
    fields: Json<HashMap<String, FieldValue>>,
    inserted: bool,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record {
            record_type: row.record_type,
            id: row.id,
            fields: row.fields.0,
        }
    }
}

#[derive(FromRow)]
struct SubscriptionRow {
    title: String,
    body: String,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fire `pg_notify` for every stored creation subscription matching a
    /// freshly inserted record.
    async fn notify_creations(&self, created: &[(String, Uuid)]) -> anyhow::Result<()> {
        for (record_type, record_id) in created {
            let subs = sqlx::query_as::<_, SubscriptionRow>(
                r#"
                SELECT title, body
                FROM subscriptions
                WHERE record_type = $1 AND fires_on = $2
                "#,
            )
            .bind(record_type)
            .bind(CREATION_TRIGGER)
            .fetch_all(&self.db)
            .await
            .context("load subscriptions")?;

            for sub in subs {
                let payload = serde_json::to_string(&PushNotification {
                    record_type: record_type.clone(),
                    record_id: *record_id,
                    title: sub.title,
                    body: sub.body,
                })?;
                sqlx::query("SELECT pg_notify($1, $2)")
                    .bind(PUSH_CHANNEL)
                    .bind(payload)
                    .execute(&self.db)
                    .await
                    .context("pg_notify")?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn save(&self, record: Record) -> anyhow::Result<Record> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            INSERT INTO records (id, record_type, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET fields = EXCLUDED.fields
            RETURNING id, record_type, fields, (xmax = 0) AS inserted
            "#,
        )
        .bind(record.id)
        .bind(&record.record_type)
        .bind(Json(&record.fields))
        .fetch_one(&self.db)
        .await
        .context("save record")?;

        let inserted = row.inserted;
        let saved = Record::from(row);
        if inserted {
            self.notify_creations(&[(saved.record_type.clone(), saved.id)])
                .await?;
        }
        Ok(saved)
    }

    async fn query(
        &self,
        record_type: &str,
        predicate: Predicate,
    ) -> anyhow::Result<Vec<Record>> {
        let rows = match predicate {
            Predicate::All => {
                sqlx::query_as::<_, RecordRow>(
                    r#"
                    SELECT id, record_type, fields, FALSE AS inserted
                    FROM records
                    WHERE record_type = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(record_type)
                .fetch_all(&self.db)
                .await
            }
            Predicate::RecordId(id) => {
                sqlx::query_as::<_, RecordRow>(
                    r#"
                    SELECT id, record_type, fields, FALSE AS inserted
                    FROM records
                    WHERE record_type = $1 AND id = $2
                    "#,
                )
                .bind(record_type)
                .bind(id)
                .fetch_all(&self.db)
                .await
            }
            Predicate::FieldEquals { key, value } => {
                let needle = json!({ key: serde_json::to_value(&value)? });
                sqlx::query_as::<_, RecordRow>(
                    r#"
                    SELECT id, record_type, fields, FALSE AS inserted
                    FROM records
                    WHERE record_type = $1 AND fields @> $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(record_type)
                .bind(needle)
                .fetch_all(&self.db)
                .await
            }
        }
        .context("query records")?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn modify(
        &self,
        saves: Vec<Record>,
        deletes: Vec<Uuid>,
        policy: SavePolicy,
    ) -> anyhow::Result<ModifyOutcome> {
        let mut tx = self.db.begin().await.context("begin modify")?;
        let mut outcome = ModifyOutcome::default();
        let mut created: Vec<(String, Uuid)> = Vec::new();

        let merge_sql = match policy {
            SavePolicy::AllKeys => {
                r#"
                INSERT INTO records (id, record_type, fields)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET fields = EXCLUDED.fields
                RETURNING id, record_type, fields, (xmax = 0) AS inserted
                "#
            }
            SavePolicy::ChangedKeys => {
                r#"
                INSERT INTO records (id, record_type, fields)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET fields = records.fields || EXCLUDED.fields
                RETURNING id, record_type, fields, (xmax = 0) AS inserted
                "#
            }
        };

        for record in saves {
            let row = sqlx::query_as::<_, RecordRow>(merge_sql)
                .bind(record.id)
                .bind(&record.record_type)
                .bind(Json(&record.fields))
                .fetch_one(&mut *tx)
                .await
                .context("modify: save record")?;
            if row.inserted {
                created.push((row.record_type.clone(), row.id));
            }
            outcome.saved.push(Record::from(row));
        }

        if !deletes.is_empty() {
            sqlx::query("DELETE FROM records WHERE id = ANY($1)")
                .bind(&deletes)
                .execute(&mut *tx)
                .await
                .context("modify: delete records")?;
            let remaining: i64 =
                sqlx::query_scalar("SELECT count(*) FROM records WHERE id = ANY($1)")
                    .bind(&deletes)
                    .fetch_one(&mut *tx)
                    .await
                    .context("modify: count remaining")?;
            outcome.remaining = remaining as usize;
        }

        tx.commit().await.context("commit modify")?;

        if !created.is_empty() {
            self.notify_creations(&created).await?;
        }
        Ok(outcome)
    }

    async fn save_subscription(&self, subscription: Subscription) -> anyhow::Result<()> {
        let SubscriptionTrigger::RecordCreation = subscription.trigger;
        sqlx::query(
            r#"
            INSERT INTO subscriptions (record_type, fires_on, title, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (record_type, fires_on)
            DO UPDATE SET title = EXCLUDED.title, body = EXCLUDED.body
            "#,
        )
        .bind(&subscription.record_type)
        .bind(CREATION_TRIGGER)
        .bind(&subscription.notification.title)
        .bind(&subscription.notification.body)
        .execute(&self.db)
        .await
        .context("save subscription")?;
        Ok(())
    }
}
