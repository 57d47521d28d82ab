use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DecodePolicy;
use crate::posts::model::{Post, RECORD_TYPE};
use crate::record::Record;
use crate::store::{
    NotificationInfo, Predicate, RecordStore, SavePolicy, Subscription, SubscriptionTrigger,
};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("record store error: {0}")]
    Remote(#[source] anyhow::Error),
    #[error("store record could not be decoded into a post")]
    Decode,
    #[error("records unexpectedly remained after delete")]
    UnexpectedRecordsFound,
}

/// CRUD for posts against the record store. Holds no cache; every call is
/// one round trip and surfaces exactly one result or error, never retried.
#[derive(Clone)]
pub struct PostRepository {
    store: Arc<dyn RecordStore>,
    decode_policy: DecodePolicy,
}

impl PostRepository {
    pub fn new(store: Arc<dyn RecordStore>, decode_policy: DecodePolicy) -> Self {
        Self {
            store,
            decode_policy,
        }
    }

    /// Persist a new post and return the store-acknowledged copy, not the
    /// locally built one.
    pub async fn save(&self, body: &str) -> Result<Post, PostError> {
        let post = Post::new(body);
        let ack = self
            .store
            .save(Record::from(&post))
            .await
            .map_err(PostError::Remote)?;
        let saved = Post::from_record(&ack).ok_or(PostError::Decode)?;
        debug!(post_id = %saved.id, "saved post");
        Ok(saved)
    }

    /// All posts, newest first. Undecodable records are dropped or fail the
    /// fetch depending on the configured [`DecodePolicy`].
    pub async fn fetch_all(&self) -> Result<Vec<Post>, PostError> {
        let records = self
            .store
            .query(RECORD_TYPE, Predicate::All)
            .await
            .map_err(PostError::Remote)?;

        let mut posts = Vec::with_capacity(records.len());
        for record in &records {
            match Post::from_record(record) {
                Some(post) => posts.push(post),
                None => match self.decode_policy {
                    DecodePolicy::Lenient => {
                        warn!(record_id = %record.id, "dropping undecodable post record")
                    }
                    DecodePolicy::Strict => return Err(PostError::Decode),
                },
            }
        }
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    pub async fn fetch(&self, id: Uuid) -> Result<Option<Post>, PostError> {
        let records = self
            .store
            .query(RECORD_TYPE, Predicate::RecordId(id))
            .await
            .map_err(PostError::Remote)?;
        Ok(records.first().and_then(Post::from_record))
    }

    /// Re-submit an edited post under its existing id.
    pub async fn update(&self, post: &Post) -> Result<Post, PostError> {
        let outcome = self
            .store
            .modify(vec![Record::from(post)], vec![], SavePolicy::ChangedKeys)
            .await
            .map_err(PostError::Remote)?;
        let updated = outcome
            .saved
            .first()
            .and_then(Post::from_record)
            .ok_or(PostError::Decode)?;
        debug!(post_id = %updated.id, "updated post");
        Ok(updated)
    }

    /// Delete succeeds only when the store reports no matching record left.
    pub async fn delete(&self, post: &Post) -> Result<(), PostError> {
        let outcome = self
            .store
            .modify(vec![], vec![post.id], SavePolicy::ChangedKeys)
            .await
            .map_err(PostError::Remote)?;
        if outcome.remaining == 0 {
            debug!(post_id = %post.id, "deleted post");
            Ok(())
        } else {
            Err(PostError::UnexpectedRecordsFound)
        }
    }

    /// Register the standing watch that pushes on every new post record.
    /// Saving the same subscription again is a no-op for the caller.
    pub async fn subscribe_to_creations(&self) -> Result<(), PostError> {
        self.store
            .save_subscription(Subscription {
                record_type: RECORD_TYPE.into(),
                trigger: SubscriptionTrigger::RecordCreation,
                notification: NotificationInfo {
                    title: "New Hype".into(),
                    body: "Someone just posted a new Hype".into(),
                },
            })
            .await
            .map_err(PostError::Remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::store::memory::MemoryStore;
    use crate::store::ModifyOutcome;
    use axum::async_trait;

    fn repo(policy: DecodePolicy) -> (Arc<MemoryStore>, PostRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = PostRepository::new(store.clone(), policy);
        (store, repo)
    }

    /// Store whose modify never actually deletes anything.
    struct StubbornStore;

    #[async_trait]
    impl RecordStore for StubbornStore {
        async fn save(&self, record: Record) -> anyhow::Result<Record> {
            Ok(record)
        }
        async fn query(&self, _: &str, _: Predicate) -> anyhow::Result<Vec<Record>> {
            Ok(vec![])
        }
        async fn modify(
            &self,
            _: Vec<Record>,
            deletes: Vec<Uuid>,
            _: SavePolicy,
        ) -> anyhow::Result<ModifyOutcome> {
            Ok(ModifyOutcome {
                saved: vec![],
                remaining: deletes.len(),
            })
        }
        async fn save_subscription(&self, _: Subscription) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Store where every call fails at the transport.
    struct DownStore;

    #[async_trait]
    impl RecordStore for DownStore {
        async fn save(&self, _: Record) -> anyhow::Result<Record> {
            anyhow::bail!("store unreachable")
        }
        async fn query(&self, _: &str, _: Predicate) -> anyhow::Result<Vec<Record>> {
            anyhow::bail!("store unreachable")
        }
        async fn modify(
            &self,
            _: Vec<Record>,
            _: Vec<Uuid>,
            _: SavePolicy,
        ) -> anyhow::Result<ModifyOutcome> {
            anyhow::bail!("store unreachable")
        }
        async fn save_subscription(&self, _: Subscription) -> anyhow::Result<()> {
            anyhow::bail!("store unreachable")
        }
    }

    #[tokio::test]
    async fn save_returns_acknowledged_post() {
        let (_, repo) = repo(DecodePolicy::Lenient);
        let post = repo.save("hello").await.expect("save");
        assert_eq!(post.body, "hello");

        let all = repo.fetch_all().await.expect("fetch");
        assert_eq!(all, vec![post]);
    }

    #[tokio::test]
    async fn fetch_all_empty_store_is_empty_not_error() {
        let (_, repo) = repo(DecodePolicy::Lenient);
        assert!(repo.fetch_all().await.expect("fetch").is_empty());
    }

    #[tokio::test]
    async fn fetch_all_drops_undecodable_records_when_lenient() {
        let (store, repo) = repo(DecodePolicy::Lenient);
        repo.save("one").await.expect("save");
        repo.save("two").await.expect("save");

        // record missing its timestamp field
        let mut malformed = Record::new(RECORD_TYPE, Uuid::new_v4());
        malformed.set("body", FieldValue::Text("broken".into()));
        store.save(malformed).await.expect("save raw");

        let posts = repo.fetch_all().await.expect("fetch");
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn fetch_all_fails_on_undecodable_record_when_strict() {
        let (store, repo) = repo(DecodePolicy::Strict);
        repo.save("one").await.expect("save");

        let mut malformed = Record::new(RECORD_TYPE, Uuid::new_v4());
        malformed.set("body", FieldValue::Text("broken".into()));
        store.save(malformed).await.expect("save raw");

        assert!(matches!(repo.fetch_all().await, Err(PostError::Decode)));
    }

    #[tokio::test]
    async fn update_keeps_id_and_created_at() {
        let (_, repo) = repo(DecodePolicy::Lenient);
        let mut post = repo.save("hello").await.expect("save");
        post.body = "edited".into();

        let updated = repo.update(&post).await.expect("update");
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.body, "edited");
        assert_eq!(updated.created_at, post.created_at);
    }

    #[tokio::test]
    async fn delete_removes_the_post() {
        let (_, repo) = repo(DecodePolicy::Lenient);
        let post = repo.save("hello").await.expect("save");
        repo.delete(&post).await.expect("delete");
        assert!(repo.fetch_all().await.expect("fetch").is_empty());
        assert_eq!(repo.fetch(post.id).await.expect("fetch"), None);
    }

    #[tokio::test]
    async fn delete_fails_when_records_remain() {
        let repo = PostRepository::new(Arc::new(StubbornStore), DecodePolicy::Lenient);
        let post = Post::new("hello");
        assert!(matches!(
            repo.delete(&post).await,
            Err(PostError::UnexpectedRecordsFound)
        ));
    }

    #[tokio::test]
    async fn transport_failures_surface_as_remote() {
        let repo = PostRepository::new(Arc::new(DownStore), DecodePolicy::Lenient);
        assert!(matches!(repo.save("hello").await, Err(PostError::Remote(_))));
        assert!(matches!(repo.fetch_all().await, Err(PostError::Remote(_))));
        assert!(matches!(
            repo.subscribe_to_creations().await,
            Err(PostError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn subscription_pushes_on_new_posts() {
        let (store, repo) = repo(DecodePolicy::Lenient);
        repo.subscribe_to_creations().await.expect("subscribe");
        // registering twice changes nothing
        repo.subscribe_to_creations().await.expect("subscribe again");

        let mut pushes = store.watch_pushes();
        let post = repo.save("hello").await.expect("save");

        let push = pushes.try_recv().expect("one push");
        assert_eq!(push.record_id, post.id);
        assert!(pushes.try_recv().is_err());
    }
}
