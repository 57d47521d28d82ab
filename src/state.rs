use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::posts::PostRepository;
use crate::store::postgres::PgRecordStore;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub posts: PostRepository,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(db.clone()));
        let posts = PostRepository::new(store.clone(), config.decode_policy);

        Ok(Self {
            db,
            config,
            store,
            posts,
        })
    }
}
