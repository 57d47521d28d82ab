use sqlx::postgres::PgListener;
use sqlx::PgPool;

mod accounts;
mod app;
mod auth;
mod config;
mod identity;
mod posts;
mod record;
mod state;
mod store;

use crate::store::postgres::PUSH_CHANNEL;
use crate::store::PushNotification;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "hype=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    // Register the standing watch on post creations, like the original app
    // did at launch. Startup continues if the store rejects it.
    if let Err(e) = app_state.posts.subscribe_to_creations().await {
        tracing::warn!(error = %e, "could not register post creation subscription");
    }

    tokio::spawn(push_listener(app_state.db.clone()));

    let app = app::build_app(app_state);
    app::serve(app).await
}

/// Surface push notifications fired by the store. Delivery to devices is the
/// platform's job; here deliveries land on the log.
async fn push_listener(db: PgPool) {
    if let Err(e) = listen_for_pushes(db).await {
        tracing::warn!(error = %e, "push listener stopped");
    }
}

async fn listen_for_pushes(db: PgPool) -> anyhow::Result<()> {
    let mut listener = PgListener::connect_with(&db).await?;
    listener.listen(PUSH_CHANNEL).await?;
    loop {
        let notification = listener.recv().await?;
        match serde_json::from_str::<PushNotification>(notification.payload()) {
            Ok(push) => tracing::info!(
                record_type = %push.record_type,
                record_id = %push.record_id,
                title = %push.title,
                "push notification delivered"
            ),
            Err(e) => tracing::warn!(error = %e, "undecodable push payload"),
        }
    }
}
