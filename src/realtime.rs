//! Change-notification subscription: on every `events_changed` notification
//! the event read path is re-run, so a dashboard's view of the calendar is
//! refreshed without polling. The store's channel API stays confined here.

use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;

pub const EVENTS_CHANNEL: &str = "events_changed";

pub async fn watch_events(pool: PgPool) {
    loop {
        match run_listener(&pool).await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!("event listener dropped: {:?}, reconnecting", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

async fn run_listener(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(EVENTS_CHANNEL).await?;
    tracing::info!("listening on '{}'", EVENTS_CHANNEL);

    loop {
        let notification = listener.recv().await?;
        // on notification, re-run the read path
        let upcoming = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM events WHERE start_at > NOW()",
        )
        .fetch_one(pool)
        .await?;
        tracing::info!(
            payload = notification.payload(),
            upcoming,
            "event change, read path refreshed"
        );
    }
}
