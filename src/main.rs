//! Organic Store - service entry point.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use organic_store::api::{router, AppState};
use organic_store::domain::aggregates::order::FlatCharges;
use organic_store::domain::events::Notifier;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, notifications disabled");
                None
            }
        },
        Err(_) => None,
    };

    let state = AppState {
        db,
        notifier: Notifier::new(nats),
        charges: Arc::new(FlatCharges),
    };
    let app = router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("organic-store listening on 0.0.0.0:{port}");
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?,
        app,
    )
    .await?;
    Ok(())
}
