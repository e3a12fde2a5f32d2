//! Printworks - print-on-demand storefront order service.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use printworks::auth::{PgAuthenticator, StaticAuthenticator, User};
use printworks::checkout::assembler::PricingPolicy;
use printworks::config::Config;
use printworks::notify::Notifier;
use printworks::objectstore::FsObjectStore;
use printworks::store::memory::MemoryStore;
use printworks::store::postgres::PgStore;
use printworks::{http, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; notifications disabled");
                None
            }
        },
        None => None,
    };
    let notifier = Notifier::new(nats);
    let blobs = Arc::new(FsObjectStore::new(
        config.blob_root.clone(),
        config.public_base_url.clone(),
    ));
    let pricing = PricingPolicy {
        shipping_fee: config.shipping_fee,
    };

    let state = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let store = Arc::new(PgStore::new(db.clone()));
            AppState {
                catalog: store.clone(),
                carts: store.clone(),
                orders: store.clone(),
                designs: store.clone(),
                blobs,
                promos: store,
                auth: Arc::new(PgAuthenticator::new(db)),
                notifier,
                pricing,
                cron_secret: config.cron_secret.clone(),
                retention_days: config.retention_days,
            }
        }
        None => {
            tracing::warn!("DATABASE_URL unset; running with in-memory storage");
            let store = Arc::new(MemoryStore::new());
            let mut auth = StaticAuthenticator::default();
            if let Some(token) = &config.dev_token {
                auth = auth.with_user(
                    token.clone(),
                    User {
                        id: Uuid::new_v4(),
                        email: "dev@localhost".into(),
                        is_admin: true,
                    },
                );
            }
            AppState {
                catalog: store.clone(),
                carts: store.clone(),
                orders: store.clone(),
                designs: store.clone(),
                blobs,
                promos: store,
                auth: Arc::new(auth),
                notifier,
                pricing,
                cron_secret: config.cron_secret.clone(),
                retention_days: config.retention_days,
            }
        }
    };

    let app = http::router(state);
    tracing::info!("printworks listening on 0.0.0.0:{}", config.port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?,
        app,
    )
    .await?;
    Ok(())
}
