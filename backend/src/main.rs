//! Agrione Inventory Ledger - Backend Server
//!
//! Stock ledger and fulfillment engine for plantation inventory: lots,
//! movements and work-order stock requests.

use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrione_inventory::{
    create_app,
    services::{notification::PgNotifier, NotificationDispatcher, NotificationOutbox},
    store::{PgDirectory, PgLedgerStore},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "inventory_server=debug,agrione_inventory=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Agrione Inventory Ledger Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let connect_options = PgConnectOptions::from_str(&config.database.url)?.options([(
        "statement_timeout",
        config.database.statement_timeout_ms.to_string(),
    )]);
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect_with(connect_options)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let directory = Arc::new(PgDirectory::new(db_pool.clone()));

    // Start the notification dispatcher
    let outbox = if config.notifications.enabled {
        let (outbox, receiver) = NotificationOutbox::channel(config.notifications.queue_capacity);
        let notifier = Arc::new(PgNotifier::new(
            db_pool.clone(),
            config.notifications.push_gateway_url.clone(),
        ));
        let dispatcher = NotificationDispatcher::new(
            notifier,
            directory.clone(),
            config.notifications.manager_roles.clone(),
        );
        tokio::spawn(dispatcher.run(receiver));
        outbox
    } else {
        tracing::info!("Notifications disabled");
        NotificationOutbox::disabled()
    };

    // Create application state
    let state = AppState {
        store: Arc::new(PgLedgerStore::new(db_pool.clone())),
        warehouses: directory.clone(),
        work_orders: directory,
        outbox,
        config: Arc::new(config.clone()),
        db: Some(db_pool),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
