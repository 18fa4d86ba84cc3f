mod models;
mod service;
mod config;
mod dtos;
mod error;
mod db;
mod utils;
mod middleware;
mod handler;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, Method};
use config::Config;
use crate::db::{
    db::DBClient,
    engagementdb::EngagementExt,
    invoicedb::InvoiceExt,
    notificationdb::NotificationExt,
    pointsdb::PointsExt,
    timedb::TimeEntryExt,
};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    escrow_service::EscrowService,
    invoice_service::InvoiceService,
    notification_service::NotificationService,
    points_service::PointsService,
    time_service::TimeEntryService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    // Services
    pub time_service: Arc<TimeEntryService>,
    pub escrow_service: Arc<EscrowService>,
    pub invoice_service: Arc<InvoiceService>,
    pub points_service: Arc<PointsService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        Self::from_parts(Arc::new(db_client), config)
    }

    /// Wires every service onto one store.
    pub fn from_parts<S>(store: Arc<S>, config: Config) -> Self
    where
        S: TimeEntryExt + EngagementExt + InvoiceExt + PointsExt + NotificationExt + 'static,
    {
        let notification_service = Arc::new(NotificationService::new(
            store.clone(),
            config.notification_max_attempts,
            config.notification_retry_delay,
        ));
        let time_service = Arc::new(TimeEntryService::new(store.clone()));
        let escrow_service = Arc::new(EscrowService::new(store.clone(), notification_service.clone()));
        let invoice_service = Arc::new(InvoiceService::new(
            store.clone(),
            time_service.clone(),
            notification_service.clone(),
        ));
        let points_service = Arc::new(PointsService::new(store, notification_service));

        AppState {
            env: config,
            time_service,
            escrow_service,
            invoice_service,
            points_service,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    tracing::info!(max_connections = config.database_max_connections, "connected to the database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let db_client = DBClient::new(pool);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static(middleware::CALLER_ID_HEADER)])
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "server is running");

    axum::serve(listener, app).await?;
    Ok(())
}
