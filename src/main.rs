use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assessment_backend::{
    config::{get_config, init_config},
    database::{
        pool::{create_pool, run_migrations},
        MemoryRepo, PgRepo, Repo,
    },
    routes,
    services::{
        conference_service::{ConferenceProvider, DisabledConferenceProvider, HttpConferenceProvider},
        notification_service::{HttpMailer, LogMailer, Mailer},
    },
    utils::time::SystemClock,
    AppState,
};
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();
    init_config()?;
    let config = get_config()?;

    let repo: Arc<dyn Repo> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Using Postgres storage");
            Arc::new(PgRepo::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryRepo::new())
        }
    };

    let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(http_client.clone(), url.clone())),
        None => Arc::new(LogMailer),
    };
    let conference: Arc<dyn ConferenceProvider> =
        match (&config.conference_api_url, &config.conference_api_key) {
            (Some(url), Some(key)) => Arc::new(HttpConferenceProvider::new(
                http_client,
                url.clone(),
                key.clone(),
            )),
            _ => Arc::new(DisabledConferenceProvider),
        };

    let app_state = AppState::new(
        repo,
        Arc::new(SystemClock),
        config.settings(),
        mailer,
        conference,
    );

    let app = routes::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
