use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use festkasse::{
    api::{self, state::AppState},
    auth::{AuthService, CsrfService},
    config::Settings,
    fulfillment::FulfillmentService,
    mail::{Mailer, NullMailer, SmtpMailer},
    payments::StripeClient,
    repository::{
        SqliteAccessCodeRepository, SqliteDonationRepository, SqliteOrderRepository,
        SqliteOutboxRepository, SqliteTicketRepository, SqliteUserRepository,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "festkasse=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Festkasse server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Repositories
    let orders = Arc::new(SqliteOrderRepository::new(db_pool.clone()));
    let tickets = Arc::new(SqliteTicketRepository::new(db_pool.clone()));
    let access_codes = Arc::new(SqliteAccessCodeRepository::new(db_pool.clone()));
    let donations = Arc::new(SqliteDonationRepository::new(db_pool.clone()));
    let outbox = Arc::new(SqliteOutboxRepository::new(db_pool.clone()));
    let users = Arc::new(SqliteUserRepository::new(db_pool.clone()));

    // Auth
    let auth_service = Arc::new(AuthService::new(db_pool.clone()));
    let csrf_service = Arc::new(CsrfService::new(db_pool.clone()));
    match auth_service.cleanup_expired_sessions().await {
        Ok(n) if n > 0 => tracing::info!("Removed {} expired sessions", n),
        Ok(_) => {}
        Err(e) => tracing::warn!("Session cleanup failed: {}", e),
    }

    // Mail transport
    let mailer: Arc<dyn Mailer> = if settings.smtp.enabled {
        tracing::info!("SMTP mail delivery enabled");
        Arc::new(SmtpMailer::new(&settings.smtp)?)
    } else {
        tracing::info!("SMTP mail delivery disabled");
        Arc::new(NullMailer)
    };

    let fulfillment = Arc::new(FulfillmentService::new(
        orders.clone(),
        donations.clone(),
        outbox.clone(),
        mailer,
        settings.festival.name.clone(),
        settings.festival.tax_notice.clone(),
    ));

    // Stripe client if configured
    let stripe_client = if settings.stripe.enabled {
        if let (Some(api_key), Some(webhook_secret)) = (
            settings.stripe.secret_key.clone(),
            settings.stripe.webhook_secret.clone(),
        ) {
            tracing::info!("Stripe payment processing enabled");
            Some(Arc::new(StripeClient::new(
                api_key,
                webhook_secret,
                &settings.festival.currency,
            )))
        } else {
            tracing::warn!("Stripe enabled but missing configuration");
            None
        }
    } else {
        tracing::info!("Stripe payment processing disabled");
        None
    };

    let app_state = AppState {
        orders,
        tickets,
        access_codes,
        donations,
        outbox,
        users,
        auth_service,
        csrf_service,
        fulfillment,
        stripe_client,
        settings: Arc::new(settings.clone()),
    };

    let app = api::create_app(app_state);

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
