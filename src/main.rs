use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferrofit::{
    api::{self, state::AppState},
    auth::AuthService,
    config::Settings,
    email::Mailer,
    notifier::ChangeNotifier,
    payments::AsaasClient,
    repository::{
        SqliteCheckinRepository, SqlitePaymentRepository, SqlitePlanRepository,
        SqliteStaffRepository, SqliteUserRepository,
    },
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferrofit=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Ferrofit server on {}:{}",
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

    // Initialize auth service
    let auth_service = Arc::new(AuthService::new(settings.auth.jwt_secret.clone()));

    // Initialize repositories
    let user_repo = Arc::new(SqliteUserRepository::new(db_pool.clone()));
    let plan_repo = Arc::new(SqlitePlanRepository::new(db_pool.clone()));
    let payment_repo = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
    let checkin_repo = Arc::new(SqliteCheckinRepository::new(db_pool.clone()));
    let staff_repo = Arc::new(SqliteStaffRepository::new(db_pool.clone()));

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        user_repo.clone(),
        plan_repo,
        payment_repo.clone(),
        checkin_repo.clone(),
        staff_repo,
        auth_service,
        db_pool.clone(),
    ));

    // Initialize billing gateway client if configured
    let billing_client = if settings.billing.enabled {
        if let (Some(api_key), Some(base_url)) = (
            settings.billing.api_key.clone(),
            settings.billing.base_url.clone(),
        ) {
            tracing::info!("Billing gateway enabled at {}", base_url);
            Some(Arc::new(AsaasClient::new(api_key, base_url)?))
        } else {
            tracing::warn!("Billing gateway enabled but missing configuration");
            None
        }
    } else {
        tracing::info!("Billing gateway disabled");
        None
    };

    // Mailer for password recovery, when SMTP is configured
    let mailer = Mailer::new(&settings.smtp)?.map(Arc::new);
    if mailer.is_none() {
        tracing::warn!("SMTP not configured; password recovery emails are disabled");
    }

    // Start the change notifier loop
    let notifier = Arc::new(ChangeNotifier::new(
        checkin_repo,
        payment_repo,
        user_repo,
        &settings.notifier,
    ));
    notifier.clone().spawn();
    tracing::info!(
        "Change notifier polling every {}s (lookback {}s)",
        settings.notifier.tick_seconds,
        settings.notifier.lookback_seconds
    );

    let app_state = AppState::new(
        service_context,
        notifier,
        billing_client,
        mailer,
        Arc::new(settings.clone()),
    );
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
