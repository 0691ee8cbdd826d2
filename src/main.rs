use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        http::StatusCode,
        routing::{get, post},
    },
    healthpay_gateway::{
        AppState,
        adapters::healthpay::HealthPayClient,
        adapters::http,
        domain::gateway::PaymentGateway,
        domain::stores::SettingsStore,
        infra::postgres::{
            PgLedgerStore, PgOrderStore, PgSettingsStore, PgTransactionLogStore,
        },
        services::credentials::{CredentialResolver, EndpointTable, EnvOverrides},
        services::reconciliation::ReconciliationEngine,
    },
    sqlx::postgres::PgPoolOptions,
    std::{env, sync::Arc, time::Duration},
    tokio::signal,
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let public_base_url =
        env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let settings = Arc::new(PgSettingsStore::new(pool.clone()));
    let persisted = settings
        .ensure_defaults()
        .await
        .expect("failed to materialize gateway settings");

    let resolver = Arc::new(CredentialResolver::new(
        EnvOverrides::from_env(),
        EndpointTable::default(),
    ));
    let creds = resolver.resolve(Some(&persisted));
    tracing::info!(enabled = creds.enabled, mode = %creds.mode, "gateway settings resolved");

    let client: Arc<dyn PaymentGateway> = Arc::new(
        HealthPayClient::new(creds, public_base_url.clone())
            .expect("failed to build HealthPay client"),
    );

    let engine = Arc::new(ReconciliationEngine::new(
        Arc::new(PgOrderStore::new(pool.clone())),
        Arc::new(PgLedgerStore::new(pool.clone())),
        Arc::new(PgTransactionLogStore::new(pool.clone())),
    ));

    let state = AppState {
        engine,
        gateway: Arc::new(tokio::sync::RwLock::new(client)),
        settings,
        resolver,
        public_base_url: public_base_url.into(),
    };

    let app = Router::new()
        .route("/", get(http::health))
        .route("/pay", post(http::pay))
        .route("/return", get(http::payment_return))
        .route("/callback", post(http::payment_callback))
        .route("/webhook", post(http::webhook))
        .route(
            "/admin/settings",
            get(http::settings_show).post(http::settings_update),
        )
        .route("/admin/settings/test", post(http::settings_test))
        .layer(DefaultBodyLimit::max(64 * 1024)) // webhook payloads are small JSON documents
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on 0.0.0.0:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
