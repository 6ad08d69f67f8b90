use storefront::config::AppConfig;
use storefront::{db, routes, state};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    if config.email.is_none() {
        tracing::warn!("RESEND_API_KEY not set, email code login disabled");
    }

    let state = state::AppState::from_config(pool, &config);
    let app = routes::app(state, &config.static_dir);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, origin = %config.public_origin, "storefront listening");
    axum::serve(listener, app).await.expect("server failed");
}
