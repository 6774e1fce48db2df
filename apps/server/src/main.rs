mod admission;
mod auth;
mod db;
mod error;
mod handlers;
mod models;
mod notify;
mod rate_limit;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use notify::Notifier;
use rate_limit::{rate_limit_booking, BookingRateLimit};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub bot_token: String,
    pub admin_tg_id: Option<i64>,
    pub notifier: Notifier,
    pub started_at: Instant,
}

/// Booking creation budget: per IP, sliding window.
const BOOKING_RATE_MAX: u32 = 5;
const BOOKING_RATE_WINDOW_SECS: u64 = 300;
/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── Env vars ──
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:studio.db?mode=rwc".into());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let webapp_url = std::env::var("WEBAPP_URL").unwrap_or_default();

    // Telegram config is optional: without it the server still takes
    // bookings, but notifications are dropped and admin auth always fails.
    let bot_token = std::env::var("BOT_TOKEN").unwrap_or_default();
    if bot_token.is_empty() {
        tracing::warn!("BOT_TOKEN not set — notifications disabled, admin auth unavailable");
    }
    let admin_tg_id: Option<i64> = match std::env::var("ADMIN_TG_ID") {
        Ok(raw) => Some(raw.parse().map_err(|_| {
            anyhow::anyhow!("ADMIN_TG_ID must be a numeric Telegram user id")
        })?),
        Err(_) => {
            tracing::warn!("ADMIN_TG_ID not set — admin endpoints will reject everyone");
            None
        }
    };

    // ── Database ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState {
        db: pool,
        bot_token: bot_token.clone(),
        admin_tg_id,
        notifier: Notifier::new(&bot_token, admin_tg_id),
        started_at: Instant::now(),
    });

    // ── Rate limiter for booking creation ──
    let booking_limiter = BookingRateLimit::new(
        BOOKING_RATE_MAX,
        Duration::from_secs(BOOKING_RATE_WINDOW_SECS),
    );

    let cleanup_limiter = booking_limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    // ── CORS: whitelist WEBAPP_URL when configured, otherwise allow any ──
    let cors = if !webapp_url.is_empty() {
        let origins: Vec<axum::http::HeaderValue> = vec![
            webapp_url
                .parse()
                .map_err(|_| anyhow::anyhow!("WEBAPP_URL must be a valid URL"))?,
            "http://localhost:5173".parse().unwrap(), // Vite dev server
        ];
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // ── Router ──

    // Public read-only catalog + health + cron sweep.
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/categories", get(handlers::client::list_categories))
        .route("/api/services", get(handlers::client::list_services))
        .route("/api/designs", get(handlers::client::list_designs))
        .route("/api/portfolio", get(handlers::client::list_portfolio))
        .route("/api/time-slots", get(handlers::client::list_available_slots))
        .route("/api/my-bookings", get(handlers::client::my_bookings))
        .route("/api/cron/send-reminders", get(handlers::cron::send_reminders));

    // Booking creation gets its own strict per-IP budget.
    let booking_routes = Router::new()
        .route("/api/bookings", post(handlers::client::create_booking))
        .layer(from_fn_with_state(booking_limiter.clone(), rate_limit_booking));

    let admin_routes = Router::new()
        .route("/api/admin/categories", get(handlers::admin::list_categories))
        .route("/api/admin/categories", post(handlers::admin::create_category))
        .route("/api/admin/categories/{id}", put(handlers::admin::update_category))
        .route("/api/admin/categories/{id}", delete(handlers::admin::delete_category))
        .route("/api/admin/services", get(handlers::admin::list_services))
        .route("/api/admin/services", post(handlers::admin::create_service))
        .route("/api/admin/services/{id}", put(handlers::admin::update_service))
        .route("/api/admin/services/{id}", delete(handlers::admin::delete_service))
        .route("/api/admin/designs", get(handlers::admin::list_designs))
        .route("/api/admin/designs", post(handlers::admin::create_design))
        .route("/api/admin/designs/{id}", put(handlers::admin::update_design))
        .route("/api/admin/designs/{id}", delete(handlers::admin::delete_design))
        .route("/api/admin/portfolio", get(handlers::admin::list_portfolio))
        .route("/api/admin/portfolio", post(handlers::admin::create_portfolio_item))
        .route("/api/admin/portfolio/{id}", put(handlers::admin::update_portfolio_item))
        .route("/api/admin/portfolio/{id}", delete(handlers::admin::delete_portfolio_item))
        .route("/api/admin/time-slots", get(handlers::admin::list_slots))
        .route("/api/admin/time-slots", post(handlers::admin::create_slots))
        .route("/api/admin/time-slots/{id}", put(handlers::admin::update_slot))
        .route("/api/admin/time-slots/{id}", delete(handlers::admin::delete_slot))
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings/{id}", delete(handlers::admin::delete_booking));

    let app = Router::new()
        .merge(public_routes)
        .merge(booking_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Nail studio server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
