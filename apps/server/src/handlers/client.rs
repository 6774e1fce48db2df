use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{FixedOffset, Utc};
use std::sync::Arc;

use crate::{admission, error::ApiError, models::*, AppState};

/// Moscow timezone offset (UTC+3). Salon-local "today"/"tomorrow" are
/// computed here, never in server-local time.
const MSK_OFFSET_SECS: i32 = 3 * 3600;

pub fn moscow_now() -> chrono::DateTime<FixedOffset> {
    let msk = FixedOffset::east_opt(MSK_OFFSET_SECS).unwrap();
    Utc::now().with_timezone(&msk)
}

pub fn moscow_today() -> String {
    moscow_now().format("%Y-%m-%d").to_string()
}

// ── Endpoints ──

/// GET /api/services — active services only.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Service>>>, ApiError> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, is_active, category_id, created_at
         FROM services WHERE is_active = 1 ORDER BY name ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(services)))
}

/// GET /api/designs — active design add-ons.
pub async fn list_designs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Design>>>, ApiError> {
    let designs = sqlx::query_as::<_, Design>(
        "SELECT id, name, description, price, is_active, image_url, created_at
         FROM designs WHERE is_active = 1 ORDER BY name ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(designs)))
}

/// GET /api/categories — all categories for the public catalog.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, created_at FROM categories ORDER BY name ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(categories)))
}

/// GET /api/portfolio — active portfolio items, newest first.
pub async fn list_portfolio(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PortfolioItem>>>, ApiError> {
    let items = sqlx::query_as::<_, PortfolioItem>(
        "SELECT id, title, description, image_url, is_active, created_at
         FROM portfolio_items WHERE is_active = 1 ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(items)))
}

/// GET /api/time-slots — bookable upcoming slots for the public booking flow.
///
/// Bookable = visible AND no active booking holds the slot.
pub async fn list_available_slots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TimeSlot>>>, ApiError> {
    let today = moscow_today();
    let slots = sqlx::query_as::<_, TimeSlot>(
        "SELECT t.id, t.date, t.start_time, t.is_available
         FROM time_slots t
         WHERE t.is_available = 1 AND t.date >= ?
           AND NOT EXISTS (SELECT 1 FROM bookings b
                            WHERE b.time_slot_id = t.id
                              AND b.status IN ('pending', 'confirmed'))
         ORDER BY t.date ASC, t.start_time ASC",
    )
    .bind(&today)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(slots)))
}

/// POST /api/bookings — the public booking flow.
///
/// Notifications go out on a spawned task after the row is committed; the
/// 201 never waits on Telegram.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingDetail>>), ApiError> {
    let booking = admission::try_admit(&state.db, &body).await?;

    tracing::info!(
        "booking {} created: slot {} service {}",
        booking.id,
        body.time_slot_id,
        body.service_id
    );

    let notifier = state.notifier.clone();
    let detail = booking.clone();
    tokio::spawn(async move {
        notifier.notify_admin_about_booking(&detail).await;
        notifier.notify_user_about_booking(&detail).await;
    });

    Ok((StatusCode::CREATED, Json(ApiResponse::success(booking))))
}

/// GET /api/my-bookings?userId=N — a Telegram user's bookings, newest first.
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<ApiResponse<Vec<BookingDetail>>>, ApiError> {
    let sql = format!(
        "{} WHERE b.telegram_user_id = ?
         ORDER BY t.date DESC, t.start_time DESC",
        admission::BOOKING_DETAIL_SELECT
    );

    let bookings = sqlx::query_as::<_, BookingDetail>(&sql)
        .bind(query.user_id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(ApiResponse::success(bookings)))
}
