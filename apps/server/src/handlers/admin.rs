use axum::{
    extract::{Path, Query, State},
    http::header,
    Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{admission, auth, error::ApiError, models::*, AppState};

/// Helper: extract the admin user (validates both auth and admin status).
fn extract_admin(headers: &axum::http::HeaderMap, state: &AppState) -> Result<TelegramUser, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let user = auth::extract_user_from_header(auth_header, &state.bot_token)
        .ok_or(ApiError::Unauthorized)?;

    if !auth::is_admin(&user, state.admin_tg_id) {
        return Err(ApiError::Forbidden);
    }

    Ok(user)
}

// ── Categories ──

/// GET /api/admin/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    extract_admin(&headers, &state)?;

    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, created_at FROM categories ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(categories)))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    extract_admin(&headers, &state)?;

    if body.name.trim().is_empty() {
        return Err(ApiError::InvalidInput(vec!["name"]));
    }

    let id = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(body.name.trim())
        .execute(&state.db)
        .await?
        .last_insert_rowid();

    let category =
        sqlx::query_as::<_, Category>("SELECT id, name, created_at FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(ApiResponse::success(category)))
}

/// PUT /api/admin/categories/:id
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    extract_admin(&headers, &state)?;

    if body.name.trim().is_empty() {
        return Err(ApiError::InvalidInput(vec!["name"]));
    }

    let updated = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
        .bind(body.name.trim())
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(ApiError::NotFound("Категория не найдена"));
    }

    let category =
        sqlx::query_as::<_, Category>("SELECT id, name, created_at FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(ApiResponse::success(category)))
}

/// DELETE /api/admin/categories/:id — blocked while services reference it.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    extract_admin(&headers, &state)?;
    delete_category_row(&state.db, id).await?;
    Ok(Json(ApiResponse::success("Категория удалена")))
}

pub(crate) async fn delete_category_row(pool: &SqlitePool, id: i64) -> Result<(), ApiError> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM categories WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ApiError::NotFound("Категория не найдена"));
    }

    let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if referenced > 0 {
        return Err(ApiError::Conflict(
            "Нельзя удалить категорию, к которой привязаны услуги",
        ));
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Services ──

/// GET /api/admin/services — ALL services, including inactive.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<ApiResponse<Vec<Service>>>, ApiError> {
    extract_admin(&headers, &state)?;

    let services = sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, is_active, category_id, created_at
         FROM services ORDER BY name ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(services)))
}

/// POST /api/admin/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    extract_admin(&headers, &state)?;

    let mut violated = Vec::new();
    if body.name.trim().is_empty() {
        violated.push("name");
    }
    if body.price < 0 {
        violated.push("price");
    }
    if !violated.is_empty() {
        return Err(ApiError::InvalidInput(violated));
    }

    let id = sqlx::query(
        "INSERT INTO services (name, description, price, is_active, category_id)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(body.name.trim())
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(body.price)
    .bind(body.is_active.unwrap_or(true))
    .bind(body.category_id)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let service = fetch_service(&state.db, id).await?;
    Ok(Json(ApiResponse::success(service)))
}

/// PUT /api/admin/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    extract_admin(&headers, &state)?;

    if let Some(name) = &body.name {
        sqlx::query("UPDATE services SET name = ? WHERE id = ?")
            .bind(name.trim())
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(desc) = &body.description {
        sqlx::query("UPDATE services SET description = ? WHERE id = ?")
            .bind(desc)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(price) = body.price {
        sqlx::query("UPDATE services SET price = ? WHERE id = ?")
            .bind(price)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(active) = body.is_active {
        sqlx::query("UPDATE services SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(category_id) = body.category_id {
        sqlx::query("UPDATE services SET category_id = ? WHERE id = ?")
            .bind(category_id)
            .bind(id)
            .execute(&state.db)
            .await?;
    }

    let service = fetch_service(&state.db, id).await?;
    Ok(Json(ApiResponse::success(service)))
}

/// DELETE /api/admin/services/:id — unconditional, existing bookings keep
/// their dangling reference (historic behavior, see DESIGN.md).
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    extract_admin(&headers, &state)?;

    let deleted = sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("Услуга не найдена"));
    }

    Ok(Json(ApiResponse::success("Услуга удалена")))
}

async fn fetch_service(pool: &SqlitePool, id: i64) -> Result<Service, ApiError> {
    sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, is_active, category_id, created_at
         FROM services WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Услуга не найдена"))
}

// ── Designs ──

/// GET /api/admin/designs
pub async fn list_designs(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<ApiResponse<Vec<Design>>>, ApiError> {
    extract_admin(&headers, &state)?;

    let designs = sqlx::query_as::<_, Design>(
        "SELECT id, name, description, price, is_active, image_url, created_at
         FROM designs ORDER BY name ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(designs)))
}

/// POST /api/admin/designs
pub async fn create_design(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CreateDesignRequest>,
) -> Result<Json<ApiResponse<Design>>, ApiError> {
    extract_admin(&headers, &state)?;

    let mut violated = Vec::new();
    if body.name.trim().is_empty() {
        violated.push("name");
    }
    if body.price < 0 {
        violated.push("price");
    }
    if !violated.is_empty() {
        return Err(ApiError::InvalidInput(violated));
    }

    let id = sqlx::query(
        "INSERT INTO designs (name, description, price, is_active, image_url)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(body.name.trim())
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(body.price)
    .bind(body.is_active.unwrap_or(true))
    .bind(&body.image_url)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let design = fetch_design(&state.db, id).await?;
    Ok(Json(ApiResponse::success(design)))
}

/// PUT /api/admin/designs/:id
pub async fn update_design(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDesignRequest>,
) -> Result<Json<ApiResponse<Design>>, ApiError> {
    extract_admin(&headers, &state)?;

    if let Some(name) = &body.name {
        sqlx::query("UPDATE designs SET name = ? WHERE id = ?")
            .bind(name.trim())
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(desc) = &body.description {
        sqlx::query("UPDATE designs SET description = ? WHERE id = ?")
            .bind(desc)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(price) = body.price {
        sqlx::query("UPDATE designs SET price = ? WHERE id = ?")
            .bind(price)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(active) = body.is_active {
        sqlx::query("UPDATE designs SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(url) = &body.image_url {
        sqlx::query("UPDATE designs SET image_url = ? WHERE id = ?")
            .bind(url)
            .bind(id)
            .execute(&state.db)
            .await?;
    }

    let design = fetch_design(&state.db, id).await?;
    Ok(Json(ApiResponse::success(design)))
}

/// DELETE /api/admin/designs/:id
pub async fn delete_design(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    extract_admin(&headers, &state)?;

    let deleted = sqlx::query("DELETE FROM designs WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("Дизайн не найден"));
    }

    Ok(Json(ApiResponse::success("Дизайн удалён")))
}

async fn fetch_design(pool: &SqlitePool, id: i64) -> Result<Design, ApiError> {
    sqlx::query_as::<_, Design>(
        "SELECT id, name, description, price, is_active, image_url, created_at
         FROM designs WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Дизайн не найден"))
}

// ── Portfolio ──

/// GET /api/admin/portfolio
pub async fn list_portfolio(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<ApiResponse<Vec<PortfolioItem>>>, ApiError> {
    extract_admin(&headers, &state)?;

    let items = sqlx::query_as::<_, PortfolioItem>(
        "SELECT id, title, description, image_url, is_active, created_at
         FROM portfolio_items ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(items)))
}

/// POST /api/admin/portfolio
pub async fn create_portfolio_item(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CreatePortfolioRequest>,
) -> Result<Json<ApiResponse<PortfolioItem>>, ApiError> {
    extract_admin(&headers, &state)?;

    let mut violated = Vec::new();
    if body.title.trim().is_empty() {
        violated.push("title");
    }
    if body.image_url.trim().is_empty() {
        violated.push("imageUrl");
    }
    if !violated.is_empty() {
        return Err(ApiError::InvalidInput(violated));
    }

    let id = sqlx::query(
        "INSERT INTO portfolio_items (title, description, image_url, is_active)
         VALUES (?, ?, ?, ?)",
    )
    .bind(body.title.trim())
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(body.image_url.trim())
    .bind(body.is_active.unwrap_or(true))
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let item = fetch_portfolio_item(&state.db, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// PUT /api/admin/portfolio/:id
pub async fn update_portfolio_item(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePortfolioRequest>,
) -> Result<Json<ApiResponse<PortfolioItem>>, ApiError> {
    extract_admin(&headers, &state)?;

    if let Some(title) = &body.title {
        sqlx::query("UPDATE portfolio_items SET title = ? WHERE id = ?")
            .bind(title.trim())
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(desc) = &body.description {
        sqlx::query("UPDATE portfolio_items SET description = ? WHERE id = ?")
            .bind(desc)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(url) = &body.image_url {
        sqlx::query("UPDATE portfolio_items SET image_url = ? WHERE id = ?")
            .bind(url)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(active) = body.is_active {
        sqlx::query("UPDATE portfolio_items SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&state.db)
            .await?;
    }

    let item = fetch_portfolio_item(&state.db, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// DELETE /api/admin/portfolio/:id
pub async fn delete_portfolio_item(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    extract_admin(&headers, &state)?;

    let deleted = sqlx::query("DELETE FROM portfolio_items WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("Работа не найдена"));
    }

    Ok(Json(ApiResponse::success("Работа удалена")))
}

async fn fetch_portfolio_item(pool: &SqlitePool, id: i64) -> Result<PortfolioItem, ApiError> {
    sqlx::query_as::<_, PortfolioItem>(
        "SELECT id, title, description, image_url, is_active, created_at
         FROM portfolio_items WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Работа не найдена"))
}

// ── Time slots ──

/// GET /api/admin/time-slots?from&to — all slots with their active booking.
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<ApiResponse<Vec<SlotWithBooking>>>, ApiError> {
    extract_admin(&headers, &state)?;

    const SELECT: &str = "SELECT t.id, t.date, t.start_time, t.is_available,
                 b.id AS booking_id, b.client_name, s.name AS service_name
          FROM time_slots t
          LEFT JOIN bookings b ON b.time_slot_id = t.id
               AND b.status IN ('pending', 'confirmed')
          LEFT JOIN services s ON s.id = b.service_id";

    let slots = match (&query.from, &query.to) {
        (Some(from), Some(to)) => {
            let sql = format!(
                "{SELECT} WHERE t.date BETWEEN ? AND ? ORDER BY t.date ASC, t.start_time ASC"
            );
            sqlx::query_as::<_, SlotWithBooking>(&sql)
                .bind(from)
                .bind(to)
                .fetch_all(&state.db)
                .await?
        }
        _ => {
            let sql = format!("{SELECT} ORDER BY t.date ASC, t.start_time ASC");
            sqlx::query_as::<_, SlotWithBooking>(&sql)
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(ApiResponse::success(slots)))
}

/// POST /api/admin/time-slots — batch-create slots for one day.
///
/// Inserts are independent: a mid-batch failure leaves the earlier slots
/// created.
pub async fn create_slots(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CreateSlotsRequest>,
) -> Result<Json<ApiResponse<Vec<TimeSlot>>>, ApiError> {
    extract_admin(&headers, &state)?;
    validate_slot_batch(&body)?;

    let is_available = body.is_available.unwrap_or(true);
    for time in &body.times {
        sqlx::query("INSERT INTO time_slots (date, start_time, is_available) VALUES (?, ?, ?)")
            .bind(&body.date)
            .bind(time)
            .bind(is_available)
            .execute(&state.db)
            .await?;
    }

    let slots = sqlx::query_as::<_, TimeSlot>(
        "SELECT id, date, start_time, is_available
         FROM time_slots WHERE date = ? ORDER BY start_time ASC",
    )
    .bind(&body.date)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(slots)))
}

pub(crate) fn validate_slot_batch(body: &CreateSlotsRequest) -> Result<(), ApiError> {
    let mut violated = Vec::new();
    if chrono::NaiveDate::parse_from_str(&body.date, "%Y-%m-%d").is_err() {
        violated.push("date");
    }
    if body.times.is_empty()
        || body
            .times
            .iter()
            .any(|t| chrono::NaiveTime::parse_from_str(t, "%H:%M").is_err())
    {
        violated.push("times");
    }
    if violated.is_empty() {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(violated))
    }
}

/// PUT /api/admin/time-slots/:id
pub async fn update_slot(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSlotRequest>,
) -> Result<Json<ApiResponse<TimeSlot>>, ApiError> {
    extract_admin(&headers, &state)?;

    if let Some(date) = &body.date {
        if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(ApiError::InvalidInput(vec!["date"]));
        }
        sqlx::query("UPDATE time_slots SET date = ? WHERE id = ?")
            .bind(date)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(start) = &body.start_time {
        if chrono::NaiveTime::parse_from_str(start, "%H:%M").is_err() {
            return Err(ApiError::InvalidInput(vec!["startTime"]));
        }
        sqlx::query("UPDATE time_slots SET start_time = ? WHERE id = ?")
            .bind(start)
            .bind(id)
            .execute(&state.db)
            .await?;
    }
    if let Some(available) = body.is_available {
        sqlx::query("UPDATE time_slots SET is_available = ? WHERE id = ?")
            .bind(available)
            .bind(id)
            .execute(&state.db)
            .await?;
    }

    let slot = sqlx::query_as::<_, TimeSlot>(
        "SELECT id, date, start_time, is_available FROM time_slots WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Слот не найден"))?;

    Ok(Json(ApiResponse::success(slot)))
}

/// DELETE /api/admin/time-slots/:id — blocked while ANY booking references
/// the slot, regardless of status. Stricter than admission's "active only"
/// rule so historical records are never orphaned.
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    extract_admin(&headers, &state)?;
    delete_slot_row(&state.db, id).await?;
    Ok(Json(ApiResponse::success("Слот удалён")))
}

pub(crate) async fn delete_slot_row(pool: &SqlitePool, id: i64) -> Result<(), ApiError> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM time_slots WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ApiError::NotFound("Слот не найден"));
    }

    let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE time_slot_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if referenced > 0 {
        return Err(ApiError::Conflict("Нельзя удалить слот, на который есть записи"));
    }

    sqlx::query("DELETE FROM time_slots WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Bookings ──

/// GET /api/admin/bookings?date=|from=&to= — booking details, all statuses.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<ApiResponse<Vec<BookingDetail>>>, ApiError> {
    extract_admin(&headers, &state)?;

    let bookings = if let Some(date) = &query.date {
        let sql = format!(
            "{} WHERE t.date = ? ORDER BY t.start_time ASC",
            admission::BOOKING_DETAIL_SELECT
        );
        sqlx::query_as::<_, BookingDetail>(&sql)
            .bind(date)
            .fetch_all(&state.db)
            .await?
    } else if let (Some(from), Some(to)) = (&query.from, &query.to) {
        let sql = format!(
            "{} WHERE t.date BETWEEN ? AND ? ORDER BY t.date ASC, t.start_time ASC",
            admission::BOOKING_DETAIL_SELECT
        );
        sqlx::query_as::<_, BookingDetail>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&state.db)
            .await?
    } else {
        let sql = format!(
            "{} ORDER BY t.date DESC, t.start_time DESC",
            admission::BOOKING_DETAIL_SELECT
        );
        sqlx::query_as::<_, BookingDetail>(&sql)
            .fetch_all(&state.db)
            .await?
    };

    Ok(Json(ApiResponse::success(bookings)))
}

/// DELETE /api/admin/bookings/:id — removes the row outright.
///
/// The only status writer in the system; confirm/cancel/complete transitions
/// are not exposed anywhere (see DESIGN.md).
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    extract_admin(&headers, &state)?;

    let deleted = sqlx::query("DELETE FROM bookings WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("Запись не найдена"));
    }

    Ok(Json(ApiResponse::success("Запись удалена")))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::*;

    // ── category deletion ──

    #[tokio::test]
    async fn category_delete_blocked_while_referenced() {
        let pool = test_pool().await;
        let category = insert_category(&pool, "Маникюр").await;
        sqlx::query("INSERT INTO services (name, price, category_id) VALUES ('Классика', 1000, ?)")
            .bind(category)
            .execute(&pool)
            .await
            .unwrap();

        let err = delete_category_row(&pool, category).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn category_delete_succeeds_without_references() {
        let pool = test_pool().await;
        let category = insert_category(&pool, "Маникюр").await;

        delete_category_row(&pool, category).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn category_delete_missing_is_not_found() {
        let pool = test_pool().await;
        let err = delete_category_row(&pool, 404).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // ── slot deletion ──

    #[tokio::test]
    async fn slot_delete_blocked_by_any_booking_status() {
        let pool = test_pool().await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        for status in ["pending", "confirmed", "cancelled", "completed"] {
            let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
            insert_booking(&pool, service, slot, status).await;

            let err = delete_slot_row(&pool, slot).await.unwrap_err();
            assert!(
                matches!(err, ApiError::Conflict(_)),
                "status {status} must block slot deletion"
            );
        }
    }

    #[tokio::test]
    async fn slot_delete_succeeds_without_bookings() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;

        delete_slot_row(&pool, slot).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM time_slots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn slot_delete_missing_is_not_found() {
        let pool = test_pool().await;
        let err = delete_slot_row(&pool, 404).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // ── slot batch validation ──

    fn batch(date: &str, times: &[&str]) -> CreateSlotsRequest {
        CreateSlotsRequest {
            date: date.into(),
            times: times.iter().map(|t| t.to_string()).collect(),
            is_available: None,
        }
    }

    #[test]
    fn slot_batch_accepts_valid_input() {
        assert!(validate_slot_batch(&batch("2025-06-01", &["10:00", "12:00"])).is_ok());
    }

    #[test]
    fn slot_batch_rejects_bad_date() {
        let err = validate_slot_batch(&batch("01.06.2025", &["10:00"])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref f) if f == &vec!["date"]));
    }

    #[test]
    fn slot_batch_rejects_bad_time() {
        let err = validate_slot_batch(&batch("2025-06-01", &["25:99"])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref f) if f == &vec!["times"]));
    }

    #[test]
    fn slot_batch_rejects_empty_times() {
        let err = validate_slot_batch(&batch("2025-06-01", &[])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref f) if f == &vec!["times"]));
    }
}
