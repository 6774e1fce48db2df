//! Booking admission: decides whether a new booking may be created and
//! persists it.
//!
//! The availability read and the insert are not wrapped in a transaction.
//! Instead the partial unique index `idx_bookings_active_slot` guarantees at
//! most one active booking per slot: when two requests pass the availability
//! check together, the second insert fails with a unique violation and is
//! reported as `SlotUnavailable`.

use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::{BookingDetail, CreateBookingRequest, Design, Service};

/// Minimum client name length (characters).
const MIN_NAME_CHARS: usize = 2;
/// Minimum phone length after stripping non-digits.
const MIN_PHONE_DIGITS: usize = 10;

/// The shared SELECT for booking detail queries (client, admin and cron all
/// append their own WHERE/ORDER BY).
pub const BOOKING_DETAIL_SELECT: &str =
    "SELECT b.id, b.client_name, b.client_phone, b.client_telegram, b.telegram_user_id,
            b.notes, b.status, b.created_at,
            b.service_id, s.name AS service_name, s.price AS service_price,
            b.design_id, d.name AS design_name, d.price AS design_price,
            t.date, t.start_time,
            s.price + COALESCE(d.price, 0) AS total_price
     FROM bookings b
     JOIN services s ON s.id = b.service_id
     LEFT JOIN designs d ON d.id = b.design_id
     JOIN time_slots t ON t.id = b.time_slot_id";

/// Canonical phone form: digits only. Idempotent.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Shape validation, first admission layer. Returns every violated field so
/// the client can fix them all at once.
pub fn validate(input: &CreateBookingRequest) -> Result<(), Vec<&'static str>> {
    let mut violated = Vec::new();

    if input.client_name.trim().chars().count() < MIN_NAME_CHARS {
        violated.push("clientName");
    }
    if normalize_phone(&input.client_phone).len() < MIN_PHONE_DIGITS {
        violated.push("clientPhone");
    }
    if input.service_id <= 0 {
        violated.push("serviceId");
    }
    if input.time_slot_id <= 0 {
        violated.push("timeSlotId");
    }
    if matches!(input.design_id, Some(id) if id <= 0) {
        violated.push("designId");
    }

    if violated.is_empty() {
        Ok(())
    } else {
        Err(violated)
    }
}

/// Try to admit a booking. Checks run in order, first failure wins:
/// input shape, slot bookable, service active, design active (when requested).
/// On success the booking is persisted with status `pending` and returned
/// with its service/design joined and total price computed.
pub async fn try_admit(
    pool: &SqlitePool,
    input: &CreateBookingRequest,
) -> Result<BookingDetail, ApiError> {
    validate(input).map_err(ApiError::InvalidInput)?;

    // Slot plus its count of active bookings in one read.
    let slot: Option<(i64, bool, i64)> = sqlx::query_as(
        "SELECT t.id, t.is_available,
                (SELECT COUNT(*) FROM bookings b
                  WHERE b.time_slot_id = t.id AND b.status IN ('pending', 'confirmed'))
         FROM time_slots t WHERE t.id = ?",
    )
    .bind(input.time_slot_id)
    .fetch_optional(pool)
    .await?;

    match slot {
        Some((_, true, 0)) => {}
        _ => return Err(ApiError::SlotUnavailable),
    }

    let service = sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, is_active, category_id, created_at
         FROM services WHERE id = ?",
    )
    .bind(input.service_id)
    .fetch_optional(pool)
    .await?;

    match service {
        Some(ref s) if s.is_active => {}
        _ => return Err(ApiError::ServiceUnavailable),
    }

    if let Some(design_id) = input.design_id {
        let design = sqlx::query_as::<_, Design>(
            "SELECT id, name, description, price, is_active, image_url, created_at
             FROM designs WHERE id = ?",
        )
        .bind(design_id)
        .fetch_optional(pool)
        .await?;

        match design {
            Some(ref d) if d.is_active => {}
            _ => return Err(ApiError::ServiceUnavailable),
        }
    }

    let phone = normalize_phone(&input.client_phone);
    let telegram = input
        .client_telegram
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let insert = sqlx::query(
        "INSERT INTO bookings (service_id, design_id, time_slot_id, client_name, client_phone,
                               client_telegram, telegram_user_id, notes, status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending')",
    )
    .bind(input.service_id)
    .bind(input.design_id)
    .bind(input.time_slot_id)
    .bind(input.client_name.trim())
    .bind(&phone)
    .bind(&telegram)
    .bind(input.telegram_user_id)
    .bind(&input.notes)
    .execute(pool)
    .await;

    let booking_id = match insert {
        Ok(result) => result.last_insert_rowid(),
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            // Lost the race: another request took this slot between our
            // availability read and the insert.
            tracing::warn!(
                "concurrent booking attempt for slot {} rejected",
                input.time_slot_id
            );
            return Err(ApiError::SlotUnavailable);
        }
        Err(e) => return Err(e.into()),
    };

    fetch_booking_detail(pool, booking_id).await
}

pub async fn fetch_booking_detail(
    pool: &SqlitePool,
    booking_id: i64,
) -> Result<BookingDetail, ApiError> {
    let query = format!("{} WHERE b.id = ?", BOOKING_DETAIL_SELECT);
    let detail = sqlx::query_as::<_, BookingDetail>(&query)
        .bind(booking_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("Запись не найдена"))?;
    Ok(detail)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::*;

    fn input(service_id: i64, slot_id: i64) -> CreateBookingRequest {
        CreateBookingRequest {
            client_name: "Анна".into(),
            client_phone: "+7 (999) 123-45-67".into(),
            client_telegram: None,
            telegram_user_id: None,
            service_id,
            design_id: None,
            time_slot_id: slot_id,
            notes: None,
        }
    }

    // ── normalize_phone ──

    #[test]
    fn phone_strips_all_non_digits() {
        assert_eq!(normalize_phone("+7 (999) 123-45-67"), "79991234567");
    }

    #[test]
    fn phone_normalization_is_idempotent() {
        let once = normalize_phone("+7 (999) 123-45-67");
        assert_eq!(normalize_phone(&once), once);
    }

    #[test]
    fn phone_empty_input() {
        assert_eq!(normalize_phone("abc-def"), "");
    }

    // ── validate ──

    #[test]
    fn validate_accepts_good_input() {
        assert!(validate(&input(1, 1)).is_ok());
    }

    #[test]
    fn validate_rejects_short_name() {
        let mut req = input(1, 1);
        req.client_name = "А".into();
        assert_eq!(validate(&req).unwrap_err(), vec!["clientName"]);
    }

    #[test]
    fn validate_rejects_short_phone() {
        let mut req = input(1, 1);
        req.client_phone = "12345".into();
        assert_eq!(validate(&req).unwrap_err(), vec!["clientPhone"]);
    }

    #[test]
    fn validate_lists_every_violation() {
        let mut req = input(0, 0);
        req.client_name = " ".into();
        req.client_phone = String::new();
        req.design_id = Some(-1);
        assert_eq!(
            validate(&req).unwrap_err(),
            vec![
                "clientName",
                "clientPhone",
                "serviceId",
                "timeSlotId",
                "designId"
            ]
        );
    }

    // ── try_admit ──

    #[tokio::test]
    async fn admits_and_computes_total_price() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        let booking = try_admit(&pool, &input(service, slot)).await.unwrap();
        assert_eq!(booking.status, "pending");
        assert_eq!(booking.total_price, 1000);
        assert_eq!(booking.client_phone, "79991234567");
        assert_eq!(booking.date, "2025-06-01");
        assert_eq!(booking.start_time, "10:00");
    }

    #[tokio::test]
    async fn design_price_is_added_to_total() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;
        let design = insert_design(&pool, "Френч", 500, true).await;

        let mut req = input(service, slot);
        req.design_id = Some(design);
        let booking = try_admit(&pool, &req).await.unwrap();
        assert_eq!(booking.total_price, 1500);
        assert_eq!(booking.design_name.as_deref(), Some("Френч"));
    }

    #[tokio::test]
    async fn rejects_when_slot_absent() {
        let pool = test_pool().await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        let err = try_admit(&pool, &input(service, 999)).await.unwrap_err();
        assert!(matches!(err, ApiError::SlotUnavailable));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn rejects_when_slot_hidden() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", false).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        let err = try_admit(&pool, &input(service, slot)).await.unwrap_err();
        assert!(matches!(err, ApiError::SlotUnavailable));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn rejects_when_slot_actively_booked() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;
        insert_booking(&pool, service, slot, "confirmed").await;

        let err = try_admit(&pool, &input(service, slot)).await.unwrap_err();
        assert!(matches!(err, ApiError::SlotUnavailable));
        assert_eq!(booking_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn cancelled_booking_does_not_block_slot() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;
        insert_booking(&pool, service, slot, "cancelled").await;

        let booking = try_admit(&pool, &input(service, slot)).await.unwrap();
        assert_eq!(booking.status, "pending");
        assert_eq!(booking_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn rejects_when_service_absent() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;

        let err = try_admit(&pool, &input(999, slot)).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn rejects_when_service_inactive() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, false).await;

        let err = try_admit(&pool, &input(service, slot)).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn rejects_when_design_inactive() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;
        let design = insert_design(&pool, "Френч", 500, false).await;

        let mut req = input(service, slot);
        req.design_id = Some(design);
        let err = try_admit(&pool, &req).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn invalid_input_creates_no_row() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        let mut req = input(service, slot);
        req.client_phone = "123".into();
        let err = try_admit(&pool, &req).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref f) if f == &vec!["clientPhone"]));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn second_admission_for_same_slot_loses() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        let first = try_admit(&pool, &input(service, slot)).await;
        let second = try_admit(&pool, &input(service, slot)).await;

        assert!(first.is_ok());
        assert!(matches!(second.unwrap_err(), ApiError::SlotUnavailable));
        assert_eq!(booking_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn concurrent_admissions_admit_exactly_one() {
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;

        let req = input(service, slot);
        let (a, b) = tokio::join!(try_admit(&pool, &req), try_admit(&pool, &req));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert_eq!(booking_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn storage_index_rejects_second_active_booking() {
        // Bypass admission entirely: the index alone must hold the invariant.
        let pool = test_pool().await;
        let slot = insert_slot(&pool, "2025-06-01", "10:00", true).await;
        let service = insert_service(&pool, "Маникюр", 1000, true).await;
        insert_booking(&pool, service, slot, "pending").await;

        let err = sqlx::query(
            "INSERT INTO bookings (service_id, time_slot_id, client_name, client_phone, status)
             VALUES (?, ?, 'Гонка', '79991112233', 'confirmed')",
        )
        .bind(service)
        .bind(slot)
        .execute(&pool)
        .await
        .unwrap_err();

        assert!(err
            .as_database_error()
            .is_some_and(|d| d.is_unique_violation()));
    }
}
