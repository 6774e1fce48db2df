use axum::{extract::State, Json};
use chrono::TimeDelta;
use std::sync::Arc;

use crate::{
    admission,
    error::ApiError,
    handlers::client::moscow_now,
    models::{ApiResponse, BookingDetail, ReminderResponse, ReminderStats},
    AppState,
};

/// GET /api/cron/send-reminders
///
/// Sweeps tomorrow's active bookings (Moscow calendar day) and sends each
/// client a reminder. Delivery is sequential and failures are counted,
/// never raised, so the sweep always reports a full stats line.
pub async fn send_reminders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ReminderResponse>>, ApiError> {
    let tomorrow = (moscow_now() + TimeDelta::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let sql = format!(
        "{} WHERE t.date = ? AND b.status IN ('pending', 'confirmed')
             AND (b.telegram_user_id IS NOT NULL OR b.client_telegram IS NOT NULL)
           ORDER BY t.start_time ASC",
        admission::BOOKING_DETAIL_SELECT
    );
    let bookings = sqlx::query_as::<_, BookingDetail>(&sql)
        .bind(&tomorrow)
        .fetch_all(&state.db)
        .await?;

    let mut stats = ReminderStats {
        total: bookings.len(),
        successful: 0,
        failed: 0,
    };

    for booking in &bookings {
        if state.notifier.send_booking_reminder(booking).await {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }
    }

    tracing::info!(
        date = %tomorrow,
        total = stats.total,
        successful = stats.successful,
        failed = stats.failed,
        "напоминания отправлены"
    );

    Ok(Json(ApiResponse::success(ReminderResponse {
        success: true,
        stats,
    })))
}
