use serde::{Deserialize, Serialize};

// ── Database models ──

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub is_active: bool,
    pub category_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Design {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeSlot {
    pub id: i64,
    pub date: String,
    pub start_time: String,
    pub is_available: bool,
}

/// A booking joined with its service, design and slot, plus the computed
/// total price. The shared SELECT lives in `admission::BOOKING_DETAIL_SELECT`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    pub id: i64,
    pub client_name: String,
    pub client_phone: String,
    pub client_telegram: Option<String>,
    pub telegram_user_id: Option<i64>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: String,
    pub service_id: i64,
    pub service_name: String,
    pub service_price: i64,
    pub design_id: Option<i64>,
    pub design_name: Option<String>,
    pub design_price: Option<i64>,
    pub date: String,
    pub start_time: String,
    pub total_price: i64,
}

/// A slot with its active booking (if any) joined for admin display.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SlotWithBooking {
    pub id: i64,
    pub date: String,
    pub start_time: String,
    pub is_available: bool,
    pub booking_id: Option<i64>,
    pub client_name: Option<String>,
    pub service_name: Option<String>,
}

// ── API request/response types ──

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub client_name: String,
    pub client_phone: String,
    #[serde(default)]
    pub client_telegram: Option<String>,
    #[serde(default)]
    pub telegram_user_id: Option<i64>,
    pub service_id: i64,
    #[serde(default)]
    pub design_id: Option<i64>,
    pub time_slot_id: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MyBookingsQuery {
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_active: Option<bool>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub is_active: Option<bool>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDesignRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_active: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDesignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub is_active: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePortfolioRequest {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePortfolioRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotsRequest {
    pub date: String,
    pub times: Vec<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSlotRequest {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReminderStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub success: bool,
    pub stats: ReminderStats,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Telegram auth ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}
