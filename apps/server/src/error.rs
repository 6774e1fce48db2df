use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::ApiResponse;

/// Request-level failure taxonomy. Business-rule rejections stay 400s with a
/// client-readable message; storage failures become generic 500s and the
/// detail is logged where it happened.
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed shape validation; lists the violated fields.
    InvalidInput(Vec<&'static str>),
    /// Slot absent, hidden by the admin, or already actively booked.
    SlotUnavailable,
    /// Service (or requested design) absent or inactive.
    ServiceUnavailable,
    Unauthorized,
    Forbidden,
    NotFound(&'static str),
    /// Delete blocked by referencing rows.
    Conflict(&'static str),
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::SlotUnavailable
            | ApiError::ServiceUnavailable
            | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::InvalidInput(fields) => {
                format!("Неверные данные: {}", fields.join(", "))
            }
            ApiError::SlotUnavailable => "Выбранное время недоступно".into(),
            ApiError::ServiceUnavailable => "Услуга недоступна".into(),
            ApiError::Unauthorized => "Invalid Telegram auth".into(),
            ApiError::Forbidden => "Доступ запрещён".into(),
            ApiError::NotFound(what) => (*what).into(),
            ApiError::Conflict(msg) => (*msg).into(),
            ApiError::Internal => "Внутренняя ошибка сервера".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::<()>::error(self.message()))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("database error: {}", e);
        ApiError::Internal
    }
}
