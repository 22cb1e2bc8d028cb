use crate::application::booking::BookingApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(BookingApplicationError);

impl From<BookingApplicationError> for ApiError {
    fn from(err: BookingApplicationError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    /// リクエストのパース段階のバリデーションエラー
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError(BookingApplicationError::Validation(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self.0 {
            // 404 Not Found - リクエストされたリソースが存在しない
            BookingApplicationError::BookingNotFound => (
                StatusCode::NOT_FOUND,
                "BOOKING_NOT_FOUND",
                "Booking not found",
            ),
            BookingApplicationError::RoomNotFound => {
                (StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", "Room not found")
            }
            BookingApplicationError::PaymentSessionNotFound => (
                StatusCode::NOT_FOUND,
                "PAYMENT_SESSION_NOT_FOUND",
                "Payment session not found",
            ),

            // 403 Forbidden - 呼び出し元に権限がない
            BookingApplicationError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "UNAUTHORIZED",
                "Caller is not authorized for this booking",
            ),

            // 422 Unprocessable Entity - 入力の不正
            BookingApplicationError::Validation(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                msg.as_str(),
            ),

            // 409 Conflict - 不正な状態遷移、または予約競合の敗者
            BookingApplicationError::Conflict(ref msg) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.as_str())
            }

            // 502 Bad Gateway - 決済プロバイダ障害（リトライ可能）
            BookingApplicationError::Upstream(ref e) => {
                tracing::error!("Payment provider error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "PAYMENT_PROVIDER_ERROR",
                    "Payment provider is unavailable",
                )
            }

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            BookingApplicationError::StoreError(ref e) => {
                tracing::error!("Booking store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "BOOKING_STORE_ERROR",
                    "Failed to access the booking store",
                )
            }
            BookingApplicationError::RoomServiceError(ref e) => {
                tracing::error!("Room service error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ROOM_SERVICE_ERROR",
                    "Room service error",
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
