use crate::application::booking::{
    ServiceDependencies, begin_online_payment as execute_begin_online_payment,
    bookings_for_user as execute_bookings_for_user, cancel_booking as execute_cancel_booking,
    complete_payment as execute_complete_payment, confirm_booking as execute_confirm_booking,
    create_cash_booking as execute_create_cash_booking, latest_booking as execute_latest_booking,
    pending_bookings_for_owner as execute_pending_bookings_for_owner,
    renew_booking as execute_renew_booking,
};
use crate::domain::commands::{CancelBooking, CompletePayment, ConfirmBooking};
use crate::domain::value_objects::{BookingId, OwnerId, PaymentSessionId, RoomId, UserId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BeginOnlinePaymentRequest, BookingResponse, CancelBookingRequest, CheckoutResponse,
        CompletePaymentRequest, ConfirmBookingRequest, CreateCashBookingRequest,
        LatestBookingQuery, ListBookingsQuery, PendingBookingsQuery, RenewBookingRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /bookings/cash - 現地払いの予約を作成
///
/// 強制されるビジネスルール:
/// - 部屋が存在すること
/// - 期間の重なるライブ予約の保持者数が容量未満であること
/// - 同一利用者が同じ部屋に期間の重なるライブ予約を保持していないこと
pub async fn create_cash_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCashBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let cmd = req
        .to_command(chrono::Utc::now())
        .map_err(ApiError::validation)?;

    let booking = execute_create_cash_booking(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

/// POST /bookings/payment - オンライン決済を開始
///
/// Pending予約を永続化してからプロバイダのチェックアウトセッションを作成し、
/// クライアントが遷移すべきredirect_urlを返す。
pub async fn begin_online_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BeginOnlinePaymentRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let cmd = req
        .to_command(chrono::Utc::now())
        .map_err(ApiError::validation)?;

    let (booking, session) = execute_begin_online_payment(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse::new(booking, session)),
    ))
}

/// POST /payments/complete - 決済セッションの完了を確定
///
/// Webhookの再送やクライアントのポーリングで複数回呼ばれても安全（冪等）。
pub async fn complete_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompletePaymentRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let cmd = CompletePayment {
        session_id: PaymentSessionId::new(req.session_id),
        completed_at: chrono::Utc::now(),
    };

    let booking = execute_complete_payment(&state.service_deps, cmd).await?;

    Ok((StatusCode::OK, Json(BookingResponse::from(booking))))
}

/// POST /bookings/:id/confirm - オーナーが予約を承認
///
/// 強制されるビジネスルール:
/// - 呼び出し元が部屋のオーナーであること
/// - 予約がPendingまたはPaidであること
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<ConfirmBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let cmd = ConfirmBooking {
        booking_id: BookingId::from_uuid(booking_id),
        caller_owner_id: OwnerId::from_uuid(req.owner_id),
        confirmed_at: chrono::Utc::now(),
    };

    let booking = execute_confirm_booking(&state.service_deps, cmd).await?;

    Ok((StatusCode::OK, Json(BookingResponse::from(booking))))
}

/// POST /bookings/:id/cancel - オーナーが予約をキャンセル
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let cmd = CancelBooking {
        booking_id: BookingId::from_uuid(booking_id),
        caller_owner_id: OwnerId::from_uuid(req.owner_id),
        cancelled_at: chrono::Utc::now(),
    };

    let booking = execute_cancel_booking(&state.service_deps, cmd).await?;

    Ok((StatusCode::OK, Json(BookingResponse::from(booking))))
}

/// POST /bookings/:id/renew - 予約を更新（延長契約・現地払い）
///
/// 現予約をRenewedに遷移させ、新期間のPending予約を作成して返す。
pub async fn renew_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<RenewBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let cmd = req
        .to_command(BookingId::from_uuid(booking_id), chrono::Utc::now())
        .map_err(ApiError::validation)?;

    let booking = execute_renew_booking(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /bookings - 利用者の予約一覧を取得
///
/// クエリパラメータ:
/// - user_id: 利用者ID（必須）
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, QueryError> {
    let user_id = query.user_id.ok_or_else(|| {
        QueryError::BadRequest("user_id query parameter is required".to_string())
    })?;

    let bookings = execute_bookings_for_user(&state.service_deps, UserId::from_uuid(user_id))
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}

/// GET /bookings/latest - 利用者×部屋の最新予約を取得
///
/// クエリパラメータ:
/// - user_id: 利用者ID（必須）
/// - room_id: 部屋ID（必須）
pub async fn latest_booking(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LatestBookingQuery>,
) -> Result<Json<BookingResponse>, QueryError> {
    let result = execute_latest_booking(
        &state.service_deps,
        UserId::from_uuid(query.user_id),
        RoomId::from_uuid(query.room_id),
    )
    .await
    .map_err(|e| QueryError::InternalError(e.to_string()))?;

    match result {
        Some(booking) => Ok(Json(BookingResponse::from(booking))),
        None => Err(QueryError::NotFound(format!(
            "No booking found for user {} in room {}",
            query.user_id, query.room_id
        ))),
    }
}

/// GET /bookings/pending - オーナーの承認待ち予約一覧を取得
///
/// クエリパラメータ:
/// - owner_id: オーナーID（必須）
pub async fn pending_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendingBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, QueryError> {
    let bookings = execute_pending_bookings_for_owner(
        &state.service_deps,
        OwnerId::from_uuid(query.owner_id),
    )
    .await
    .map_err(|e| QueryError::InternalError(e.to_string()))?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}

// ============================================================================
// Error types
// ============================================================================

/// クエリハンドラー用のエラー型
#[derive(Debug)]
pub enum QueryError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            QueryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            QueryError::InternalError(msg) => {
                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                tracing::error!("Internal error in query handler: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(super::types::ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
