use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::Booking;
use crate::domain::commands::{BeginOnlinePayment, CreateCashBooking, RenewBooking};
use crate::domain::value_objects::{BookingId, RoomId, StayPeriod, UserId};
use crate::ports::payment_provider::CheckoutSession;

/// 現地払い予約作成のリクエスト
#[derive(Debug, Deserialize)]
pub struct CreateCashBookingRequest {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CreateCashBookingRequest {
    pub fn to_command(&self, requested_at: DateTime<Utc>) -> Result<CreateCashBooking, String> {
        let period = StayPeriod::new(self.start_date, self.end_date)
            .map_err(|_| "end_date must be after start_date".to_string())?;
        Ok(CreateCashBooking {
            user_id: UserId::from_uuid(self.user_id),
            room_id: RoomId::from_uuid(self.room_id),
            period,
            requested_at,
        })
    }
}

/// オンライン決済開始のリクエスト
///
/// `renews`を指定すると既存予約の更新（延長契約）として扱われる。
#[derive(Debug, Deserialize)]
pub struct BeginOnlinePaymentRequest {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub renews: Option<Uuid>,
}

impl BeginOnlinePaymentRequest {
    pub fn to_command(&self, requested_at: DateTime<Utc>) -> Result<BeginOnlinePayment, String> {
        let period = StayPeriod::new(self.start_date, self.end_date)
            .map_err(|_| "end_date must be after start_date".to_string())?;
        Ok(BeginOnlinePayment {
            user_id: UserId::from_uuid(self.user_id),
            room_id: RoomId::from_uuid(self.room_id),
            period,
            renews: self.renews.map(BookingId::from_uuid),
            requested_at,
        })
    }
}

/// 決済完了確定のリクエスト
#[derive(Debug, Deserialize)]
pub struct CompletePaymentRequest {
    pub session_id: String,
}

/// 予約承認のリクエスト
#[derive(Debug, Deserialize)]
pub struct ConfirmBookingRequest {
    pub owner_id: Uuid,
}

/// 予約キャンセルのリクエスト
#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub owner_id: Uuid,
}

/// 予約更新（延長契約・現地払い）のリクエスト
#[derive(Debug, Deserialize)]
pub struct RenewBookingRequest {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl RenewBookingRequest {
    pub fn to_command(
        &self,
        booking_id: BookingId,
        requested_at: DateTime<Utc>,
    ) -> Result<RenewBooking, String> {
        let new_period = StayPeriod::new(self.start_date, self.end_date)
            .map_err(|_| "end_date must be after start_date".to_string())?;
        Ok(RenewBooking {
            booking_id,
            caller_user_id: UserId::from_uuid(self.user_id),
            new_period,
            requested_at,
        })
    }
}

/// 予約一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub user_id: Option<Uuid>,
}

/// 最新予約取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct LatestBookingQuery {
    pub user_id: Uuid,
    pub room_id: Uuid,
}

/// 承認待ち予約一覧のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct PendingBookingsQuery {
    pub owner_id: Uuid,
}

/// 予約レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub payment_session_id: Option<String>,
    pub payment_reference: Option<String>,
    pub renews: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id.value(),
            user_id: booking.user_id.value(),
            room_id: booking.room_id.value(),
            owner_id: booking.owner_id.map(|o| o.value()),
            start_date: booking.period.start(),
            end_date: booking.period.end(),
            amount: booking.amount,
            payment_method: booking.payment_method.as_str().to_string(),
            status: booking.status.as_str().to_string(),
            payment_session_id: booking.payment_session_id.map(|s| s.as_str().to_string()),
            payment_reference: booking.payment_reference,
            renews: booking.renews.map(|r| r.value()),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// オンライン決済開始のレスポンス
///
/// 予約はPendingのまま返り、クライアントはredirect_urlへ遷移する。
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub booking: BookingResponse,
    pub session_id: String,
    pub redirect_url: String,
}

impl CheckoutResponse {
    pub fn new(booking: Booking, session: CheckoutSession) -> Self {
        Self {
            booking: BookingResponse::from(booking),
            session_id: session.session_id.as_str().to_string(),
            redirect_url: session.redirect_url,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
