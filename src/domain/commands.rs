use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingId, OwnerId, PaymentSessionId, RoomId, StayPeriod, UserId};

/// コマンド：現地払いで予約を作成する
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCashBooking {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub period: StayPeriod,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：オンライン決済を開始する
///
/// `renews`が指定された場合は既存予約の更新（延長契約）として扱う。
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginOnlinePayment {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub period: StayPeriod,
    pub renews: Option<BookingId>,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：決済セッションの完了を確定する
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePayment {
    pub session_id: PaymentSessionId,
    pub completed_at: DateTime<Utc>,
}

/// コマンド：オーナーが予約を承認する
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmBooking {
    pub booking_id: BookingId,
    pub caller_owner_id: OwnerId,
    pub confirmed_at: DateTime<Utc>,
}

/// コマンド：オーナーが予約をキャンセルする
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBooking {
    pub booking_id: BookingId,
    pub caller_owner_id: OwnerId,
    pub cancelled_at: DateTime<Utc>,
}

/// コマンド：予約を更新（延長契約）する（現地払い）
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewBooking {
    pub booking_id: BookingId,
    pub caller_user_id: UserId,
    pub new_period: StayPeriod,
    pub requested_at: DateTime<Utc>,
}
