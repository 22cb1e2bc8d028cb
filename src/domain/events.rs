use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingId, OwnerId, PaymentSessionId, RoomId, StayPeriod, UserId};

/// イベント：予約がリクエストされた
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequested {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub owner_id: Option<OwnerId>,
    pub period: StayPeriod,
    pub requested_at: DateTime<Utc>,
}

/// イベント：オンライン決済が完了した
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPaid {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub payment_session_id: Option<PaymentSessionId>,
    pub payment_reference: String,
    pub paid_at: DateTime<Utc>,
}

/// イベント：オーナーが予約を承認した
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmed {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub confirmed_at: DateTime<Utc>,
}

/// イベント：予約がキャンセルされた
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCancelled {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub cancelled_at: DateTime<Utc>,
}

/// イベント：未承認のまま期限切れになった
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingExpired {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub expired_at: DateTime<Utc>,
}

/// イベント：予約が更新（延長契約）された
///
/// 更新は既存予約の日付を書き換えるのではなく、新しい予約行を発行する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRenewed {
    pub previous_booking_id: BookingId,
    pub new_booking_id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub new_period: StayPeriod,
    pub renewed_at: DateTime<Utc>,
}

/// ドメインイベント統合型
///
/// 状態遷移の成功時に発行され、通知メッセージの組み立てに使用される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    BookingRequested(BookingRequested),
    BookingPaid(BookingPaid),
    BookingConfirmed(BookingConfirmed),
    BookingCancelled(BookingCancelled),
    BookingExpired(BookingExpired),
    BookingRenewed(BookingRenewed),
}
