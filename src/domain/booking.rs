#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    BookingCancelled, BookingConfirmed, BookingExpired, BookingId, BookingPaid, BookingRenewed,
    BookingRequested, CancelError, ConfirmError, ExpireError, MarkPaidError, OwnerId,
    PaymentSessionId, RenewError, RequestBookingError, RoomId, StayPeriod, UserId,
};

/// 未承認予約のTTL（日数）
///
/// Pendingのままこの日数を超えた予約はスイーパーによりExpiredに遷移する。
pub const PENDING_TTL_DAYS: i64 = 2;

/// 予約ステータス
///
/// 遷移：
/// - Pending → Confirmed（オーナー承認）/ Expired（TTL超過）/ Cancelled / Paid（決済完了）
/// - Paid → Confirmed / Cancelled / Renewed
/// - Confirmed → Cancelled / Renewed
/// - Expired / Cancelled は終端（監査用に保持、物理削除しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// 承認待ち
    Pending,
    /// オンライン決済完了（承認待ち、ベッドはまだ消費しない）
    Paid,
    /// オーナー承認済み（ベッドを消費する）
    Confirmed,
    /// TTL超過により失効
    Expired,
    /// オーナーによるキャンセル
    Cancelled,
    /// 更新（延長契約）済み。後続の予約行が存在する
    Renewed,
}

impl BookingStatus {
    /// ライブな（終端でない）ステータスか
    ///
    /// ライブな予約は (userId, roomId) ごとに期間が重ならない範囲で
    /// 同時に1件しか存在できない。
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending
                | BookingStatus::Paid
                | BookingStatus::Confirmed
                | BookingStatus::Renewed
        )
    }

    /// ベッドを実際に占有するステータスか
    ///
    /// Pendingは容量ホールドとして扱うが、占有者数の計算には含めない。
    pub fn is_occupying(&self) -> bool {
        matches!(
            self,
            BookingStatus::Paid | BookingStatus::Confirmed | BookingStatus::Renewed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Expired | BookingStatus::Cancelled)
    }

    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Expired => "expired",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Renewed => "renewed",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "paid" => Ok(BookingStatus::Paid),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "expired" => Ok(BookingStatus::Expired),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "renewed" => Ok(BookingStatus::Renewed),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

/// 支払い方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// 入居時の現地払い
    CashOnArrival,
    /// 決済プロバイダ経由のオンライン決済
    OnlinePayment,
    /// ウォレット残高
    WalletCredit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnArrival => "cash_on_arrival",
            PaymentMethod::OnlinePayment => "online_payment",
            PaymentMethod::WalletCredit => "wallet_credit",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_on_arrival" => Ok(PaymentMethod::CashOnArrival),
            "online_payment" => Ok(PaymentMethod::OnlinePayment),
            "wallet_credit" => Ok(PaymentMethod::WalletCredit),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Booking集約 - 1つの部屋に対する1人の利用者の1回の予約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    // 識別子
    pub id: BookingId,

    // 他の集約への参照（IDのみ）
    pub user_id: UserId,
    pub room_id: RoomId,
    /// 予約時点の部屋オーナー（非正規化）
    pub owner_id: Option<OwnerId>,

    // 予約管理の責務
    pub period: StayPeriod,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,

    // 決済との照合
    pub payment_session_id: Option<PaymentSessionId>,
    /// プロバイダのトランザクションID。オンライン決済成功時のみ設定される
    pub payment_reference: Option<String>,

    /// 更新（延長契約）元の予約ID
    pub renews: Option<BookingId>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 純粋関数：予約をリクエストする
///
/// ビジネスルール：
/// - 請求額は 0 ≤ amount ≤ max_amount の範囲内
/// - 初期状態はPending（現地払い・オンライン決済のどちらも）
///
/// 副作用なし。新しいBookingとイベントを返す。
/// 容量チェックは占有台帳（アプリケーション層）の責務。
#[allow(clippy::too_many_arguments)]
pub fn request_booking(
    user_id: UserId,
    room_id: RoomId,
    owner_id: Option<OwnerId>,
    period: StayPeriod,
    amount: Decimal,
    max_amount: Decimal,
    payment_method: PaymentMethod,
    renews: Option<BookingId>,
    requested_at: DateTime<Utc>,
) -> Result<(Booking, BookingRequested), RequestBookingError> {
    if amount < Decimal::ZERO || amount > max_amount {
        return Err(RequestBookingError::AmountOutOfRange);
    }

    let booking = Booking {
        id: BookingId::new(),
        user_id,
        room_id,
        owner_id,
        period,
        amount,
        payment_method,
        status: BookingStatus::Pending,
        payment_session_id: None,
        payment_reference: None,
        renews,
        created_at: requested_at,
        updated_at: requested_at,
    };

    let event = BookingRequested {
        booking_id: booking.id,
        user_id,
        room_id,
        owner_id,
        period,
        requested_at,
    };

    Ok((booking, event))
}

/// 純粋関数：オンライン決済の完了を反映する
///
/// ビジネスルール：
/// - Pending状態からのみ遷移可能
/// - payment_referenceにプロバイダのトランザクションIDを刻印する
/// - Paidはまだベッドを消費しない（消費はConfirmed時）
///
/// 副作用なし。新しいBookingとイベントを返す。
pub fn mark_paid(
    booking: &Booking,
    payment_reference: &str,
    paid_at: DateTime<Utc>,
) -> Result<(Booking, BookingPaid), MarkPaidError> {
    if booking.status != BookingStatus::Pending {
        return Err(MarkPaidError::NotPending(booking.status));
    }

    let new_booking = Booking {
        status: BookingStatus::Paid,
        payment_reference: Some(payment_reference.to_string()),
        updated_at: paid_at,
        ..booking.clone()
    };

    let event = BookingPaid {
        booking_id: booking.id,
        user_id: booking.user_id,
        room_id: booking.room_id,
        payment_session_id: booking.payment_session_id.clone(),
        payment_reference: payment_reference.to_string(),
        paid_at,
    };

    Ok((new_booking, event))
}

/// 純粋関数：オーナーが予約を承認する
///
/// ビジネスルール：
/// - PendingまたはPaid状態からのみ遷移可能
/// - Confirmed以降はベッドを占有する（占有台帳の再計算はアプリケーション層）
///
/// 副作用なし。新しいBookingとイベントを返す。
pub fn confirm(
    booking: &Booking,
    confirmed_at: DateTime<Utc>,
) -> Result<(Booking, BookingConfirmed), ConfirmError> {
    match booking.status {
        BookingStatus::Pending | BookingStatus::Paid => {}
        other => return Err(ConfirmError::NotAwaitingConfirmation(other)),
    }

    let new_booking = Booking {
        status: BookingStatus::Confirmed,
        updated_at: confirmed_at,
        ..booking.clone()
    };

    let event = BookingConfirmed {
        booking_id: booking.id,
        user_id: booking.user_id,
        room_id: booking.room_id,
        confirmed_at,
    };

    Ok((new_booking, event))
}

/// 純粋関数：オーナーが予約をキャンセルする
///
/// ビジネスルール：
/// - Pending / Paid / Confirmed 状態からのみ遷移可能
/// - 終端状態（Expired / Cancelled）およびRenewedはキャンセル不可
///
/// 副作用なし。新しいBookingとイベントを返す。
pub fn cancel(
    booking: &Booking,
    cancelled_at: DateTime<Utc>,
) -> Result<(Booking, BookingCancelled), CancelError> {
    match booking.status {
        BookingStatus::Pending | BookingStatus::Paid | BookingStatus::Confirmed => {}
        other => return Err(CancelError::AlreadyTerminal(other)),
    }

    let new_booking = Booking {
        status: BookingStatus::Cancelled,
        updated_at: cancelled_at,
        ..booking.clone()
    };

    let event = BookingCancelled {
        booking_id: booking.id,
        user_id: booking.user_id,
        room_id: booking.room_id,
        cancelled_at,
    };

    Ok((new_booking, event))
}

/// 純粋関数：未承認予約を期限切れにする
///
/// ビジネスルール：
/// - Pending状態かつ now - created_at ≥ ttl の場合のみ遷移可能
/// - 期限切れの1秒前に承認された予約は決して失効しない（CASが守る）
///
/// 副作用なし。新しいBookingとイベントを返す。
pub fn expire(
    booking: &Booking,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<(Booking, BookingExpired), ExpireError> {
    if booking.status != BookingStatus::Pending {
        return Err(ExpireError::NotPending(booking.status));
    }

    if now - booking.created_at < ttl {
        return Err(ExpireError::TtlNotElapsed);
    }

    let new_booking = Booking {
        status: BookingStatus::Expired,
        updated_at: now,
        ..booking.clone()
    };

    let event = BookingExpired {
        booking_id: booking.id,
        user_id: booking.user_id,
        room_id: booking.room_id,
        expired_at: now,
    };

    Ok((new_booking, event))
}

/// 純粋関数：予約を更新（延長契約）する
///
/// ビジネスルール：
/// - 更新対象はPaidまたはConfirmed状態で、滞在終了日が未来であること
/// - 新しい期間の開始日は現在の終了日より厳密に後であること
/// - 既存予約の日付は書き換えず、新しいPending予約行を発行する
///   （決済の領収書が参照するレコードを遡って変更しないため）
///
/// 副作用なし。Renewedに遷移した旧Booking、新しいBooking、イベントを返す。
#[allow(clippy::too_many_arguments)]
pub fn renew(
    current: &Booking,
    new_period: StayPeriod,
    new_amount: Decimal,
    max_amount: Decimal,
    payment_method: PaymentMethod,
    today: NaiveDate,
    requested_at: DateTime<Utc>,
) -> Result<(Booking, Booking, BookingRenewed), RenewError> {
    match current.status {
        BookingStatus::Paid | BookingStatus::Confirmed => {}
        other => return Err(RenewError::NotRenewable(other)),
    }

    if current.period.end() <= today {
        return Err(RenewError::CurrentStayEnded);
    }

    if new_period.start() <= current.period.end() {
        return Err(RenewError::PeriodNotAfterCurrent);
    }

    let (new_booking, _) = request_booking(
        current.user_id,
        current.room_id,
        current.owner_id,
        new_period,
        new_amount,
        max_amount,
        payment_method,
        Some(current.id),
        requested_at,
    )?;

    let renewed_current = Booking {
        status: BookingStatus::Renewed,
        updated_at: requested_at,
        ..current.clone()
    };

    let event = BookingRenewed {
        previous_booking_id: current.id,
        new_booking_id: new_booking.id,
        user_id: current.user_id,
        room_id: current.room_id,
        new_period,
        renewed_at: requested_at,
    };

    Ok((renewed_current, new_booking, event))
}

/// 純粋関数：旧予約を後続予約に置き換え済み（Renewed）にする
///
/// オンライン決済での更新は、新しいPending予約の発行（renew相当の検証は
/// 決済開始時に済んでいる）と決済完了が別のタイミングで起こる。
/// この関数は決済完了時に旧予約をRenewedへ遷移させるために使う。
///
/// ビジネスルール：
/// - 旧予約はPaidまたはConfirmed状態であること
///
/// 副作用なし。Renewedに遷移した旧Bookingとイベントを返す。
pub fn mark_renewed(
    current: &Booking,
    successor: &Booking,
    renewed_at: DateTime<Utc>,
) -> Result<(Booking, BookingRenewed), RenewError> {
    match current.status {
        BookingStatus::Paid | BookingStatus::Confirmed => {}
        other => return Err(RenewError::NotRenewable(other)),
    }

    let renewed = Booking {
        status: BookingStatus::Renewed,
        updated_at: renewed_at,
        ..current.clone()
    };

    let event = BookingRenewed {
        previous_booking_id: current.id,
        new_booking_id: successor.id,
        user_id: current.user_id,
        room_id: current.room_id,
        new_period: successor.period,
        renewed_at,
    };

    Ok((renewed, event))
}
