use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;

use crate::domain::booking::{self, Booking, BookingStatus, PaymentMethod, PENDING_TTL_DAYS};
use crate::domain::commands::*;
use crate::domain::value_objects::*;
use crate::ports::booking_store::{BookingStore, ReserveError};
use crate::ports::notification_service::NotificationService;
use crate::ports::payment_provider::PaymentProvider;
use crate::ports::room_service::{RoomInfo, RoomService};

use super::errors::{BookingApplicationError, Result};
use super::occupancy;

/// 予約ポリシー
///
/// 運用で調整可能な定数をまとめた値。デフォルトは参照環境の設定。
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Pending予約のTTL。超過するとスイーパーが失効させる
    pub pending_ttl: Duration,
    /// 請求額の上限（0 ≤ amount ≤ max_amount）
    pub max_amount: Decimal,
    /// 決済通貨
    pub currency: String,
    /// 決済成功時のリダイレクト先
    pub success_url: String,
    /// 決済キャンセル時のリダイレクト先
    pub cancel_url: String,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::days(PENDING_TTL_DAYS),
            max_amount: Decimal::new(1_000_000, 0),
            currency: "usd".to_string(),
            success_url: "https://localhost/payments/success".to_string(),
            cancel_url: "https://localhost/payments/cancel".to_string(),
        }
    }
}

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub store: Arc<dyn BookingStore>,
    pub rooms: Arc<dyn RoomService>,
    pub payments: Arc<dyn PaymentProvider>,
    pub notifications: Arc<dyn NotificationService>,
    pub policy: BookingPolicy,
}

/// 部屋を取得するヘルパー関数
///
/// create_cash_booking, confirm_booking, renew_booking等で共通利用される。
pub(super) async fn load_room(deps: &ServiceDependencies, room_id: RoomId) -> Result<RoomInfo> {
    deps.rooms
        .get_room(room_id)
        .await
        .map_err(BookingApplicationError::RoomServiceError)?
        .ok_or(BookingApplicationError::RoomNotFound)
}

/// 予約を取得するヘルパー関数
pub(super) async fn load_booking(
    deps: &ServiceDependencies,
    booking_id: BookingId,
) -> Result<Booking> {
    deps.store
        .get(booking_id)
        .await
        .map_err(BookingApplicationError::StoreError)?
        .ok_or(BookingApplicationError::BookingNotFound)
}

/// 通知をベストエフォートで送信するヘルパー関数
///
/// 通知の失敗は警告ログに記録するのみで、予約の状態変更を失敗させない。
pub(super) async fn notify_best_effort(
    deps: &ServiceDependencies,
    user_id: UserId,
    message: &str,
) {
    if let Err(e) = deps.notifications.notify(user_id, message).await {
        tracing::warn!(
            user_id = %user_id.value(),
            error = %e,
            "failed to send notification"
        );
    }
}

/// オーナーIDを通知先の利用者IDに変換するヘルパー関数
///
/// オーナーアカウントはマーケットプレイス上の利用者アカウントでもある。
pub(super) fn owner_as_user(owner_id: OwnerId) -> UserId {
    UserId::from_uuid(owner_id.value())
}

/// 原子的挿入の失敗をアプリケーションエラーに変換する
pub(super) fn map_reserve_error(err: ReserveError) -> BookingApplicationError {
    match err {
        ReserveError::CapacityExceeded => {
            BookingApplicationError::Conflict("room capacity exceeded".to_string())
        }
        ReserveError::AlreadyHeld => BookingApplicationError::Conflict(
            "user already holds a live booking for this room".to_string(),
        ),
        ReserveError::Store(e) => BookingApplicationError::StoreError(e),
    }
}

/// 現地払いで予約を作成する
///
/// ビジネスルール：
/// - 部屋が存在すること
/// - 請求額は部屋価格の日割り（許容範囲内）
/// - 占有台帳が許す場合のみ挿入（容量チェックと挿入は原子的）
///
/// 成功時はオーナーに通知する（ベストエフォート）。
pub async fn create_cash_booking(
    deps: &ServiceDependencies,
    cmd: CreateCashBooking,
) -> Result<Booking> {
    // 1. 部屋の存在確認と価格取得
    let room = load_room(deps, cmd.room_id).await?;

    // 2. 占有台帳の事前判定（fail-fast。最終保証は挿入時の原子的チェック）
    if !occupancy::can_reserve(deps, cmd.room_id, cmd.user_id, &cmd.period, room.capacity).await? {
        return Err(BookingApplicationError::Conflict(
            "room cannot be reserved for the requested period".to_string(),
        ));
    }

    // 3. 請求額の計算
    let amount = crate::domain::pricing::amount_for_period(room.price_per_period, &cmd.period);

    // 4. ドメイン層の純粋関数を呼び出し
    let (booking, event) = booking::request_booking(
        cmd.user_id,
        cmd.room_id,
        Some(room.owner_id),
        cmd.period,
        amount,
        deps.policy.max_amount,
        PaymentMethod::CashOnArrival,
        None,
        cmd.requested_at,
    )
    .map_err(|e| BookingApplicationError::Validation(format!("{:?}", e)))?;

    // 5. 容量チェックと同一の原子的単位で挿入
    deps.store
        .insert_reserved(&booking, room.capacity)
        .await
        .map_err(map_reserve_error)?;

    // 6. オーナーに通知（ベストエフォート）
    notify_best_effort(
        deps,
        owner_as_user(room.owner_id),
        &format!(
            "New booking request {} for room {} ({} to {})",
            event.booking_id.value(),
            cmd.room_id.value(),
            cmd.period.start(),
            cmd.period.end()
        ),
    )
    .await;

    Ok(booking)
}

/// オーナーが予約を承認する
///
/// ビジネスルール：
/// - 呼び出し元が部屋のオーナーであること
/// - 予約がPendingまたはPaid状態であること
/// - 承認後に部屋の満室フラグを再計算すること
///
/// スイーパーの失効と競合した場合、先に行を更新した側が勝つ（CAS）。
/// 負けた側の副作用は発生せず、Conflictとして報告される。
pub async fn confirm_booking(deps: &ServiceDependencies, cmd: ConfirmBooking) -> Result<Booking> {
    // 1. 予約と部屋の取得
    let current = load_booking(deps, cmd.booking_id).await?;
    let room = load_room(deps, current.room_id).await?;

    // 2. 認可：呼び出し元が部屋のオーナーであること
    if room.owner_id != cmd.caller_owner_id {
        return Err(BookingApplicationError::Unauthorized);
    }

    // 3. ドメイン層の純粋関数を呼び出し
    let (confirmed, event) = booking::confirm(&current, cmd.confirmed_at)
        .map_err(|e| BookingApplicationError::Conflict(format!("{:?}", e)))?;

    // 4. CAS遷移（Pending/Paid → Confirmed）
    let updated = deps
        .store
        .update_status(
            cmd.booking_id,
            &[BookingStatus::Pending, BookingStatus::Paid],
            &confirmed,
        )
        .await
        .map_err(BookingApplicationError::StoreError)?
        .ok_or_else(|| {
            BookingApplicationError::Conflict("booking state changed concurrently".to_string())
        })?;

    // 5. 満室フラグの再計算
    occupancy::refresh_room_completion(
        deps,
        current.room_id,
        room.capacity,
        cmd.confirmed_at.date_naive(),
    )
    .await?;

    // 6. 利用者に通知（ベストエフォート）
    notify_best_effort(
        deps,
        current.user_id,
        &format!("Your booking {} has been confirmed", event.booking_id.value()),
    )
    .await;

    Ok(updated)
}

/// オーナーが予約をキャンセルする
///
/// ビジネスルール：
/// - 呼び出し元が部屋のオーナーであること
/// - 予約がPending / Paid / Confirmed状態であること
/// - キャンセル後に部屋の満室フラグを再計算すること（ホールド解放）
pub async fn cancel_booking(deps: &ServiceDependencies, cmd: CancelBooking) -> Result<Booking> {
    // 1. 予約と部屋の取得
    let current = load_booking(deps, cmd.booking_id).await?;
    let room = load_room(deps, current.room_id).await?;

    // 2. 認可：呼び出し元が部屋のオーナーであること
    if room.owner_id != cmd.caller_owner_id {
        return Err(BookingApplicationError::Unauthorized);
    }

    // 3. ドメイン層の純粋関数を呼び出し
    let (cancelled, event) = booking::cancel(&current, cmd.cancelled_at)
        .map_err(|e| BookingApplicationError::Conflict(format!("{:?}", e)))?;

    // 4. CAS遷移（Pending/Paid/Confirmed → Cancelled）
    let updated = deps
        .store
        .update_status(
            cmd.booking_id,
            &[
                BookingStatus::Pending,
                BookingStatus::Paid,
                BookingStatus::Confirmed,
            ],
            &cancelled,
        )
        .await
        .map_err(BookingApplicationError::StoreError)?
        .ok_or_else(|| {
            BookingApplicationError::Conflict("booking state changed concurrently".to_string())
        })?;

    // 5. 満室フラグの再計算（ホールド解放）
    occupancy::refresh_room_completion(
        deps,
        current.room_id,
        room.capacity,
        cmd.cancelled_at.date_naive(),
    )
    .await?;

    // 6. 利用者に通知（ベストエフォート）
    notify_best_effort(
        deps,
        current.user_id,
        &format!(
            "Your booking {} has been cancelled by the owner",
            event.booking_id.value()
        ),
    )
    .await;

    Ok(updated)
}

/// 予約を更新（延長契約）する（現地払い）
///
/// ビジネスルール：
/// - 呼び出し元が予約の利用者本人であること
/// - 更新対象がPaidまたはConfirmed状態で滞在終了日が未来であること
/// - 新しい期間の開始日は現在の終了日より厳密に後であること
/// - 既存予約の日付は書き換えず、新しいPending予約行を発行する
///
/// 新旧の予約は台帳上、同一利用者による時間的に離れた2件の予約として扱われる。
pub async fn renew_booking(deps: &ServiceDependencies, cmd: RenewBooking) -> Result<Booking> {
    // 1. 更新対象と部屋の取得
    let current = load_booking(deps, cmd.booking_id).await?;
    let room = load_room(deps, current.room_id).await?;

    // 2. 認可：呼び出し元が予約の利用者本人であること
    if current.user_id != cmd.caller_user_id {
        return Err(BookingApplicationError::Unauthorized);
    }

    // 3. 新しい請求額の計算
    let amount = crate::domain::pricing::amount_for_period(room.price_per_period, &cmd.new_period);

    // 4. ドメイン層の純粋関数を呼び出し
    let (renewed_current, new_booking, event) = booking::renew(
        &current,
        cmd.new_period,
        amount,
        deps.policy.max_amount,
        PaymentMethod::CashOnArrival,
        cmd.requested_at.date_naive(),
        cmd.requested_at,
    )
    .map_err(|e| match e {
        crate::domain::RenewError::NotRenewable(_) => {
            BookingApplicationError::Conflict(format!("{:?}", e))
        }
        _ => BookingApplicationError::Validation(format!("{:?}", e)),
    })?;

    // 5. 新しいPending予約を原子的に挿入
    //    新旧の期間は重ならないため、既存予約が挿入を妨げることはない
    deps.store
        .insert_reserved(&new_booking, room.capacity)
        .await
        .map_err(map_reserve_error)?;

    // 6. 旧予約をRenewedへCAS遷移
    //    競合で負けた場合、挿入済みのPending行はTTLスイーパーが回収する
    let renewed = deps
        .store
        .update_status(
            cmd.booking_id,
            &[BookingStatus::Paid, BookingStatus::Confirmed],
            &renewed_current,
        )
        .await
        .map_err(BookingApplicationError::StoreError)?;

    if renewed.is_none() {
        tracing::warn!(
            booking_id = %cmd.booking_id.value(),
            "renewal lost a concurrent transition, pending row left to the sweeper"
        );
        return Err(BookingApplicationError::Conflict(
            "booking state changed concurrently".to_string(),
        ));
    }

    // 7. オーナーに通知（ベストエフォート）
    notify_best_effort(
        deps,
        owner_as_user(room.owner_id),
        &format!(
            "Booking {} has been renewed as {} ({} to {})",
            event.previous_booking_id.value(),
            event.new_booking_id.value(),
            cmd.new_period.start(),
            cmd.new_period.end()
        ),
    )
    .await;

    Ok(new_booking)
}

/// 利用者×部屋の最新の予約を取得する
pub async fn latest_booking(
    deps: &ServiceDependencies,
    user_id: UserId,
    room_id: RoomId,
) -> Result<Option<Booking>> {
    deps.store
        .latest_for_user_room(user_id, room_id)
        .await
        .map_err(BookingApplicationError::StoreError)
}

/// 利用者の全予約を取得する（履歴表示用）
pub async fn bookings_for_user(
    deps: &ServiceDependencies,
    user_id: UserId,
) -> Result<Vec<Booking>> {
    deps.store
        .find_for_user(user_id)
        .await
        .map_err(BookingApplicationError::StoreError)
}

/// オーナーの承認待ち予約を取得する
pub async fn pending_bookings_for_owner(
    deps: &ServiceDependencies,
    owner_id: OwnerId,
) -> Result<Vec<Booking>> {
    deps.store
        .find_pending_for_owner(owner_id)
        .await
        .map_err(BookingApplicationError::StoreError)
}
