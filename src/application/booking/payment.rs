use serde_json::json;

use crate::domain::booking::{self, Booking, BookingStatus, PaymentMethod};
use crate::domain::commands::{BeginOnlinePayment, CompletePayment};
use crate::ports::payment_provider::{CheckoutSession, ProviderSessionStatus};

use super::booking_service::{
    ServiceDependencies, load_booking, load_room, map_reserve_error, notify_best_effort,
    owner_as_user,
};
use super::errors::{BookingApplicationError, Result};

/// オンライン決済を開始する
///
/// ビジネスルール：
/// - 部屋が存在し、占有台帳が予約を許すこと
/// - 更新（延長契約）の場合、新期間の開始日が現予約の終了日より厳密に後であること
/// - **Pending予約を先に永続化してから**プロバイダのセッションを作成する。
///   課金が成功したのに予約レコードが存在しない、という事態を防ぐため、
///   耐久性のあるwrite-aheadを先に行う
///
/// プロバイダ呼び出しが失敗・タイムアウトした場合、Pending行はそのまま残り、
/// 他のPending予約と同様にTTLスイーパーの回収対象になる。
pub async fn begin_online_payment(
    deps: &ServiceDependencies,
    cmd: BeginOnlinePayment,
) -> Result<(Booking, CheckoutSession)> {
    // 1. 部屋の存在確認と価格取得
    let room = load_room(deps, cmd.room_id).await?;

    // 2. 占有台帳の事前判定（fail-fast。最終保証は挿入時の原子的チェック）
    if !super::occupancy::can_reserve(deps, cmd.room_id, cmd.user_id, &cmd.period, room.capacity)
        .await?
    {
        return Err(BookingApplicationError::Conflict(
            "room cannot be reserved for the requested period".to_string(),
        ));
    }

    // 3. 請求額の計算
    let amount = crate::domain::pricing::amount_for_period(room.price_per_period, &cmd.period);

    // 4. 更新の場合は対象予約の状態と日付順序を検証
    if let Some(renews) = cmd.renews {
        let current = load_booking(deps, renews).await?;
        if current.user_id != cmd.user_id {
            return Err(BookingApplicationError::Unauthorized);
        }
        if !matches!(
            current.status,
            BookingStatus::Paid | BookingStatus::Confirmed
        ) {
            return Err(BookingApplicationError::Conflict(format!(
                "booking {} is not renewable in status {:?}",
                renews.value(),
                current.status
            )));
        }
        if cmd.period.start() <= current.period.end() {
            return Err(BookingApplicationError::Validation(
                "renewal must start strictly after the current booking ends".to_string(),
            ));
        }
    }

    // 5. Pending予約を先に永続化（write-ahead）
    let (pending, _) = booking::request_booking(
        cmd.user_id,
        cmd.room_id,
        Some(room.owner_id),
        cmd.period,
        amount,
        deps.policy.max_amount,
        PaymentMethod::OnlinePayment,
        cmd.renews,
        cmd.requested_at,
    )
    .map_err(|e| BookingApplicationError::Validation(format!("{:?}", e)))?;

    deps.store
        .insert_reserved(&pending, room.capacity)
        .await
        .map_err(map_reserve_error)?;

    // 6. プロバイダのチェックアウトセッションを作成
    let metadata = json!({
        "booking_id": pending.id.value(),
        "user_id": cmd.user_id.value(),
        "room_id": cmd.room_id.value(),
    });

    let session = deps
        .payments
        .create_checkout_session(
            amount,
            &deps.policy.currency,
            &deps.policy.success_url,
            &deps.policy.cancel_url,
            &metadata,
        )
        .await
        .map_err(|e| {
            tracing::warn!(
                booking_id = %pending.id.value(),
                error = %e,
                "checkout session creation failed, pending booking left to the ttl sweeper"
            );
            BookingApplicationError::Upstream(e)
        })?;

    // 7. セッションIDを予約に紐付ける（セッションと予約は1対1）
    deps.store
        .attach_payment_session(pending.id, &session.session_id)
        .await
        .map_err(BookingApplicationError::StoreError)?;

    let booking = Booking {
        payment_session_id: Some(session.session_id.clone()),
        ..pending
    };

    Ok((booking, session))
}

/// 決済セッションの完了を確定する
///
/// **冪等**：同じセッションIDで何度呼ばれても（Webhookの再送＋クライアントの
/// ポーリングなど）、予約は1件だけPaidになり、通知も初回の完了時にしか送らない。
/// 2回目以降の呼び出しは確定済みの予約をそのまま返す。
///
/// ビジネスルール：
/// - セッションに対応する予約が存在すること
/// - プロバイダ側で決済が実際に完了していること
/// - Pending → Paid はCASで遷移し、payment_referenceにトランザクションIDを刻印する
/// - PaidはまだベッドNを消費しない（消費はConfirmed時）
pub async fn complete_payment(deps: &ServiceDependencies, cmd: CompletePayment) -> Result<Booking> {
    // 1. セッションIDから予約を解決
    let current = deps
        .store
        .find_by_payment_session(&cmd.session_id)
        .await
        .map_err(BookingApplicationError::StoreError)?
        .ok_or(BookingApplicationError::PaymentSessionNotFound)?;

    // 2. 既に確定済みなら何もせず返す（冪等）
    match current.status {
        BookingStatus::Paid | BookingStatus::Confirmed => return Ok(current),
        BookingStatus::Pending => {}
        other => {
            return Err(BookingApplicationError::Conflict(format!(
                "booking {} is no longer payable in status {:?}",
                current.id.value(),
                other
            )));
        }
    }

    // 3. プロバイダ側で決済が完了しているか照会
    let session = deps
        .payments
        .retrieve_session(&cmd.session_id)
        .await
        .map_err(BookingApplicationError::Upstream)?
        .ok_or(BookingApplicationError::PaymentSessionNotFound)?;

    if session.status != ProviderSessionStatus::Completed {
        return Err(BookingApplicationError::Conflict(format!(
            "payment session {} is not completed on the provider side",
            cmd.session_id
        )));
    }

    let reference = session
        .transaction_id
        .unwrap_or_else(|| cmd.session_id.to_string());

    // 4. ドメイン層の純粋関数を呼び出し
    let (paid, event) = booking::mark_paid(&current, &reference, cmd.completed_at)
        .map_err(|e| BookingApplicationError::Conflict(format!("{:?}", e)))?;

    // 5. CAS遷移（Pending → Paid）
    //    課金は既にプロバイダ側で成立しているため、ここでの永続化失敗は
    //    最高レベルで記録する。呼び出し元（Webhook再送・ポーリング）がリトライする
    let updated = deps
        .store
        .update_status(current.id, &[BookingStatus::Pending], &paid)
        .await
        .map_err(|e| {
            tracing::error!(
                booking_id = %current.id.value(),
                session_id = %cmd.session_id,
                error = %e,
                "provider charge succeeded but persisting the paid status failed"
            );
            BookingApplicationError::StoreError(e)
        })?;

    let updated = match updated {
        Some(b) => b,
        // CAS負け：並行する完了呼び出しが先に確定させた
        None => {
            let winner = deps
                .store
                .find_by_payment_session(&cmd.session_id)
                .await
                .map_err(BookingApplicationError::StoreError)?
                .ok_or(BookingApplicationError::PaymentSessionNotFound)?;
            return match winner.status {
                BookingStatus::Paid | BookingStatus::Confirmed => Ok(winner),
                other => Err(BookingApplicationError::Conflict(format!(
                    "booking {} moved to {:?} during payment completion",
                    winner.id.value(),
                    other
                ))),
            };
        }
    };

    // 6. 更新（延長契約）の決済なら、旧予約をRenewedへ置き換える
    //    旧予約の状態が既に変わっていた場合は記録するのみで、決済の確定は失敗させない
    if let Some(previous_id) = updated.renews {
        supersede_previous(deps, previous_id, &updated, cmd.completed_at).await;
    }

    // 7. 初回の完了時のみオーナーに通知（ベストエフォート）
    if let Some(owner_id) = updated.owner_id {
        notify_best_effort(
            deps,
            owner_as_user(owner_id),
            &format!(
                "Booking {} has been paid online (reference {})",
                event.booking_id.value(),
                event.payment_reference
            ),
        )
        .await;
    }

    Ok(updated)
}

/// 更新の決済完了に伴い旧予約をRenewedへ遷移させる
///
/// 旧予約が既に別の遷移（キャンセル等）を終えていた場合はCASが弾く。
/// 決済自体は成立しているため、ここでの失敗は警告として記録するのみ。
async fn supersede_previous(
    deps: &ServiceDependencies,
    previous_id: crate::domain::value_objects::BookingId,
    successor: &Booking,
    renewed_at: chrono::DateTime<chrono::Utc>,
) {
    let previous = match deps.store.get(previous_id).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            tracing::warn!(
                booking_id = %previous_id.value(),
                "renewed booking no longer exists"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(
                booking_id = %previous_id.value(),
                error = %e,
                "failed to load the renewed booking"
            );
            return;
        }
    };

    let renewed = match booking::mark_renewed(&previous, successor, renewed_at) {
        Ok((renewed, _)) => renewed,
        Err(e) => {
            tracing::warn!(
                booking_id = %previous_id.value(),
                "renewed booking is no longer in a renewable state: {:?}",
                e
            );
            return;
        }
    };

    match deps
        .store
        .update_status(
            previous_id,
            &[BookingStatus::Paid, BookingStatus::Confirmed],
            &renewed,
        )
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(
                booking_id = %previous_id.value(),
                "renewed booking changed concurrently, leaving its status as is"
            );
        }
        Err(e) => {
            tracing::warn!(
                booking_id = %previous_id.value(),
                error = %e,
                "failed to persist the renewed status"
            );
        }
    }
}
