use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::domain::booking::{self, Booking, BookingStatus};

use super::booking_service::{ServiceDependencies, notify_best_effort};
use super::errors::{BookingApplicationError, Result};
use super::occupancy;

/// スイーパーの実行間隔（参照環境では1時間）
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// 期限切れ掃引バッチ
///
/// 定期的に実行され、TTLを超過したPending予約をExpiredに遷移させる。
///
/// ビジネスルール：
/// - now - created_at ≥ TTL のPending予約のみ対象
/// - 遷移はCASで行う。期限直前に承認された予約は決して失効しない
/// - 1件の失敗が他の予約の掃引を妨げてはならない（記録して続行）
/// - 失効後は部屋の満室フラグを再計算し、ホールドを解放する
///
/// # 戻り値
/// 失効として処理した予約の件数
pub async fn sweep_expired(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let cutoff = now - deps.policy.pending_ttl;
    let candidates = deps
        .store
        .find_expiry_candidates(cutoff)
        .await
        .map_err(BookingApplicationError::StoreError)?;

    let mut expired_count = 0;

    for candidate in candidates {
        match expire_one(deps, &candidate, now).await {
            Ok(true) => expired_count += 1,
            // CAS負け、または候補取得後に状態が変わった場合はスキップ
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    booking_id = %candidate.id.value(),
                    error = %e,
                    "failed to expire booking, continuing sweep"
                );
            }
        }
    }

    Ok(expired_count)
}

/// 1件の予約を失効させる
///
/// # 戻り値
/// 実際に失効させた場合はtrue、ガードまたはCASで弾かれた場合はfalse
async fn expire_one(
    deps: &ServiceDependencies,
    candidate: &Booking,
    now: DateTime<Utc>,
) -> Result<bool> {
    // 1. ドメイン層の純粋関数を呼び出し（ガード：Pending かつ TTL超過）
    let (expired, event) = match booking::expire(candidate, now, deps.policy.pending_ttl) {
        Ok(result) => result,
        Err(_) => return Ok(false),
    };

    // 2. CAS遷移（Pending → Expired）。承認と競合したら承認が勝つ
    let updated = deps
        .store
        .update_status(candidate.id, &[BookingStatus::Pending], &expired)
        .await
        .map_err(BookingApplicationError::StoreError)?;

    if updated.is_none() {
        return Ok(false);
    }

    // 3. 満室フラグの再計算（ホールド解放）
    //    部屋が既に存在しない場合は記録してスキップ
    match deps.rooms.get_room(candidate.room_id).await {
        Ok(Some(room)) => {
            occupancy::refresh_room_completion(
                deps,
                candidate.room_id,
                room.capacity,
                now.date_naive(),
            )
            .await?;
        }
        Ok(None) => {
            tracing::warn!(
                room_id = %candidate.room_id.value(),
                "room no longer exists, skipping completion refresh"
            );
        }
        Err(e) => return Err(BookingApplicationError::RoomServiceError(e)),
    }

    // 4. 利用者に通知（ベストエフォート）
    notify_best_effort(
        deps,
        candidate.user_id,
        &format!(
            "Your booking {} expired because it was not confirmed in time",
            event.booking_id.value()
        ),
    )
    .await;

    Ok(true)
}

/// 期限切れスイーパーの常駐ループ
///
/// プロセス終了まで`interval`ごとに掃引を実行する。
/// シャットダウン信号は掃引間の待機を即座に打ち切る。
/// 実行中の掃引パスは中断せず、完了してからループを抜ける
/// （selectが競合させるのは待機のみで、掃引本体はブランチ内で完走する）。
pub async fn run_expiry_sweeper(
    deps: ServiceDependencies,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "expiry sweeper started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                match sweep_expired(&deps, Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => {
                        tracing::info!(expired = count, "expiry sweep finished");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "expiry sweep failed");
                    }
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("expiry sweeper shutting down");
                break;
            }
        }
    }
}
