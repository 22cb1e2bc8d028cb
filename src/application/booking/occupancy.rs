use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::value_objects::{RoomId, StayPeriod, UserId};

use super::booking_service::ServiceDependencies;
use super::errors::{BookingApplicationError, Result};

/// 部屋占有台帳：予約可否の読み取り判定
///
/// ビジネスルール：
/// - 期間の重なるライブ予約（Pendingを含む）の保持者数が容量に達していたら不可
/// - 同一利用者が同じ部屋に期間の重なるライブ予約を保持していたら不可
///
/// Pendingを容量ホールドに数えるのは、承認前の予約を二重に受け付けて
/// 後からオーバーブッキングになる競合を防ぐため。
///
/// これは読み取り専用の事前判定であり、最終的な保証は
/// `BookingStore::insert_reserved`の原子的なチェック＆挿入が与える。
pub async fn can_reserve(
    deps: &ServiceDependencies,
    room_id: RoomId,
    user_id: UserId,
    period: &StayPeriod,
    capacity: u32,
) -> Result<bool> {
    let live = deps
        .store
        .find_live_for_room(room_id, period)
        .await
        .map_err(BookingApplicationError::StoreError)?;

    if live.iter().any(|b| b.user_id == user_id) {
        return Ok(false);
    }

    let holders: HashSet<UserId> = live.iter().map(|b| b.user_id).collect();
    Ok((holders.len() as u32) < capacity)
}

/// 部屋の満室フラグ（isCompleted）を再計算して永続化する
///
/// isCompletedは導出値：指定日にベッドを占有している利用者数
/// （Paid / Confirmed / Renewed）が容量に達したときtrue。
/// 承認のたび、および予約終了（キャンセル・失効）のたびに呼び出される。
///
/// # 戻り値
/// 再計算後の満室フラグ
pub async fn refresh_room_completion(
    deps: &ServiceDependencies,
    room_id: RoomId,
    capacity: u32,
    today: NaiveDate,
) -> Result<bool> {
    let occupants = deps
        .store
        .count_active_occupants(room_id, today)
        .await
        .map_err(BookingApplicationError::StoreError)?;

    let completed = occupants >= capacity;

    deps.rooms
        .set_completed(room_id, completed)
        .await
        .map_err(BookingApplicationError::RoomServiceError)?;

    Ok(completed)
}
