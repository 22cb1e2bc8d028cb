use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::value_objects::{BookingId, OwnerId, PaymentSessionId, RoomId, StayPeriod, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 予約の原子的挿入が拒否された理由
#[derive(Debug)]
pub enum ReserveError {
    /// 期間が重なるライブ予約の保持者数が部屋の容量に達している
    CapacityExceeded,
    /// 同一利用者が同じ部屋に期間の重なるライブ予約を既に保持している
    AlreadyHeld,
    /// ストア障害
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for ReserveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReserveError::CapacityExceeded => write!(f, "room capacity exceeded"),
            ReserveError::AlreadyHeld => {
                write!(f, "user already holds a live booking for this room")
            }
            ReserveError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl std::error::Error for ReserveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReserveError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// 予約ストアポート
///
/// Booking集約専用の永続化インターフェース。
/// 汎用CRUDリポジトリではなく、予約特有の保証
/// （容量チェックと挿入の原子性、ステータスのCAS遷移）を型で表現する。
/// 予約は物理削除されない。終端状態も監査用に保持される。
#[allow(dead_code)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// 容量チェックと同一の原子的単位で予約を挿入する
    ///
    /// チェック→挿入のTOCTOU競合を防ぐため、実装は
    /// トランザクション内の部屋単位の直列化（またはそれと同等の手段）で
    /// 以下を検証してから挿入しなければならない：
    /// - 期間の重なるライブ予約の保持者数（Pendingを含む）が容量未満
    /// - 同一利用者が期間の重なるライブ予約を保持していない
    async fn insert_reserved(
        &self,
        booking: &Booking,
        capacity: u32,
    ) -> std::result::Result<(), ReserveError>;

    /// ステータスのcompare-and-swap遷移
    ///
    /// 現在のステータスが`expected`のいずれかである場合のみ`updated`の内容で
    /// 行を更新する。一致しなければ`None`を返す（競合に負けた側は副作用なし）。
    /// 承認とスイーパーの失効が競合した場合、先に行を更新した側が勝つ。
    async fn update_status(
        &self,
        booking_id: BookingId,
        expected: &[BookingStatus],
        updated: &Booking,
    ) -> Result<Option<Booking>>;

    /// 決済セッションIDを予約に紐付ける
    ///
    /// プロバイダセッションと予約は1対1。セッションIDは一意制約を持つ。
    async fn attach_payment_session(
        &self,
        booking_id: BookingId,
        session_id: &PaymentSessionId,
    ) -> Result<()>;

    /// IDで予約を取得する
    async fn get(&self, booking_id: BookingId) -> Result<Option<Booking>>;

    /// 決済セッションIDで予約を取得する
    ///
    /// completePaymentの冪等性の要：同じセッションは常に同じ予約に解決される。
    async fn find_by_payment_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<Booking>>;

    /// 指定期間と重なる部屋のライブ予約を取得する
    ///
    /// 占有台帳のcan_reserve読み取り判定に使用される。
    async fn find_live_for_room(&self, room_id: RoomId, period: &StayPeriod)
        -> Result<Vec<Booking>>;

    /// 利用者×部屋の最新の予約を取得する（created_at降順の先頭）
    async fn latest_for_user_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Booking>>;

    /// 利用者の全予約を取得する（履歴表示用）
    async fn find_for_user(&self, user_id: UserId) -> Result<Vec<Booking>>;

    /// オーナーの承認待ち（Pending）予約を取得する
    async fn find_pending_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>>;

    /// 期限切れ候補を検索する
    ///
    /// status = Pending かつ created_at ≤ cutoff の予約を返す。
    /// スイーパーでのバッチ失効に使用される。
    async fn find_expiry_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// 指定日にベッドを占有している利用者数を数える
    ///
    /// Paid / Confirmed / Renewed の予約のうち期間が指定日を含むものを
    /// 利用者単位で重複排除して数える。isCompleted再計算に使用される。
    async fn count_active_occupants(&self, room_id: RoomId, on: NaiveDate) -> Result<u32>;
}
