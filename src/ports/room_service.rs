use crate::domain::value_objects::{OwnerId, RoomId};
use async_trait::async_trait;
use rust_decimal::Decimal;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 部屋情報（予約コンテキストが必要とする属性のみ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// ベッド数
    pub capacity: u32,
    /// 課金期間（30日）あたりの価格
    pub price_per_period: Decimal,
    /// 部屋の所有者
    pub owner_id: OwnerId,
}

/// 部屋サービスポート
///
/// 予約コンテキストと物件管理コンテキストの境界を維持する。
/// 予約コンテキストはRoomIdと容量・価格・オーナーのみを知り、
/// 物件の詳細（写真、説明、所在地など）は知らない。
#[allow(dead_code)]
#[async_trait]
pub trait RoomService: Send + Sync {
    /// 部屋の容量・価格・オーナーを取得する
    ///
    /// 予約作成前のバリデーションと請求額計算に使用される。
    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomInfo>>;

    /// 部屋の満室フラグを設定する
    ///
    /// isCompletedは導出値：占有者数が容量に達したときtrue。
    /// 承認および予約終了（キャンセル・失効）のたびに再計算される。
    async fn set_completed(&self, room_id: RoomId, completed: bool) -> Result<()>;
}
