use crate::domain::value_objects::{OwnerId, RoomId};
use crate::ports::room_service::{Result, RoomInfo, RoomService as RoomServiceTrait};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

/// RoomServiceのPostgreSQL実装
///
/// 物件管理コンテキストのroomsテーブルを読み取り、満室フラグを更新する。
/// 予約側からは容量・請求期間単価・オーナーだけを参照する。
#[allow(dead_code)]
pub struct RoomService {
    pool: PgPool,
}

#[allow(dead_code)]
impl RoomService {
    /// PostgreSQLコネクションプールから新しいRoomServiceを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomServiceTrait for RoomService {
    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomInfo>> {
        let row = sqlx::query(
            r#"
            SELECT capacity, price_per_period, owner_id
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id.value())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let capacity: i32 = row.get("capacity");
                Ok(Some(RoomInfo {
                    capacity: capacity as u32,
                    price_per_period: row.get::<Decimal, _>("price_per_period"),
                    owner_id: OwnerId::from_uuid(row.get("owner_id")),
                }))
            }
            None => Ok(None),
        }
    }

    async fn set_completed(&self, room_id: RoomId, completed: bool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE rooms
            SET is_completed = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(room_id.value())
        .bind(completed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
