use crate::domain::booking::{Booking, BookingStatus, PaymentMethod};
use crate::domain::value_objects::{
    BookingId, OwnerId, PaymentSessionId, RoomId, StayPeriod, UserId,
};
use crate::ports::booking_store::{BookingStore as BookingStoreTrait, ReserveError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// PostgreSQLの行データをBookingに変換する
///
/// ステータスと支払方法の文字列変換、滞在期間の再構築で
/// エラーハンドリングを行う。
fn map_row_to_booking(row: &PgRow) -> Result<Booking> {
    let status_str: &str = row.get("status");
    let status = BookingStatus::from_str(status_str)
        .map_err(|e| invalid_data(format!("invalid booking status: {}", e)))?;

    let method_str: &str = row.get("payment_method");
    let payment_method = PaymentMethod::from_str(method_str)
        .map_err(|e| invalid_data(format!("invalid payment method: {}", e)))?;

    let start_date: NaiveDate = row.get("start_date");
    let end_date: NaiveDate = row.get("end_date");
    let period = StayPeriod::new(start_date, end_date)
        .map_err(|_| invalid_data(format!("invalid stay period: {} .. {}", start_date, end_date)))?;

    let owner_id: Option<uuid::Uuid> = row.get("owner_id");
    let renews: Option<uuid::Uuid> = row.get("renews");
    let payment_session_id: Option<String> = row.get("payment_session_id");

    Ok(Booking {
        id: BookingId::from_uuid(row.get("id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        room_id: RoomId::from_uuid(row.get("room_id")),
        owner_id: owner_id.map(OwnerId::from_uuid),
        period,
        amount: row.get::<Decimal, _>("amount"),
        payment_method,
        status,
        payment_session_id: payment_session_id.map(PaymentSessionId::new),
        payment_reference: row.get("payment_reference"),
        renews: renews.map(BookingId::from_uuid),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn live_statuses() -> Vec<String> {
    [
        BookingStatus::Pending,
        BookingStatus::Paid,
        BookingStatus::Confirmed,
        BookingStatus::Renewed,
    ]
    .iter()
    .map(|s| s.as_str().to_string())
    .collect()
}

fn occupying_statuses() -> Vec<String> {
    [
        BookingStatus::Paid,
        BookingStatus::Confirmed,
        BookingStatus::Renewed,
    ]
    .iter()
    .map(|s| s.as_str().to_string())
    .collect()
}

/// BookingStoreのPostgreSQL実装
///
/// 予約を1行1予約の状態行として永続化する。
/// insert_reservedは部屋単位のアドバイザリロックで容量チェックと挿入を直列化し、
/// update_statusはWHERE句にステータス条件を含めたUPDATEでCASを実現する。
#[allow(dead_code)]
pub struct BookingStore {
    pool: PgPool,
}

#[allow(dead_code)]
impl BookingStore {
    /// PostgreSQLコネクションプールから新しいBookingStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStoreTrait for BookingStore {
    /// 容量チェックと同一トランザクションで予約を挿入する
    ///
    /// 同じ部屋への並行挿入はpg_advisory_xact_lockで直列化される。
    /// ロックはトランザクション終了時に自動解放される。
    async fn insert_reserved(
        &self,
        booking: &Booking,
        capacity: u32,
    ) -> std::result::Result<(), ReserveError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReserveError::Store(Box::new(e)))?;

        // 部屋単位の直列化。他の部屋への挿入はブロックしない
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(booking.room_id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| ReserveError::Store(Box::new(e)))?;

        let holders: Vec<uuid::Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT user_id
            FROM bookings
            WHERE room_id = $1
              AND status = ANY($2)
              AND start_date < $3
              AND $4 < end_date
            "#,
        )
        .bind(booking.room_id.value())
        .bind(live_statuses())
        .bind(booking.period.end())
        .bind(booking.period.start())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| ReserveError::Store(Box::new(e)))?;

        if holders.contains(&booking.user_id.value()) {
            return Err(ReserveError::AlreadyHeld);
        }
        if holders.len() as u32 >= capacity {
            return Err(ReserveError::CapacityExceeded);
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id,
                user_id,
                room_id,
                owner_id,
                start_date,
                end_date,
                amount,
                payment_method,
                status,
                payment_session_id,
                payment_reference,
                renews,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(booking.id.value())
        .bind(booking.user_id.value())
        .bind(booking.room_id.value())
        .bind(booking.owner_id.map(|o| o.value()))
        .bind(booking.period.start())
        .bind(booking.period.end())
        .bind(booking.amount)
        .bind(booking.payment_method.as_str())
        .bind(booking.status.as_str())
        .bind(booking.payment_session_id.as_ref().map(|s| s.as_str()))
        .bind(booking.payment_reference.as_deref())
        .bind(booking.renews.map(|r| r.value()))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| ReserveError::Store(Box::new(e)))?;

        tx.commit()
            .await
            .map_err(|e| ReserveError::Store(Box::new(e)))?;

        Ok(())
    }

    /// ステータスのcompare-and-swap遷移
    ///
    /// WHERE句のステータス条件とRETURNINGにより、一致した場合のみ
    /// 更新後の行を返す。不一致なら行は更新されず`None`を返す。
    async fn update_status(
        &self,
        booking_id: BookingId,
        expected: &[BookingStatus],
        updated: &Booking,
    ) -> Result<Option<Booking>> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();

        let row = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3,
                payment_reference = $4,
                updated_at = $5
            WHERE id = $1
              AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(booking_id.value())
        .bind(expected)
        .bind(updated.status.as_str())
        .bind(updated.payment_reference.as_deref())
        .bind(updated.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }

    async fn attach_payment_session(
        &self,
        booking_id: BookingId,
        session_id: &PaymentSessionId,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET payment_session_id = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(booking_id.value())
        .bind(session_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }

    async fn find_by_payment_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE payment_session_id = $1")
            .bind(session_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }

    async fn find_live_for_room(
        &self,
        room_id: RoomId,
        period: &StayPeriod,
    ) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM bookings
            WHERE room_id = $1
              AND status = ANY($2)
              AND start_date < $3
              AND $4 < end_date
            "#,
        )
        .bind(room_id.value())
        .bind(live_statuses())
        .bind(period.end())
        .bind(period.start())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_booking).collect()
    }

    async fn latest_for_user_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT *
            FROM bookings
            WHERE user_id = $1
              AND room_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.value())
        .bind(room_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }

    async fn find_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM bookings
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_booking).collect()
    }

    async fn find_pending_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM bookings
            WHERE owner_id = $1
              AND status = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id.value())
        .bind(BookingStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_booking).collect()
    }

    async fn find_expiry_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM bookings
            WHERE status = $1
              AND created_at <= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(BookingStatus::Pending.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_booking).collect()
    }

    async fn count_active_occupants(&self, room_id: RoomId, on: NaiveDate) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT user_id)
            FROM bookings
            WHERE room_id = $1
              AND status = ANY($2)
              AND start_date <= $3
              AND $3 < end_date
            "#,
        )
        .bind(room_id.value())
        .bind(occupying_statuses())
        .bind(on)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u32)
    }
}
