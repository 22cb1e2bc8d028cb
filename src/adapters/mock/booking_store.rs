use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::value_objects::{BookingId, OwnerId, PaymentSessionId, RoomId, StayPeriod, UserId};
use crate::ports::booking_store::{BookingStore as BookingStoreTrait, ReserveError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// BookingStoreのインメモリ実装
///
/// 全予約を単一のMutexで保護することで、insert_reservedの
/// チェック→挿入とupdate_statusのCASをプロセス内で原子的に実行する。
/// テストと開発用の配線で使用される。
#[allow(dead_code)]
pub struct BookingStore {
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

#[allow(dead_code)]
impl BookingStore {
    pub fn new() -> Self {
        Self {
            bookings: Mutex::new(HashMap::new()),
        }
    }

    /// テスト用に予約を直接登録する（容量チェックを迂回）
    pub fn insert_raw(&self, booking: Booking) {
        self.bookings.lock().unwrap().insert(booking.id, booking);
    }

    /// テスト用に予約数を数える
    pub fn len(&self) -> usize {
        self.bookings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.lock().unwrap().is_empty()
    }
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStoreTrait for BookingStore {
    /// ロック下で容量と重複保持をチェックしてから挿入する
    async fn insert_reserved(
        &self,
        booking: &Booking,
        capacity: u32,
    ) -> std::result::Result<(), ReserveError> {
        let mut bookings = self.bookings.lock().unwrap();

        let live: Vec<&Booking> = bookings
            .values()
            .filter(|b| {
                b.room_id == booking.room_id
                    && b.status.is_live()
                    && b.period.overlaps(&booking.period)
            })
            .collect();

        if live.iter().any(|b| b.user_id == booking.user_id) {
            return Err(ReserveError::AlreadyHeld);
        }

        let holders: HashSet<UserId> = live.iter().map(|b| b.user_id).collect();
        if holders.len() as u32 >= capacity {
            return Err(ReserveError::CapacityExceeded);
        }

        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    /// ロック下のcompare-and-swap
    async fn update_status(
        &self,
        booking_id: BookingId,
        expected: &[BookingStatus],
        updated: &Booking,
    ) -> Result<Option<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();

        match bookings.get(&booking_id) {
            Some(current) if expected.contains(&current.status) => {
                bookings.insert(booking_id, updated.clone());
                Ok(Some(updated.clone()))
            }
            Some(_) => Ok(None),
            None => Ok(None),
        }
    }

    async fn attach_payment_session(
        &self,
        booking_id: BookingId,
        session_id: &PaymentSessionId,
    ) -> Result<()> {
        let mut bookings = self.bookings.lock().unwrap();
        if let Some(booking) = bookings.get_mut(&booking_id) {
            booking.payment_session_id = Some(session_id.clone());
        }
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.lock().unwrap().get(&booking_id).cloned())
    }

    async fn find_by_payment_session(
        &self,
        session_id: &PaymentSessionId,
    ) -> Result<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .values()
            .find(|b| b.payment_session_id.as_ref() == Some(session_id))
            .cloned())
    }

    async fn find_live_for_room(
        &self,
        room_id: RoomId,
        period: &StayPeriod,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.room_id == room_id && b.status.is_live() && b.period.overlaps(period))
            .cloned()
            .collect())
    }

    async fn latest_for_user_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.user_id == user_id && b.room_id == room_id)
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn find_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let mut result: Vec<Booking> = self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by_key(|b| std::cmp::Reverse(b.created_at));
        Ok(result)
    }

    async fn find_pending_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>> {
        let mut result: Vec<Booking> = self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.owner_id == Some(owner_id) && b.status == BookingStatus::Pending)
            .cloned()
            .collect();
        result.sort_by_key(|b| std::cmp::Reverse(b.created_at));
        Ok(result)
    }

    async fn find_expiry_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at <= cutoff)
            .cloned()
            .collect())
    }

    async fn count_active_occupants(&self, room_id: RoomId, on: NaiveDate) -> Result<u32> {
        let occupants: HashSet<UserId> = self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.room_id == room_id && b.status.is_occupying() && b.period.contains(on))
            .map(|b| b.user_id)
            .collect();
        Ok(occupants.len() as u32)
    }
}
