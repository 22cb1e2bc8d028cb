use crate::domain::value_objects::RoomId;
use crate::ports::room_service::{Result, RoomInfo, RoomService as RoomServiceTrait};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// RoomServiceのインメモリ実装
///
/// テストで部屋を事前登録し、満室フラグの更新を観測するために使う。
#[allow(dead_code)]
pub struct RoomService {
    rooms: Mutex<HashMap<RoomId, RoomInfo>>,
    completed: Mutex<HashMap<RoomId, bool>>,
}

#[allow(dead_code)]
impl RoomService {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            completed: Mutex::new(HashMap::new()),
        }
    }

    /// テスト用に部屋を登録する
    pub fn add_room(&self, room_id: RoomId, info: RoomInfo) {
        self.rooms.lock().unwrap().insert(room_id, info);
    }

    /// テスト用に満室フラグを読み出す（未更新ならfalse）
    pub fn is_completed(&self, room_id: RoomId) -> bool {
        self.completed
            .lock()
            .unwrap()
            .get(&room_id)
            .copied()
            .unwrap_or(false)
    }
}

impl Default for RoomService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomServiceTrait for RoomService {
    async fn get_room(&self, room_id: RoomId) -> Result<Option<RoomInfo>> {
        Ok(self.rooms.lock().unwrap().get(&room_id).cloned())
    }

    async fn set_completed(&self, room_id: RoomId, completed: bool) -> Result<()> {
        self.completed.lock().unwrap().insert(room_id, completed);
        Ok(())
    }
}
