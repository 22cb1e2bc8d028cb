use crate::domain::value_objects::UserId;
use crate::ports::notification_service::{NotificationService as NotificationServiceTrait, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// NotificationServiceのインメモリ実装
///
/// 送信内容を記録してテストで検証する。`set_failing`で送信失敗を
/// 再現し、通知がベストエフォートであることを確認できる。
#[allow(dead_code)]
pub struct NotificationService {
    sent: Mutex<Vec<(UserId, String)>>,
    failing: Mutex<bool>,
}

#[allow(dead_code)]
impl NotificationService {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    /// テスト用に以後の送信を失敗させる
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// テスト用に送信済み通知を読み出す
    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn notify(&self, user_id: UserId, message: &str) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err("notification channel unavailable".into());
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id, message.to_string()));
        Ok(())
    }
}
