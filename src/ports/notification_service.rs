use crate::domain::value_objects::UserId;
use async_trait::async_trait;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 通知サービスポート
///
/// 利用者・オーナーへの通知配信メカニズムを抽象化する。
/// 実装はメール、SMS、プッシュ通知などが考えられる。
///
/// 呼び出し側はfire-and-forgetで扱うこと：
/// 通知の失敗はログに記録するのみで、予約の状態変更を失敗させてはならない。
#[allow(dead_code)]
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// 利用者（またはオーナー）にメッセージを送信する
    async fn notify(&self, user_id: UserId, message: &str) -> Result<()>;
}
