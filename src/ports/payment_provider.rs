use crate::domain::value_objects::PaymentSessionId;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// プロバイダ側で作成されたチェックアウトセッションのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: PaymentSessionId,
    /// 利用者をリダイレクトする決済ページのURL
    pub redirect_url: String,
}

/// プロバイダ側のセッション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSessionStatus {
    /// 決済未完了
    Open,
    /// 決済完了
    Completed,
    /// プロバイダ側で失効
    Expired,
}

/// プロバイダから取得したセッションの照会結果
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    pub status: ProviderSessionStatus,
    /// 決済完了時のみ設定されるトランザクションID
    pub transaction_id: Option<String>,
    pub amount: Decimal,
}

/// 決済プロバイダポート
///
/// 外部決済プロバイダとの通信を抽象化する。
/// 呼び出しは非同期I/Oであり、実装はタイムアウトを設定すべき。
/// アカウント管理やWebhook署名検証はこのポートの責務外。
#[allow(dead_code)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// チェックアウトセッションを作成する
    ///
    /// metadataには予約IDなどの照合用情報を渡す。
    async fn create_checkout_session(
        &self,
        amount: Decimal,
        currency: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: &serde_json::Value,
    ) -> Result<CheckoutSession>;

    /// セッションの現在状態をプロバイダに照会する
    ///
    /// completePaymentでの決済完了確認に使用される。
    /// 存在しないセッションは`None`を返す。
    async fn retrieve_session(&self, session_id: &PaymentSessionId)
        -> Result<Option<ProviderSession>>;
}
