use thiserror::Error;

/// 予約管理アプリケーション層のエラー
///
/// エラー分類：
/// - Validation / Conflict / NotFound / Unauthorized はクライアントエラーとして呼び出し元に返す
/// - Upstream はリトライ可能なサーバーエラー（決済が絡むため握り潰さない）
/// - StoreError / RoomServiceError はシステム障害
#[derive(Debug, Error)]
pub enum BookingApplicationError {
    /// 入力が不正（期間の逆転、請求額の範囲外など）
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 不正な状態遷移、または予約競合の敗者
    ///
    /// 呼び出し元は現在の状態を再取得できる。自動リトライはしない。
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 予約が見つからない
    #[error("Booking not found")]
    BookingNotFound,

    /// 部屋が見つからない
    #[error("Room not found")]
    RoomNotFound,

    /// 決済セッションが見つからない
    #[error("Payment session not found")]
    PaymentSessionNotFound,

    /// 呼び出し元に対象予約／部屋の権限がない
    #[error("Caller is not authorized for this booking")]
    Unauthorized,

    /// 決済プロバイダが到達不能、または想定外の応答を返した
    #[error("Payment provider error")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 予約ストアのエラー
    #[error("Booking store error")]
    StoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 部屋サービスのエラー
    #[error("Room service error")]
    RoomServiceError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, BookingApplicationError>;
