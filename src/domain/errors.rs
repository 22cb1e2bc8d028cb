#![allow(dead_code)]

use super::booking::BookingStatus;

/// 予約作成のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBookingError {
    /// 請求額が許容範囲（0 ≤ amount ≤ max）の外
    AmountOutOfRange,
}

/// 決済完了遷移のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkPaidError {
    /// Pending状態ではない（既にPaid、または終端状態）
    NotPending(BookingStatus),
}

/// 承認遷移のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    /// PendingまたはPaid状態ではない
    NotAwaitingConfirmation(BookingStatus),
}

/// キャンセル遷移のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    /// 既に終端状態（Expired / Cancelled / Renewed）
    AlreadyTerminal(BookingStatus),
}

/// 期限切れ遷移のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpireError {
    /// Pending状態ではない
    NotPending(BookingStatus),
    /// TTLがまだ経過していない
    TtlNotElapsed,
}

/// 更新（延長契約）のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewError {
    /// 更新対象がPaidまたはConfirmed状態ではない
    NotRenewable(BookingStatus),
    /// 更新対象の滞在が既に終了している
    CurrentStayEnded,
    /// 新しい期間の開始日が現在の終了日より厳密に後でない
    PeriodNotAfterCurrent,
    /// 新しい請求額が許容範囲外
    AmountOutOfRange,
}

impl From<RequestBookingError> for RenewError {
    fn from(err: RequestBookingError) -> Self {
        match err {
            RequestBookingError::AmountOutOfRange => RenewError::AmountOutOfRange,
        }
    }
}
