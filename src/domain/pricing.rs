#![allow(dead_code)]

use rust_decimal::Decimal;

use super::StayPeriod;

/// 課金期間（日数）
///
/// 部屋の価格は30日あたりの金額として登録される。
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// 純粋関数：滞在期間に応じた請求額を計算する
///
/// ビジネスルール：
/// - 課金期間（30日）あたりの価格を日割りする
/// - 小数点以下2桁に丸める（通貨の最小単位）
///
/// 例：300/30日の部屋に10泊 → 100.00
pub fn amount_for_period(price_per_period: Decimal, period: &StayPeriod) -> Decimal {
    let nights = Decimal::from(period.nights());
    (price_per_period / Decimal::from(BILLING_PERIOD_DAYS) * nights).round_dp(2)
}
