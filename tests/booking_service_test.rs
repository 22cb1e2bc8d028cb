use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rusty_lodging_ddd::adapters::mock::{
    BookingStore, NotificationService, PaymentProvider, RoomService,
};
use rusty_lodging_ddd::application::booking::{
    BookingApplicationError, BookingPolicy, ServiceDependencies, bookings_for_user, cancel_booking,
    confirm_booking, create_cash_booking, latest_booking, pending_bookings_for_owner,
    renew_booking,
};
use rusty_lodging_ddd::domain::booking::{BookingStatus, PaymentMethod};
use rusty_lodging_ddd::domain::commands::*;
use rusty_lodging_ddd::domain::value_objects::*;
use rusty_lodging_ddd::ports::booking_store::BookingStore as BookingStoreTrait;
use rusty_lodging_ddd::ports::room_service::RoomInfo;
use std::sync::Arc;

// ============================================================================
// テストセットアップ
// ============================================================================

struct TestContext {
    deps: ServiceDependencies,
    store: Arc<BookingStore>,
    rooms: Arc<RoomService>,
    notifications: Arc<NotificationService>,
    room_id: RoomId,
    owner_id: OwnerId,
}

/// 容量と請求期間単価を指定して部屋1室のテスト環境を構築する
fn setup(capacity: u32, price_per_period: Decimal) -> TestContext {
    let store = Arc::new(BookingStore::new());
    let rooms = Arc::new(RoomService::new());
    let payments = Arc::new(PaymentProvider::new());
    let notifications = Arc::new(NotificationService::new());

    let room_id = RoomId::new();
    let owner_id = OwnerId::new();
    rooms.add_room(
        room_id,
        RoomInfo {
            capacity,
            price_per_period,
            owner_id,
        },
    );

    let deps = ServiceDependencies {
        store: store.clone(),
        rooms: rooms.clone(),
        payments,
        notifications: notifications.clone(),
        policy: BookingPolicy::default(),
    };

    TestContext {
        deps,
        store,
        rooms,
        notifications,
        room_id,
        owner_id,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn period(start: NaiveDate, end: NaiveDate) -> StayPeriod {
    StayPeriod::new(start, end).unwrap()
}

fn cash_cmd(user_id: UserId, room_id: RoomId, p: StayPeriod) -> CreateCashBooking {
    CreateCashBooking {
        user_id,
        room_id,
        period: p,
        requested_at: Utc::now(),
    }
}

// ============================================================================
// 現地払い予約の作成
// ============================================================================

#[tokio::test]
async fn test_create_cash_booking_success() {
    let ctx = setup(2, Decimal::new(300, 0));
    let user_id = UserId::new();
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    let booking = create_cash_booking(&ctx.deps, cash_cmd(user_id, ctx.room_id, p))
        .await
        .expect("cash booking should succeed");

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_method, PaymentMethod::CashOnArrival);
    assert_eq!(booking.owner_id, Some(ctx.owner_id));
    // 300 / 30 * 10泊 = 100.00
    assert_eq!(booking.amount, Decimal::new(10000, 2));
    assert!(booking.payment_session_id.is_none());

    // オーナーに通知が届く
    assert_eq!(ctx.notifications.sent_count(), 1);
    let (recipient, _) = &ctx.notifications.sent()[0];
    assert_eq!(recipient.value(), ctx.owner_id.value());
}

#[tokio::test]
async fn test_create_cash_booking_unknown_room() {
    let ctx = setup(2, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    let result = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), RoomId::new(), p)).await;

    assert!(matches!(result, Err(BookingApplicationError::RoomNotFound)));
}

#[tokio::test]
async fn test_capacity_is_never_exceeded() {
    let ctx = setup(1, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p))
        .await
        .expect("first booking should succeed");

    let second = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p)).await;

    assert!(matches!(second, Err(BookingApplicationError::Conflict(_))));
    assert_eq!(ctx.store.len(), 1);
}

#[tokio::test]
async fn test_pending_booking_holds_capacity() {
    // 未承認（Pending）のままでも容量を消費する
    let ctx = setup(1, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    let first = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p))
        .await
        .expect("first booking should succeed");
    assert_eq!(first.status, BookingStatus::Pending);

    let second = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p)).await;
    assert!(matches!(second, Err(BookingApplicationError::Conflict(_))));
}

#[tokio::test]
async fn test_same_user_cannot_hold_two_overlapping_bookings() {
    let ctx = setup(5, Decimal::new(300, 0));
    let user_id = UserId::new();
    let p1 = period(date(2026, 9, 1), date(2026, 9, 11));
    let p2 = period(date(2026, 9, 5), date(2026, 9, 15));

    create_cash_booking(&ctx.deps, cash_cmd(user_id, ctx.room_id, p1))
        .await
        .expect("first booking should succeed");

    let second = create_cash_booking(&ctx.deps, cash_cmd(user_id, ctx.room_id, p2)).await;
    assert!(matches!(second, Err(BookingApplicationError::Conflict(_))));
}

#[tokio::test]
async fn test_disjoint_periods_do_not_contend() {
    // 半開区間なので、前の予約のend == 次の予約のstartは重ならない
    let ctx = setup(1, Decimal::new(300, 0));
    let p1 = period(date(2026, 9, 1), date(2026, 9, 11));
    let p2 = period(date(2026, 9, 11), date(2026, 9, 21));

    create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p1))
        .await
        .expect("first booking should succeed");
    create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p2))
        .await
        .expect("non-overlapping booking should succeed");

    assert_eq!(ctx.store.len(), 2);
}

#[tokio::test]
async fn test_concurrent_bookings_admit_exactly_one() {
    // 残り1ベッドに対する並行リクエストは、どちらか一方だけが成功する
    let ctx = setup(1, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    let (a, b) = tokio::join!(
        create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p)),
        create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|&&ok| ok).count();
    assert_eq!(successes, 1);
    assert_eq!(ctx.store.len(), 1);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_booking() {
    let ctx = setup(2, Decimal::new(300, 0));
    ctx.notifications.set_failing(true);
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    let result = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p)).await;

    assert!(result.is_ok());
    assert_eq!(ctx.notifications.sent_count(), 0);
}

// ============================================================================
// 承認とキャンセル
// ============================================================================

#[tokio::test]
async fn test_confirm_booking_by_owner() {
    let ctx = setup(1, Decimal::new(300, 0));
    let user_id = UserId::new();
    let p = period(date(2026, 9, 1), date(2026, 9, 11));

    let booking = create_cash_booking(&ctx.deps, cash_cmd(user_id, ctx.room_id, p))
        .await
        .unwrap();

    let confirmed = confirm_booking(
        &ctx.deps,
        ConfirmBooking {
            booking_id: booking.id,
            caller_owner_id: ctx.owner_id,
            confirmed_at: date(2026, 9, 1).and_hms_opt(12, 0, 0).unwrap().and_utc(),
        },
    )
    .await
    .expect("confirm should succeed");

    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    // 容量1の部屋が滞在日に占有されたので満室フラグが立つ
    assert!(ctx.rooms.is_completed(ctx.room_id));
    // 利用者に承認通知が届く（作成時のオーナー通知と合わせて2件）
    assert_eq!(ctx.notifications.sent_count(), 2);
}

#[tokio::test]
async fn test_confirm_rejects_non_owner() {
    let ctx = setup(1, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));
    let booking = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p))
        .await
        .unwrap();

    let result = confirm_booking(
        &ctx.deps,
        ConfirmBooking {
            booking_id: booking.id,
            caller_owner_id: OwnerId::new(),
            confirmed_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(BookingApplicationError::Unauthorized)));
}

#[tokio::test]
async fn test_cancel_releases_the_hold() {
    let ctx = setup(1, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));
    let booking = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p))
        .await
        .unwrap();

    cancel_booking(
        &ctx.deps,
        CancelBooking {
            booking_id: booking.id,
            caller_owner_id: ctx.owner_id,
            cancelled_at: Utc::now(),
        },
    )
    .await
    .expect("cancel should succeed");

    // キャンセルでホールドが解放され、別の利用者が同じ期間を予約できる
    create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p))
        .await
        .expect("hold should be released after cancellation");
}

#[tokio::test]
async fn test_confirm_after_cancel_is_conflict() {
    let ctx = setup(1, Decimal::new(300, 0));
    let p = period(date(2026, 9, 1), date(2026, 9, 11));
    let booking = create_cash_booking(&ctx.deps, cash_cmd(UserId::new(), ctx.room_id, p))
        .await
        .unwrap();

    cancel_booking(
        &ctx.deps,
        CancelBooking {
            booking_id: booking.id,
            caller_owner_id: ctx.owner_id,
            cancelled_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let result = confirm_booking(
        &ctx.deps,
        ConfirmBooking {
            booking_id: booking.id,
            caller_owner_id: ctx.owner_id,
            confirmed_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(BookingApplicationError::Conflict(_))));
}

// ============================================================================
// 更新（延長契約）
// ============================================================================

/// 今日を起点に未来の滞在期間を組み立てる
fn future_period(start_in_days: i64, nights: i64) -> StayPeriod {
    let today = Utc::now().date_naive();
    period(
        today + Duration::days(start_in_days),
        today + Duration::days(start_in_days + nights),
    )
}

async fn confirmed_booking(ctx: &TestContext, user_id: UserId, p: StayPeriod) -> BookingId {
    let booking = create_cash_booking(&ctx.deps, cash_cmd(user_id, ctx.room_id, p))
        .await
        .unwrap();
    confirm_booking(
        &ctx.deps,
        ConfirmBooking {
            booking_id: booking.id,
            caller_owner_id: ctx.owner_id,
            confirmed_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    booking.id
}

#[tokio::test]
async fn test_renew_issues_linked_pending_booking() {
    let ctx = setup(1, Decimal::new(300, 0));
    let user_id = UserId::new();
    let current_period = future_period(-5, 30);
    let booking_id = confirmed_booking(&ctx, user_id, current_period).await;

    let new_period = future_period(26, 30);
    let new_booking = renew_booking(
        &ctx.deps,
        RenewBooking {
            booking_id,
            caller_user_id: user_id,
            new_period,
            requested_at: Utc::now(),
        },
    )
    .await
    .expect("renewal should succeed");

    // 新しい予約はPendingで旧予約にリンクする
    assert_eq!(new_booking.status, BookingStatus::Pending);
    assert_eq!(new_booking.renews, Some(booking_id));
    assert_eq!(new_booking.period, new_period);

    // 旧予約はRenewedに遷移し、日付は書き換えられない
    let old = ctx.deps.store.get(booking_id).await.unwrap().unwrap();
    assert_eq!(old.status, BookingStatus::Renewed);
    assert_eq!(old.period, current_period);
}

#[tokio::test]
async fn test_renew_rejects_period_not_strictly_after_current() {
    let ctx = setup(1, Decimal::new(300, 0));
    let user_id = UserId::new();
    let booking_id = confirmed_booking(&ctx, user_id, future_period(-5, 30)).await;

    // 現予約の期間と重なる更新は拒否される
    let result = renew_booking(
        &ctx.deps,
        RenewBooking {
            booking_id,
            caller_user_id: user_id,
            new_period: future_period(10, 30),
            requested_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(BookingApplicationError::Validation(_))
    ));
}

#[tokio::test]
async fn test_renew_rejects_other_users() {
    let ctx = setup(1, Decimal::new(300, 0));
    let booking_id = confirmed_booking(&ctx, UserId::new(), future_period(-5, 30)).await;

    let result = renew_booking(
        &ctx.deps,
        RenewBooking {
            booking_id,
            caller_user_id: UserId::new(),
            new_period: future_period(26, 30),
            requested_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(BookingApplicationError::Unauthorized)));
}

#[tokio::test]
async fn test_renew_rejects_pending_booking() {
    let ctx = setup(1, Decimal::new(300, 0));
    let user_id = UserId::new();
    let p = future_period(-5, 30);
    let booking = create_cash_booking(&ctx.deps, cash_cmd(user_id, ctx.room_id, p))
        .await
        .unwrap();

    let result = renew_booking(
        &ctx.deps,
        RenewBooking {
            booking_id: booking.id,
            caller_user_id: user_id,
            new_period: future_period(26, 30),
            requested_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(result, Err(BookingApplicationError::Conflict(_))));
}

// ============================================================================
// クエリ
// ============================================================================

#[tokio::test]
async fn test_latest_booking_returns_most_recent() {
    let ctx = setup(1, Decimal::new(300, 0));
    let user_id = UserId::new();
    let booking_id = confirmed_booking(&ctx, user_id, future_period(-5, 30)).await;

    let new_booking = renew_booking(
        &ctx.deps,
        RenewBooking {
            booking_id,
            caller_user_id: user_id,
            new_period: future_period(26, 30),
            requested_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let latest = latest_booking(&ctx.deps, user_id, ctx.room_id)
        .await
        .unwrap()
        .expect("latest booking should exist");
    assert_eq!(latest.id, new_booking.id);
}

#[tokio::test]
async fn test_bookings_for_user_lists_history() {
    let ctx = setup(5, Decimal::new(300, 0));
    let user_id = UserId::new();

    create_cash_booking(
        &ctx.deps,
        cash_cmd(user_id, ctx.room_id, future_period(1, 10)),
    )
    .await
    .unwrap();
    create_cash_booking(
        &ctx.deps,
        cash_cmd(user_id, ctx.room_id, future_period(20, 10)),
    )
    .await
    .unwrap();
    // 他の利用者の予約は含まれない
    create_cash_booking(
        &ctx.deps,
        cash_cmd(UserId::new(), ctx.room_id, future_period(40, 10)),
    )
    .await
    .unwrap();

    let history = bookings_for_user(&ctx.deps, user_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|b| b.user_id == user_id));
}

#[tokio::test]
async fn test_pending_bookings_for_owner_excludes_confirmed() {
    let ctx = setup(5, Decimal::new(300, 0));

    confirmed_booking(&ctx, UserId::new(), future_period(1, 10)).await;
    let pending = create_cash_booking(
        &ctx.deps,
        cash_cmd(UserId::new(), ctx.room_id, future_period(20, 10)),
    )
    .await
    .unwrap();

    let awaiting = pending_bookings_for_owner(&ctx.deps, ctx.owner_id)
        .await
        .unwrap();
    assert_eq!(awaiting.len(), 1);
    assert_eq!(awaiting[0].id, pending.id);
}
