use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rusty_lodging_ddd::adapters::mock::{
    BookingStore, NotificationService, PaymentProvider, RoomService,
};
use rusty_lodging_ddd::application::booking::{
    BookingPolicy, ServiceDependencies, confirm_booking, create_cash_booking, run_expiry_sweeper,
    sweep_expired,
};
use rusty_lodging_ddd::domain::booking::{self, BookingStatus, PaymentMethod};
use rusty_lodging_ddd::domain::commands::{ConfirmBooking, CreateCashBooking};
use rusty_lodging_ddd::domain::value_objects::*;
use rusty_lodging_ddd::ports::booking_store::BookingStore as BookingStoreTrait;
use rusty_lodging_ddd::ports::room_service::RoomInfo;
use std::sync::Arc;
use tokio::sync::watch;

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

fn setup(capacity: u32) -> TestContext {
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
            price_per_period: Decimal::new(300, 0),
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

fn future_period(start_in_days: i64, nights: i64) -> StayPeriod {
    let today = Utc::now().date_naive();
    StayPeriod::new(
        today + Duration::days(start_in_days),
        today + Duration::days(start_in_days + nights),
    )
    .unwrap()
}

/// 指定時刻にリクエストされたPending予約を作成する
async fn pending_booking_at(
    ctx: &TestContext,
    requested_at: chrono::DateTime<Utc>,
) -> BookingId {
    let booking = create_cash_booking(
        &ctx.deps,
        CreateCashBooking {
            user_id: UserId::new(),
            room_id: ctx.room_id,
            period: future_period(5, 10),
            requested_at,
        },
    )
    .await
    .expect("booking should succeed");
    booking.id
}

async fn status_of(ctx: &TestContext, booking_id: BookingId) -> BookingStatus {
    ctx.store.get(booking_id).await.unwrap().unwrap().status
}

// ============================================================================
// 掃引の正しさ
// ============================================================================

#[tokio::test]
async fn test_sweep_expires_pending_past_ttl() {
    let ctx = setup(5);
    let now = Utc::now();
    let booking_id = pending_booking_at(&ctx, now - Duration::days(3)).await;

    let expired = sweep_expired(&ctx.deps, now).await.unwrap();

    assert_eq!(expired, 1);
    assert_eq!(status_of(&ctx, booking_id).await, BookingStatus::Expired);

    // 作成時のオーナー通知に加えて、利用者への失効通知が届く
    let sent = ctx.notifications.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].1.contains("expired"));
}

#[tokio::test]
async fn test_sweep_skips_fresh_pending() {
    let ctx = setup(5);
    let now = Utc::now();
    let booking_id = pending_booking_at(&ctx, now - Duration::days(1)).await;

    let expired = sweep_expired(&ctx.deps, now).await.unwrap();

    assert_eq!(expired, 0);
    assert_eq!(status_of(&ctx, booking_id).await, BookingStatus::Pending);
}

#[tokio::test]
async fn test_sweep_expires_exactly_at_ttl() {
    // TTLは「ちょうど2日経過」を含む（now - created_at ≥ ttl）
    let ctx = setup(5);
    let now = Utc::now();
    let booking_id = pending_booking_at(&ctx, now - Duration::days(2)).await;

    let expired = sweep_expired(&ctx.deps, now).await.unwrap();

    assert_eq!(expired, 1);
    assert_eq!(status_of(&ctx, booking_id).await, BookingStatus::Expired);
}

#[tokio::test]
async fn test_confirmed_booking_is_never_expired() {
    let ctx = setup(5);
    let now = Utc::now();
    let booking_id = pending_booking_at(&ctx, now - Duration::days(3)).await;

    // 期限超過後でも、掃引より先に承認されていれば失効しない
    confirm_booking(
        &ctx.deps,
        ConfirmBooking {
            booking_id,
            caller_owner_id: ctx.owner_id,
            confirmed_at: now,
        },
    )
    .await
    .unwrap();

    let expired = sweep_expired(&ctx.deps, now).await.unwrap();

    assert_eq!(expired, 0);
    assert_eq!(status_of(&ctx, booking_id).await, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_expiry_releases_the_hold() {
    let ctx = setup(1);
    let now = Utc::now();
    pending_booking_at(&ctx, now - Duration::days(3)).await;

    sweep_expired(&ctx.deps, now).await.unwrap();

    // 失効でホールドが解放され、同じ期間を別の利用者が予約できる
    create_cash_booking(
        &ctx.deps,
        CreateCashBooking {
            user_id: UserId::new(),
            room_id: ctx.room_id,
            period: future_period(5, 10),
            requested_at: now,
        },
    )
    .await
    .expect("hold should be released after expiry");
}

#[tokio::test]
async fn test_sweep_continues_past_a_failing_item() {
    let ctx = setup(5);
    let now = Utc::now();

    // 部屋が既に存在しない予約を直接登録する（満室フラグ再計算はスキップされる）
    let orphan_period = future_period(5, 10);
    let (orphan, _) = booking::request_booking(
        UserId::new(),
        RoomId::new(),
        Some(OwnerId::new()),
        orphan_period,
        Decimal::new(10000, 2),
        Decimal::new(1_000_000, 0),
        PaymentMethod::CashOnArrival,
        None,
        now - Duration::days(3),
    )
    .unwrap();
    let orphan_id = orphan.id;
    ctx.store.insert_raw(orphan);

    let normal_id = pending_booking_at(&ctx, now - Duration::days(3)).await;

    let expired = sweep_expired(&ctx.deps, now).await.unwrap();

    // 孤児予約が他の予約の掃引を妨げない
    assert_eq!(expired, 2);
    assert_eq!(status_of(&ctx, orphan_id).await, BookingStatus::Expired);
    assert_eq!(status_of(&ctx, normal_id).await, BookingStatus::Expired);
}

#[tokio::test]
async fn test_sweep_notification_failure_does_not_stop_expiry() {
    let ctx = setup(5);
    let now = Utc::now();
    let first = pending_booking_at(&ctx, now - Duration::days(3)).await;
    let second = pending_booking_at(&ctx, now - Duration::days(3)).await;

    ctx.notifications.set_failing(true);
    let expired = sweep_expired(&ctx.deps, now).await.unwrap();

    assert_eq!(expired, 2);
    assert_eq!(status_of(&ctx, first).await, BookingStatus::Expired);
    assert_eq!(status_of(&ctx, second).await, BookingStatus::Expired);
}

#[tokio::test]
async fn test_expiry_refreshes_room_completion() {
    let ctx = setup(1);
    let now = Utc::now();
    let booking_id = pending_booking_at(&ctx, now - Duration::days(3)).await;

    // 容量1の部屋を承認で満室にする
    confirm_booking(
        &ctx.deps,
        ConfirmBooking {
            booking_id,
            caller_owner_id: ctx.owner_id,
            confirmed_at: now,
        },
    )
    .await
    .unwrap();
    assert!(ctx.rooms.is_completed(ctx.room_id));

    // 掃引が走っても、占有中の予約がある限り満室フラグは下がらない
    let expired = sweep_expired(&ctx.deps, now).await.unwrap();
    assert_eq!(expired, 0);
    assert!(ctx.rooms.is_completed(ctx.room_id));
}

// ============================================================================
// 常駐ループ
// ============================================================================

#[tokio::test]
async fn test_sweeper_stops_on_shutdown_signal() {
    let ctx = setup(5);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(run_expiry_sweeper(
        ctx.deps.clone(),
        std::time::Duration::from_secs(3600),
        shutdown_rx,
    ));

    shutdown_tx.send(true).unwrap();

    // 次の掃引間隔を待たずに停止する
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("sweeper should stop promptly")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_on_interval() {
    let ctx = setup(5);
    let now = Utc::now();
    let booking_id = pending_booking_at(&ctx, now - Duration::days(3)).await;

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_expiry_sweeper(
        ctx.deps.clone(),
        std::time::Duration::from_secs(3600),
        shutdown_rx,
    ));

    // 仮想時間を1時間進めると掃引が走る
    tokio::time::sleep(std::time::Duration::from_secs(3601)).await;

    assert_eq!(status_of(&ctx, booking_id).await, BookingStatus::Expired);
    handle.abort();
}
