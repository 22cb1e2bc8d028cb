pub mod booking_store;
pub mod notification_service;
pub mod payment_provider;
pub mod room_service;

#[allow(unused_imports)]
pub use booking_store::BookingStore;
#[allow(unused_imports)]
pub use notification_service::NotificationService;
#[allow(unused_imports)]
pub use payment_provider::PaymentProvider;
#[allow(unused_imports)]
pub use room_service::RoomService;
