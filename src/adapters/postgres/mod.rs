pub mod booking_store;
pub mod room_service;

// パブリックに型を再エクスポート
pub use booking_store::BookingStore as PostgresBookingStore;
pub use room_service::RoomService as PostgresRoomService;
