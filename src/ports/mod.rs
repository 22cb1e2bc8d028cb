#[allow(unused_imports)]
pub mod booking_store;
#[allow(unused_imports)]
pub mod notification_service;
#[allow(unused_imports)]
pub mod payment_provider;
#[allow(unused_imports)]
pub mod room_service;

#[allow(unused_imports)]
pub use booking_store::*;
#[allow(unused_imports)]
pub use notification_service::*;
#[allow(unused_imports)]
pub use payment_provider::*;
#[allow(unused_imports)]
pub use room_service::*;
