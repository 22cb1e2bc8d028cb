mod booking_service;
mod errors;
mod expiry_sweeper;
mod occupancy;
mod payment;

#[allow(unused_imports)]
pub use booking_service::{
    BookingPolicy, ServiceDependencies, bookings_for_user, cancel_booking, confirm_booking,
    create_cash_booking, latest_booking, pending_bookings_for_owner, renew_booking,
};
#[allow(unused_imports)]
pub use errors::{BookingApplicationError, Result};
#[allow(unused_imports)]
pub use expiry_sweeper::{DEFAULT_SWEEP_INTERVAL, run_expiry_sweeper, sweep_expired};
#[allow(unused_imports)]
pub use occupancy::{can_reserve, refresh_room_completion};
#[allow(unused_imports)]
pub use payment::{begin_online_payment, complete_payment};
