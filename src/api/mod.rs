pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

#[allow(unused_imports)]
pub use error::ApiError;
#[allow(unused_imports)]
pub use router::create_router;
#[allow(unused_imports)]
pub use types::*;
