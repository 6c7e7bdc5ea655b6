pub mod checkin;
pub mod payment;
pub mod plan;
pub mod staff;
pub mod user;

pub use checkin::*;
pub use payment::*;
pub use plan::*;
pub use staff::*;
pub use user::*;
