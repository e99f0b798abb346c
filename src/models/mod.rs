pub mod user;
pub mod tour;
pub mod review;
pub mod booking;

pub use user::*;
pub use tour::*;
pub use review::*;
pub use booking::*;
