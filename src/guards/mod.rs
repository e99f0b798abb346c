pub mod auth;

pub use auth::{AdminGuard, AuthGuard, StaffGuard};
