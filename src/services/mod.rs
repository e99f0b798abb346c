pub mod email;
pub mod jwt;
pub mod rating;
pub mod stripe;

pub use email::EmailService;
pub use jwt::JwtService;
pub use rating::RatingAggregator;
pub use stripe::StripeService;
