use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

/// A purchase record. Holding one gates the user's ability to review
/// the tour. At most one booking per (tour, user) pair.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tour: ObjectId,
    pub user: ObjectId,
    pub price: f64,
    pub paid: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateBookingDto {
    pub tour: String,
    pub user: String,
    pub price: f64,
    pub paid: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateBookingDto {
    pub price: Option<f64>,
    pub paid: Option<bool>,
}
