use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

/// A rating + comment left by a user for a tour they booked.
/// `tour` and `user` are immutable after creation; at most one review
/// exists per (tour, user) pair (unique index, see db::init).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tour: ObjectId,
    pub user: ObjectId,
    pub rating: i32, // 1-5
    pub review: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateReviewDto {
    pub rating: i32,
    pub review: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateReviewDto {
    pub rating: Option<i32>,
    pub review: Option<String>,
}
