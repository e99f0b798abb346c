use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{Booking, CreateReviewDto, Review, Role, Tour, UpdateReviewDto};
use crate::guards::AuthGuard;
use crate::services::RatingAggregator;
use crate::utils::{page_window, validate_rating, ApiError, ApiResponse};

/// Preconditions for writing a review, including the booking gate:
/// only users who booked this tour may review it. The create route
/// runs this before any insert, so a rejected request never reaches
/// the store or the rating aggregator.
fn authorize_review_creation(
    role: Role,
    rating: i32,
    body: &str,
    booking: Option<&Booking>,
) -> Result<(), ApiError> {
    if role != Role::User {
        return Err(ApiError::forbidden("Only customers can review tours"));
    }
    if !validate_rating(rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    if body.trim().is_empty() {
        return Err(ApiError::bad_request("A review cannot be empty"));
    }
    if booking.is_none() {
        return Err(ApiError::not_found("Cannot find booking for selected user"));
    }
    Ok(())
}

#[openapi(tag = "Review")]
#[post("/tours/<tour_id>/reviews", data = "<dto>")]
pub async fn create_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    tour_id: String,
    dto: Json<CreateReviewDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let tour_id = ObjectId::parse_str(&tour_id)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;

    let tour = db.collection::<Tour>("tours")
        .find_one(doc! { "_id": tour_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if tour.is_none() {
        return Err(ApiError::not_found("Tour not found"));
    }

    let booking = db.collection::<Booking>("bookings")
        .find_one(doc! { "tour": tour_id, "user": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    authorize_review_creation(auth.role, dto.rating, &dto.review, booking.as_ref())?;

    let review = Review {
        id: None,
        tour: tour_id,
        user: auth.user_id,
        rating: dto.rating,
        review: dto.review.trim().to_string(),
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    // The unique (tour, user) index rejects a second review for the
    // same pair; there is no overwrite path.
    let result = db.collection::<Review>("reviews")
        .insert_one(&review, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "You have already reviewed this tour"))?;

    RatingAggregator::recompute(db, tour_id)
        .await
        .map_err(|e| ApiError::internal_error(format!("Rating update error: {}", e)))?;

    let mut created = review;
    created.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Review submitted successfully".to_string(),
        serde_json::json!({ "review": created }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct TourReviewsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Review")]
#[get("/tours/<tour_id>/reviews?<query..>")]
pub async fn get_tour_reviews(
    db: &State<DbConn>,
    tour_id: String,
    query: TourReviewsQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let window = page_window(query.page, query.limit);

    let object_id = ObjectId::parse_str(&tour_id)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;

    let filter = doc! { "tour": object_id };

    let find_options = FindOptions::builder()
        .skip(window.skip)
        .limit(window.limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let reviews: Vec<Review> = db.collection::<Review>("reviews")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    let total = db.collection::<Review>("reviews")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "reviews": reviews,
        "pagination": {
            "page": window.page,
            "limit": window.limit,
            "total": total,
            "pages": (total as f64 / window.limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Review")]
#[get("/reviews/<review_id>")]
pub async fn get_review(
    db: &State<DbConn>,
    _auth: AuthGuard,
    review_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&review_id)
        .map_err(|_| ApiError::bad_request("Invalid review ID"))?;

    let review = db.collection::<Review>("reviews")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "review": review }))))
}

#[openapi(tag = "Review")]
#[patch("/reviews/<review_id>", data = "<dto>")]
pub async fn update_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    review_id: String,
    dto: Json<UpdateReviewDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&review_id)
        .map_err(|_| ApiError::bad_request("Invalid review ID"))?;

    // Pre-image capture: the affected tour id is taken from the review
    // before the mutation runs.
    let existing = db.collection::<Review>("reviews")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    if existing.user != auth.user_id && auth.role != Role::Admin {
        return Err(ApiError::forbidden("Not authorized to update this review"));
    }

    // Only rating and body are editable; tour and user are immutable.
    let mut update_doc = doc! {
        "updated_at": DateTime::now()
    };
    if let Some(rating) = dto.rating {
        if !validate_rating(rating) {
            return Err(ApiError::bad_request("Rating must be between 1 and 5"));
        }
        update_doc.insert("rating", rating);
    }
    if let Some(ref body) = dto.review {
        if body.trim().is_empty() {
            return Err(ApiError::bad_request("A review cannot be empty"));
        }
        update_doc.insert("review", body.trim());
    }

    db.collection::<Review>("reviews")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    RatingAggregator::recompute(db, existing.tour)
        .await
        .map_err(|e| ApiError::internal_error(format!("Rating update error: {}", e)))?;

    let review = db.collection::<Review>("reviews")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "review": review }))))
}

#[openapi(tag = "Review")]
#[delete("/reviews/<review_id>")]
pub async fn delete_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    review_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&review_id)
        .map_err(|_| ApiError::bad_request("Invalid review ID"))?;

    // Pre-image capture: after the delete the review is gone, so the
    // tour id must be read first.
    let review = db.collection::<Review>("reviews")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    if review.user != auth.user_id && auth.role != Role::Admin {
        return Err(ApiError::forbidden("Not authorized to delete this review"));
    }

    db.collection::<Review>("reviews")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete review: {}", e)))?;

    RatingAggregator::recompute(db, review.tour)
        .await
        .map_err(|e| ApiError::internal_error(format!("Rating update error: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Review deleted successfully".to_string(),
        serde_json::json!({}),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    fn booking_for(tour: ObjectId, user: ObjectId) -> Booking {
        Booking {
            id: None,
            tour,
            user,
            price: 497.0,
            paid: true,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn missing_booking_blocks_review_creation() {
        let err = authorize_review_creation(Role::User, 5, "Loved every day of it", None)
            .unwrap_err();
        assert_eq!(err.status, Status::NotFound);
        assert_eq!(err.message, "Cannot find booking for selected user");
    }

    #[test]
    fn booking_holder_passes_the_gate() {
        let booking = booking_for(ObjectId::new(), ObjectId::new());
        assert!(
            authorize_review_creation(Role::User, 4, "Great guides", Some(&booking)).is_ok()
        );
    }

    #[test]
    fn out_of_range_rating_rejected_even_with_booking() {
        let booking = booking_for(ObjectId::new(), ObjectId::new());
        for rating in [0, 6] {
            let err = authorize_review_creation(Role::User, rating, "ok", Some(&booking))
                .unwrap_err();
            assert_eq!(err.status, Status::BadRequest);
        }
    }

    #[test]
    fn staff_cannot_review() {
        let booking = booking_for(ObjectId::new(), ObjectId::new());
        for role in [Role::Admin, Role::LeadGuide, Role::Guide] {
            let err = authorize_review_creation(role, 5, "ok", Some(&booking)).unwrap_err();
            assert_eq!(err.status, Status::Forbidden);
        }
    }

    #[test]
    fn empty_body_rejected() {
        let booking = booking_for(ObjectId::new(), ObjectId::new());
        let err = authorize_review_creation(Role::User, 3, "   ", Some(&booking)).unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
    }
}
