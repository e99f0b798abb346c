use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{Booking, CreateBookingDto, Tour, UpdateBookingDto};
use crate::guards::{AuthGuard, StaffGuard};
use crate::services::StripeService;
use crate::utils::{page_window, ApiError, ApiResponse};

/// Start a Stripe Checkout session for the given tour, priced at the
/// tour's current price.
#[openapi(tag = "Booking")]
#[get("/bookings/checkout-session/<tour_id>")]
pub async fn get_checkout_session(
    db: &State<DbConn>,
    auth: AuthGuard,
    tour_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&tour_id)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;

    let tour = db.collection::<Tour>("tours")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Tour not found"))?;

    if !crate::config::Config::is_stripe_enabled() {
        return Err(ApiError::internal_error("Payments are not configured"));
    }

    let base_url = crate::config::Config::public_url();
    let session = StripeService::create_checkout_session(
        &tour_id,
        &tour.name,
        &tour.summary,
        tour.price,
        &auth.email,
        &format!("{}/?booking=success", base_url),
        &format!("{}/tours/{}", base_url, tour.slug),
    )
    .await
    .map_err(|e| ApiError::internal_error(format!("Stripe error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "session": session
    }))))
}

#[openapi(tag = "Booking")]
#[post("/bookings", data = "<dto>")]
pub async fn create_booking(
    db: &State<DbConn>,
    _staff: StaffGuard,
    dto: Json<CreateBookingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let tour_id = ObjectId::parse_str(&dto.tour)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;
    let user_id = ObjectId::parse_str(&dto.user)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;
    if dto.price <= 0.0 {
        return Err(ApiError::bad_request("A booking must have a positive price"));
    }

    let tour = db.collection::<Tour>("tours")
        .find_one(doc! { "_id": tour_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if tour.is_none() {
        return Err(ApiError::not_found("Tour not found"));
    }

    let booking = Booking {
        id: None,
        tour: tour_id,
        user: user_id,
        price: dto.price,
        paid: dto.paid.unwrap_or(true),
        created_at: DateTime::now(),
    };

    // One booking per (tour, user), enforced by the unique index
    let result = db.collection::<Booking>("bookings")
        .insert_one(&booking, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "This user has already booked this tour"))?;

    let mut created = booking;
    created.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Booking created successfully".to_string(),
        serde_json::json!({ "booking": created }),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct BookingsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Booking")]
#[get("/bookings?<query..>")]
pub async fn get_all_bookings(
    db: &State<DbConn>,
    _staff: StaffGuard,
    query: BookingsQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let window = page_window(query.page, query.limit);

    let find_options = FindOptions::builder()
        .skip(window.skip)
        .limit(window.limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let bookings: Vec<Booking> = db.collection::<Booking>("bookings")
        .find(None, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    let total = db.collection::<Booking>("bookings")
        .count_documents(None, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "bookings": bookings,
        "pagination": {
            "page": window.page,
            "limit": window.limit,
            "total": total,
            "pages": (total as f64 / window.limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "Booking")]
#[get("/bookings/<booking_id>")]
pub async fn get_booking(
    db: &State<DbConn>,
    _staff: StaffGuard,
    booking_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&booking_id)
        .map_err(|_| ApiError::bad_request("Invalid booking ID"))?;

    let booking = db.collection::<Booking>("bookings")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "booking": booking }))))
}

#[openapi(tag = "Booking")]
#[patch("/bookings/<booking_id>", data = "<dto>")]
pub async fn update_booking(
    db: &State<DbConn>,
    _staff: StaffGuard,
    booking_id: String,
    dto: Json<UpdateBookingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&booking_id)
        .map_err(|_| ApiError::bad_request("Invalid booking ID"))?;

    let mut update_doc = doc! {};
    if let Some(price) = dto.price {
        if price <= 0.0 {
            return Err(ApiError::bad_request("A booking must have a positive price"));
        }
        update_doc.insert("price", price);
    }
    if let Some(paid) = dto.paid {
        update_doc.insert("paid", paid);
    }
    if update_doc.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    db.collection::<Booking>("bookings")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let booking = db.collection::<Booking>("bookings")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "booking": booking }))))
}

#[openapi(tag = "Booking")]
#[delete("/bookings/<booking_id>")]
pub async fn delete_booking(
    db: &State<DbConn>,
    _staff: StaffGuard,
    booking_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&booking_id)
        .map_err(|_| ApiError::bad_request("Invalid booking ID"))?;

    let result = db.collection::<Booking>("bookings")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Booking not found"));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Booking deleted".to_string(),
        serde_json::json!({}),
    )))
}
