use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{
    CreateTourDto, Tour, UpdateTourDto, DEFAULT_RATINGS_AVERAGE, DEFAULT_RATINGS_QUANTITY,
};
use crate::guards::StaffGuard;
use crate::utils::{page_window, slugify, ApiError, ApiResponse};

fn validate_name(name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if !(10..=40).contains(&len) {
        return Err(ApiError::bad_request(
            "A tour name must be between 10 and 40 characters",
        ));
    }
    Ok(())
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct ToursQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub difficulty: Option<String>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    /// "price", "-price", "ratings_average", "-ratings_average"
    pub sort: Option<String>,
}

#[openapi(tag = "Tour")]
#[get("/tours?<query..>")]
pub async fn get_all_tours(
    db: &State<DbConn>,
    query: ToursQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let window = page_window(query.page, query.limit);

    let mut filter = doc! {};
    if let Some(ref difficulty) = query.difficulty {
        filter.insert("difficulty", difficulty.to_lowercase());
    }
    if let Some(max_price) = query.max_price {
        filter.insert("price", doc! { "$lte": max_price });
    }
    if let Some(min_rating) = query.min_rating {
        filter.insert("ratings_average", doc! { "$gte": min_rating });
    }

    let sort = match query.sort.as_deref() {
        Some("price") => doc! { "price": 1 },
        Some("-price") => doc! { "price": -1 },
        Some("ratings_average") => doc! { "ratings_average": 1 },
        Some("-ratings_average") => doc! { "ratings_average": -1 },
        _ => doc! { "created_at": -1 },
    };

    let find_options = FindOptions::builder()
        .skip(window.skip)
        .limit(window.limit)
        .sort(sort)
        .build();

    let tours: Vec<Tour> = db.collection::<Tour>("tours")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    let total = db.collection::<Tour>("tours")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "tours": tours,
        "pagination": {
            "page": window.page,
            "limit": window.limit,
            "total": total,
            "pages": (total as f64 / window.limit as f64).ceil() as i64,
        }
    }))))
}

/// Aggregate tour statistics grouped by difficulty, for the best-rated
/// tours (average >= 4.5).
#[openapi(tag = "Tour")]
#[get("/tours/stats")]
pub async fn get_tour_stats(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let pipeline = vec![
        doc! { "$match": { "ratings_average": { "$gte": 4.5 } } },
        doc! { "$group": {
            "_id": { "$toUpper": "$difficulty" },
            "num_tours": { "$sum": 1 },
            "num_ratings": { "$sum": "$ratings_quantity" },
            "avg_rating": { "$avg": "$ratings_average" },
            "avg_price": { "$avg": "$price" },
            "min_price": { "$min": "$price" },
            "max_price": { "$max": "$price" },
        }},
        doc! { "$sort": { "avg_price": 1 } },
    ];

    let stats: Vec<Document> = db.collection::<Tour>("tours")
        .aggregate(pipeline, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    let stats = serde_json::to_value(&stats)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "stats": stats }))))
}

#[openapi(tag = "Tour")]
#[get("/tours/<tour_id>")]
pub async fn get_tour(
    db: &State<DbConn>,
    tour_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&tour_id)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;

    let tour = db.collection::<Tour>("tours")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Tour not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "tour": tour }))))
}

#[openapi(tag = "Tour")]
#[post("/tours", data = "<dto>")]
pub async fn create_tour(
    db: &State<DbConn>,
    _staff: StaffGuard,
    dto: Json<CreateTourDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    validate_name(&dto.name)?;
    if dto.price <= 0.0 {
        return Err(ApiError::bad_request("A tour must have a positive price"));
    }
    if dto.duration <= 0 || dto.max_group_size <= 0 {
        return Err(ApiError::bad_request(
            "A tour must have a positive duration and group size",
        ));
    }
    if let Some(discount) = dto.price_discount {
        if discount >= dto.price {
            return Err(ApiError::bad_request(
                "The discounted price must be lower than the regular price",
            ));
        }
    }

    let name = dto.name.trim().to_string();
    let tour = Tour {
        id: None,
        slug: slugify(&name),
        name,
        duration: dto.duration,
        max_group_size: dto.max_group_size,
        difficulty: dto.difficulty.clone(),
        ratings_average: DEFAULT_RATINGS_AVERAGE,
        ratings_quantity: DEFAULT_RATINGS_QUANTITY,
        price: dto.price,
        price_discount: dto.price_discount,
        summary: dto.summary.trim().to_string(),
        description: dto.description.clone(),
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db.collection::<Tour>("tours")
        .insert_one(&tour, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "A tour with this name already exists"))?;

    let mut created = tour;
    created.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Tour created successfully".to_string(),
        serde_json::json!({ "tour": created }),
    )))
}

#[openapi(tag = "Tour")]
#[patch("/tours/<tour_id>", data = "<dto>")]
pub async fn update_tour(
    db: &State<DbConn>,
    _staff: StaffGuard,
    tour_id: String,
    dto: Json<UpdateTourDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&tour_id)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;

    let mut update_doc = doc! {
        "updated_at": DateTime::now()
    };
    if let Some(ref name) = dto.name {
        validate_name(name)?;
        update_doc.insert("name", name.trim());
        update_doc.insert("slug", slugify(name));
    }
    if let Some(duration) = dto.duration {
        update_doc.insert("duration", duration);
    }
    if let Some(max_group_size) = dto.max_group_size {
        update_doc.insert("max_group_size", max_group_size);
    }
    if let Some(ref difficulty) = dto.difficulty {
        update_doc.insert(
            "difficulty",
            mongodb::bson::to_bson(difficulty)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
        );
    }
    if let Some(price) = dto.price {
        if price <= 0.0 {
            return Err(ApiError::bad_request("A tour must have a positive price"));
        }
        update_doc.insert("price", price);
    }
    if let Some(discount) = dto.price_discount {
        update_doc.insert("price_discount", discount);
    }
    if let Some(ref summary) = dto.summary {
        update_doc.insert("summary", summary.trim());
    }
    if let Some(ref description) = dto.description {
        update_doc.insert("description", description.as_str());
    }

    db.collection::<Tour>("tours")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "A tour with this name already exists"))?;

    let tour = db.collection::<Tour>("tours")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Tour not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({ "tour": tour }))))
}

#[openapi(tag = "Tour")]
#[delete("/tours/<tour_id>")]
pub async fn delete_tour(
    db: &State<DbConn>,
    _staff: StaffGuard,
    tour_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&tour_id)
        .map_err(|_| ApiError::bad_request("Invalid tour ID"))?;

    let result = db.collection::<Tour>("tours")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Tour not found"));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Tour deleted".to_string(),
        serde_json::json!({}),
    )))
}
