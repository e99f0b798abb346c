use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{UpdateMeDto, User, UserResponse};
use crate::guards::{AdminGuard, AuthGuard};
use crate::utils::{page_window, validate_display_name, validate_email, ApiError, ApiResponse};

#[openapi(tag = "User")]
#[get("/users/me")]
pub async fn get_me(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = db.collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(user.into())))
}

#[openapi(tag = "User")]
#[patch("/users/me", data = "<dto>")]
pub async fn update_me(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<UpdateMeDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    // Only name and email are user-editable; password changes go through
    // /auth/update-password and the role is never settable here.
    let mut update_doc = doc! {
        "updated_at": DateTime::now()
    };

    if let Some(ref name) = dto.name {
        if !validate_display_name(name) {
            return Err(ApiError::bad_request("Name cannot be empty"));
        }
        update_doc.insert("name", name.trim());
    }
    if let Some(ref email) = dto.email {
        if !validate_email(email) {
            return Err(ApiError::bad_request("Invalid email address"));
        }
        update_doc.insert("email", email.to_lowercase());
    }

    db.collection::<User>("users")
        .update_one(doc! { "_id": auth.user_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "An account with this email already exists"))?;

    let user = db.collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(user.into())))
}

#[openapi(tag = "User")]
#[delete("/users/me")]
pub async fn delete_me(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    // Soft delete: the account is deactivated, not removed
    db.collection::<User>("users")
        .update_one(
            doc! { "_id": auth.user_id },
            doc! { "$set": { "active": false, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Account deactivated".to_string(),
        serde_json::json!({}),
    )))
}

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct UsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "User")]
#[get("/users?<query..>")]
pub async fn get_all_users(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: UsersQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let window = page_window(query.page, query.limit);

    let find_options = FindOptions::builder()
        .skip(window.skip)
        .limit(window.limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let users: Vec<User> = db.collection::<User>("users")
        .find(None, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Collection error: {}", e)))?;

    let total = db.collection::<User>("users")
        .count_documents(None, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    let users: Vec<UserResponse> = users.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(serde_json::json!({
        "users": users,
        "pagination": {
            "page": window.page,
            "limit": window.limit,
            "total": total,
            "pages": (total as f64 / window.limit as f64).ceil() as i64,
        }
    }))))
}

#[openapi(tag = "User")]
#[get("/users/<user_id>")]
pub async fn get_user(
    db: &State<DbConn>,
    _admin: AdminGuard,
    user_id: String,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let user = db.collection::<User>("users")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(user.into())))
}

#[openapi(tag = "User")]
#[patch("/users/<user_id>", data = "<dto>")]
pub async fn update_user(
    db: &State<DbConn>,
    _admin: AdminGuard,
    user_id: String,
    dto: Json<UpdateMeDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let mut update_doc = doc! {
        "updated_at": DateTime::now()
    };
    if let Some(ref name) = dto.name {
        if !validate_display_name(name) {
            return Err(ApiError::bad_request("Name cannot be empty"));
        }
        update_doc.insert("name", name.trim());
    }
    if let Some(ref email) = dto.email {
        if !validate_email(email) {
            return Err(ApiError::bad_request("Invalid email address"));
        }
        update_doc.insert("email", email.to_lowercase());
    }

    db.collection::<User>("users")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "An account with this email already exists"))?;

    let user = db.collection::<User>("users")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(user.into())))
}

#[openapi(tag = "User")]
#[delete("/users/<user_id>")]
pub async fn delete_user(
    db: &State<DbConn>,
    _admin: AdminGuard,
    user_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let result = db.collection::<User>("users")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(ApiResponse::success_with_message(
        "User deleted".to_string(),
        serde_json::json!({}),
    )))
}
