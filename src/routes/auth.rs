use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime};
use chrono::Utc;

use crate::db::DbConn;
use crate::models::{
    ForgotPasswordDto, LoginDto, ResetPasswordDto, Role, SignupDto,
    UpdatePasswordDto, User, UserResponse,
};
use crate::guards::AuthGuard;
use crate::services::{EmailService, JwtService};
use crate::utils::{
    generate_reset_token, hash_reset_token, validate_display_name, validate_email,
    validate_password, ApiError, ApiResponse,
};

const RESET_TOKEN_WINDOW_MS: i64 = 10 * 60 * 1000;

fn token_response(user_id: &mongodb::bson::oid::ObjectId, user: User) -> Result<serde_json::Value, ApiError> {
    let token = JwtService::generate_token(user_id)
        .map_err(|e| ApiError::internal_error(format!("Token error: {}", e)))?;
    let user_response: UserResponse = user.into();
    Ok(serde_json::json!({
        "token": token,
        "user": user_response
    }))
}

#[openapi(tag = "Auth")]
#[post("/auth/signup", data = "<dto>")]
pub async fn signup(
    db: &State<DbConn>,
    dto: Json<SignupDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_display_name(&dto.name) {
        return Err(ApiError::bad_request("Please provide your name"));
    }
    if !validate_email(&dto.email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if !validate_password(&dto.password) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if dto.password != dto.password_confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }

    let password_hash = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Hashing error: {}", e)))?;

    let user = User {
        id: None,
        name: dto.name.trim().to_string(),
        email: dto.email.to_lowercase(),
        role: Role::User,
        password: password_hash,
        password_changed_at: None,
        password_reset_token: None,
        password_reset_expires: None,
        active: true,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db.collection::<User>("users")
        .insert_one(&user, None)
        .await
        .map_err(|e| ApiError::from_mongo_write(e, "An account with this email already exists"))?;

    let user_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid inserted id"))?;

    // Best effort, signup succeeds either way
    EmailService::send_welcome_email(&user.email, &user.name).await;

    let mut created = user;
    created.id = Some(user_id);

    Ok(Json(ApiResponse::success_with_message(
        "Account created successfully".to_string(),
        token_response(&user_id, created)?,
    )))
}

#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if dto.email.is_empty() || dto.password.is_empty() {
        return Err(ApiError::bad_request("Please provide an email and password"));
    }

    let user = db.collection::<User>("users")
        .find_one(doc! { "email": dto.email.to_lowercase(), "active": true }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    // Same error for unknown email and wrong password
    let user = match user {
        Some(user) if bcrypt::verify(&dto.password, &user.password).unwrap_or(false) => user,
        _ => return Err(ApiError::unauthorized("Email and/or password are incorrect")),
    };

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User missing id"))?;

    Ok(Json(ApiResponse::success(token_response(&user_id, user)?)))
}

#[openapi(tag = "Auth")]
#[post("/auth/forgot-password", data = "<dto>")]
pub async fn forgot_password(
    db: &State<DbConn>,
    dto: Json<ForgotPasswordDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = db.collection::<User>("users")
        .find_one(doc! { "email": dto.email.to_lowercase(), "active": true }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("There is no user with that email address"))?;

    // Only the sha-256 digest of the token is stored
    let reset_token = generate_reset_token();
    let token_hash = hash_reset_token(&reset_token);
    let expires = DateTime::from_millis(Utc::now().timestamp_millis() + RESET_TOKEN_WINDOW_MS);

    db.collection::<User>("users")
        .update_one(
            doc! { "email": &user.email },
            doc! { "$set": {
                "password_reset_token": &token_hash,
                "password_reset_expires": expires,
                "updated_at": DateTime::now()
            }},
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let reset_url = format!(
        "{}/api/v1/auth/reset-password/{}",
        crate::config::Config::public_url(),
        reset_token
    );

    if !EmailService::send_password_reset_email(&user.email, &reset_url).await {
        // Clear the token so a failed send leaves no dangling reset window
        db.collection::<User>("users")
            .update_one(
                doc! { "email": &user.email },
                doc! { "$unset": {
                    "password_reset_token": "",
                    "password_reset_expires": ""
                }},
                None,
            )
            .await
            .ok();
        return Err(ApiError::internal_error(
            "There was an error sending the email. Please try again later",
        ));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Token sent to email".to_string(),
        serde_json::json!({}),
    )))
}

#[openapi(tag = "Auth")]
#[patch("/auth/reset-password/<token>", data = "<dto>")]
pub async fn reset_password(
    db: &State<DbConn>,
    token: String,
    dto: Json<ResetPasswordDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_password(&dto.password) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if dto.password != dto.password_confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }

    let token_hash = hash_reset_token(&token);
    let now = DateTime::now();

    let user = db.collection::<User>("users")
        .find_one(
            doc! {
                "password_reset_token": &token_hash,
                "password_reset_expires": { "$gt": now }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User missing id"))?;

    let password_hash = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Hashing error: {}", e)))?;

    db.collection::<User>("users")
        .update_one(
            doc! { "_id": user_id },
            doc! {
                "$set": {
                    "password": &password_hash,
                    "password_changed_at": DateTime::now(),
                    "updated_at": DateTime::now()
                },
                "$unset": {
                    "password_reset_token": "",
                    "password_reset_expires": ""
                }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Password reset successfully".to_string(),
        token_response(&user_id, user)?,
    )))
}

#[openapi(tag = "Auth")]
#[patch("/auth/update-password", data = "<dto>")]
pub async fn update_password(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<UpdatePasswordDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_password(&dto.password) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if dto.password != dto.password_confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }

    let user = db.collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !bcrypt::verify(&dto.password_current, &user.password).unwrap_or(false) {
        return Err(ApiError::unauthorized("Your current password is wrong"));
    }

    let password_hash = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Hashing error: {}", e)))?;

    db.collection::<User>("users")
        .update_one(
            doc! { "_id": auth.user_id },
            doc! { "$set": {
                "password": &password_hash,
                "password_changed_at": DateTime::now(),
                "updated_at": DateTime::now()
            }},
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Password updated successfully".to_string(),
        token_response(&auth.user_id, user)?,
    )))
}
