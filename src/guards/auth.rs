use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use mongodb::bson::{doc, oid::ObjectId};

// === OpenAPI (compatible with rocket_okapi 0.8.0 / 0.8.1) ===
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::db::DbConn;
use crate::models::{Role, User};

/// JWT-based authentication guard. Resolves the token to a live user,
/// so deactivated accounts and tokens issued before the last password
/// change are both rejected.
pub struct AuthGuard {
    pub user_id: ObjectId,
    pub role: Role,
    pub email: String,
}

fn extract_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    if let Some(header) = req.headers().get_one("Authorization") {
        return Some(header.trim_start_matches("Bearer "));
    }
    req.cookies().get("jwt").map(|c| c.value())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match extract_token(req) {
            Some(token) => token,
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let claims = match crate::services::JwtService::verify_token(token) {
            Ok(claims) => claims,
            Err(_) => return Outcome::Error((Status::Unauthorized, ())),
        };

        let user_id = match ObjectId::parse_str(&claims.sub) {
            Ok(user_id) => user_id,
            Err(_) => return Outcome::Error((Status::Unauthorized, ())),
        };

        let db = match req.rocket().state::<DbConn>() {
            Some(db) => db,
            None => return Outcome::Error((Status::InternalServerError, ())),
        };

        let user = match db
            .collection::<User>("users")
            .find_one(doc! { "_id": user_id, "active": true }, None)
            .await
        {
            Ok(Some(user)) => user,
            Ok(None) => return Outcome::Error((Status::Unauthorized, ())),
            Err(_) => return Outcome::Error((Status::InternalServerError, ())),
        };

        // Tokens minted before the last password change are stale.
        if let Some(changed_at) = user.password_changed_at {
            if changed_at.timestamp_millis() / 1000 > claims.iat {
                return Outcome::Error((Status::Unauthorized, ()));
            }
        }

        Outcome::Success(AuthGuard {
            user_id,
            role: user.role,
            email: user.email,
        })
    }
}

impl<'a> OpenApiFromRequest<'a> for AuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

/// Restricts a route to tour staff (admin or lead guide).
pub struct StaffGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<AuthGuard>().await {
            Outcome::Success(auth) => {
                if matches!(auth.role, Role::Admin | Role::LeadGuide) {
                    Outcome::Success(StaffGuard { auth })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for StaffGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

/// Restricts a route to admins.
pub struct AdminGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<AuthGuard>().await {
            Outcome::Success(auth) => {
                if auth.role == Role::Admin {
                    Outcome::Success(AdminGuard { auth })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
