use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::database::models::{NewUser, Role, User};
use crate::database::store::{MarketStore, PgStore};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub role: Option<Role>,
    pub profession: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<i32>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /auth/register - create an account and return a token
pub async fn register(Json(body): Json<RegisterRequest>) -> Result<impl IntoResponse, ApiError> {
    let mut fields = HashMap::new();
    if body.username.trim().len() < 3 {
        fields.insert("username".to_string(), "Must be at least 3 characters".to_string());
    }
    if body.password.len() < 8 {
        fields.insert("password".to_string(), "Must be at least 8 characters".to_string());
    }
    if body.name.trim().is_empty() {
        fields.insert("name".to_string(), "This field is required".to_string());
    }
    if body.role.is_none() {
        fields.insert("role".to_string(), "This field is required".to_string());
    }
    if !fields.is_empty() {
        return Err(ApiError::validation_error("Invalid registration data", Some(fields)));
    }

    let store = PgStore::connect().await?;
    let user = store
        .insert_user(NewUser {
            username: body.username.trim().to_string(),
            password_hash: hash_password(&body.password),
            name: body.name.trim().to_string(),
            // Checked above; role is immutable after this point
            role: body.role.unwrap_or(Role::Student),
            profession: body.profession,
            bio: body.bio,
            experience: body.experience,
            profile_image: body.profile_image,
        })
        .await?
        .ok_or_else(|| ApiError::conflict("Username already taken"))?;

    tracing::info!(user = %user.id, role = user.role.as_str(), "account registered");
    let response = token_response(&user)?;
    Ok((StatusCode::CREATED, response))
}

/// POST /auth/login - verify credentials and return a token
pub async fn login(Json(body): Json<LoginRequest>) -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;

    let user = store
        .get_user_by_username(body.username.trim())
        .await?
        .filter(|user| verify_password(&body.password, &user.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    Ok((StatusCode::OK, token_response(&user)?))
}

fn token_response(user: &User) -> Result<Json<serde_json::Value>, ApiError> {
    let claims = Claims::new(user.id, user.username.clone(), user.role);
    let token = generate_jwt(claims).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "user": user
        }
    })))
}
