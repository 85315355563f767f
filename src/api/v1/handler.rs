use super::error::*;
use super::guard::{SessionContext, SessionGuard};
use crate::application_port::NewSession;
use crate::domain_model::CustomClaims;
use crate::logger::*;
use crate::settings::Demo;
use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use warp::{self, Reply, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub subject: String,
    pub csrf_secret: String,
    pub auth_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

pub async fn login(
    body: LoginRequest,
    guard: Arc<SessionGuard>,
    demo: Arc<Demo>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let username_ok = constant_time_eq(body.username.as_bytes(), demo.username.as_bytes());
    let password_ok = constant_time_eq(body.password.as_bytes(), demo.password.as_bytes());
    if !(username_ok && password_ok) {
        info!(username = %body.username, "login refused");
        return Err(reject::custom(ApiErrorCode::InvalidCredentials));
    }

    let mut custom_claims = CustomClaims::new();
    custom_claims.insert("role".to_string(), Value::from("user"));
    let session = guard
        .service()
        .issue(NewSession {
            subject: body.username,
            custom_claims,
        })
        .await
        .map_err(|e| reject::custom(guard.reject(e)))?;
    let directives = guard.issue_directives(&session).map_err(reject::custom)?;
    info!(session = %session.claims.id, "session issued");

    let response = LoginResponse {
        subject: session.claims.subject.clone(),
        csrf_secret: session.tokens.csrf_secret.0.clone(),
        auth_token_expires_at: session.tokens.auth_token_expires_at,
        refresh_token_expires_at: session.tokens.refresh_token_expires_at,
    };
    let mut reply = warp::reply::json(&ApiResponse::ok(response)).into_response();
    directives.apply(&mut reply);
    Ok(reply)
}

#[derive(Debug, Serialize)]
pub struct RestrictedResponse {
    pub subject: String,
    pub csrf_secret: String,
    pub role: Option<Value>,
}

pub fn restricted(context: SessionContext) -> warp::reply::Response {
    let claims = context.claims();
    let response = RestrictedResponse {
        subject: claims.subject.clone(),
        csrf_secret: context.csrf_secret().0.clone(),
        role: claims.custom_claims.get("role").cloned(),
    };
    context.respond(warp::reply::json(&ApiResponse::ok(response)))
}

pub async fn logout(
    context: SessionContext,
    guard: Arc<SessionGuard>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let directives = guard
        .terminate(Some(context.presented_refresh_token()))
        .await;
    info!(session = %context.claims().id, "session terminated");

    let mut reply = warp::reply::json(&ApiResponse::ok(())).into_response();
    directives.apply(&mut reply);
    Ok(reply)
}
