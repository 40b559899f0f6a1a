//! Login, logout and session inspection

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::moodle::urls::normalize_moodle_url;
use crate::AppState;

use super::extract::{ActiveSession, SessionId};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub moodle_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Map<String, Value>>,
    pub message: String,
}

impl LoginResponse {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: None,
            user_info: None,
            message: message.into(),
        }
    }
}

/// Profile fields copied from `core_webservice_get_site_info`
const PROFILE_FIELDS: [&str; 3] = ["fullname", "email", "sitename"];

async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Json<LoginResponse> {
    let moodle_url = match normalize_moodle_url(&request.moodle_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::info!("Rejected login URL {:?}: {}", request.moodle_url, e);
            return Json(LoginResponse::failed(
                "Invalid Moodle URL. Please check that the URL is correct and accessible.",
            ));
        }
    };

    tracing::info!("Validating Moodle instance: {}", moodle_url);
    if !state.moodle.validate_instance(&moodle_url).await {
        return Json(LoginResponse::failed(
            "Invalid Moodle URL. Please check that the URL is correct and accessible.",
        ));
    }

    tracing::info!("Authenticating user {} with {}", request.username, moodle_url);
    let auth = match state
        .moodle
        .authenticate(&moodle_url, &request.username, &request.password)
        .await
    {
        Ok(auth) => auth,
        Err(failure) => {
            tracing::info!(
                "Authentication failed for {} ({})",
                request.username,
                failure.errorcode
            );
            return Json(LoginResponse::failed(format!(
                "Authentication failed: {}",
                failure.message
            )));
        }
    };

    let mut user_info = auth.user_info;
    let client = state.moodle.client(moodle_url.clone(), auth.token.clone());
    match client.site_info().await {
        Ok(site_info) => {
            for field in PROFILE_FIELDS {
                let value = site_info.get(field).cloned().unwrap_or_else(|| json!(""));
                user_info.insert(field.to_string(), value);
            }
            if let Some(userid) = site_info.get("userid").filter(|v| !v.is_null()) {
                user_info.insert("userid".into(), userid.clone());
            }
        }
        Err(e) => tracing::warn!("Could not fetch additional user info: {}", e),
    }

    let session_id = state.sessions.create(moodle_url, auth.token, user_info.clone());

    Json(LoginResponse {
        success: true,
        session_id: Some(session_id),
        user_info: Some(user_info),
        message: "Authentication successful".into(),
    })
}

async fn logout(State(state): State<AppState>, SessionId(id): SessionId) -> Json<Value> {
    if state.sessions.delete(&id) {
        Json(json!({ "success": true, "message": "Logged out successfully" }))
    } else {
        Json(json!({ "success": false, "message": "Session not found or already expired" }))
    }
}

async fn validate(State(state): State<AppState>, SessionId(id): SessionId) -> Json<Value> {
    match state.sessions.get(&id) {
        Some(session) => Json(json!({
            "valid": true,
            "user_info": session.user_info,
            "moodle_url": session.moodle_url,
        })),
        None => Json(json!({ "valid": false, "message": "Session expired or invalid" })),
    }
}

async fn session_info(ActiveSession(session): ActiveSession) -> Json<Value> {
    Json(json!({
        "session_id": session.session_id,
        "user_info": session.user_info,
        "moodle_url": session.moodle_url,
        "created_at": session.created_at.to_rfc3339(),
        "last_accessed": session.last_accessed_at.to_rfc3339(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/validate", get(validate))
        .route("/api/auth/session-info", get(session_info))
}
