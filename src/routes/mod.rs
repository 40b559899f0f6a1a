//! API routes

mod auth;
mod chat;
mod courses;
mod error;
mod extract;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    active_sessions: usize,
    message: &'static str,
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "Moodle AI Assistant API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Dynamic Moodle integration that works with any university",
        "active_sessions": state.sessions.count(),
        "features": [
            "Dynamic Moodle authentication",
            "Course and content access",
            "File management",
            "AI chat interface",
            "Session management"
        ]
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.count(),
        message: "Moodle AI Assistant API is running",
    })
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let cleaned = state.sessions.sweep();

    Json(json!({
        "status": "operational",
        "active_sessions": state.sessions.count(),
        "cleaned_sessions": cleaned,
        "endpoints": {
            "authentication": "/api/auth/*",
            "courses": "/api/courses/*",
            "chat": "/api/chat/*"
        }
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "message": "The requested endpoint does not exist",
            "available_endpoints": [
                "/api/auth/login - Authenticate with Moodle",
                "/api/courses - Get user courses",
                "/api/chat - AI assistant chat"
            ]
        })),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .merge(auth::router())
        .merge(courses::router())
        .merge(chat::router())
        .fallback(not_found)
}

#[cfg(test)]
mod tests {
    use super::extract::SESSION_HEADER;
    use super::*;
    use crate::assistant::Assistant;
    use crate::config::Timeouts;
    use crate::moodle::MoodleConnector;
    use crate::session::{session_ttl, ManualClock, SessionStore};
    use axum::body::Body;
    use axum::http::{Request, Response};
    use chrono::Utc;
    use serde_json::{Map, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_with(sessions: SessionStore) -> AppState {
        let timeouts = Timeouts {
            validate_secs: 2,
            request_secs: 2,
            file_secs: 2,
        };
        AppState {
            sessions: Arc::new(sessions),
            moodle: MoodleConnector::new(timeouts),
            assistant: Assistant::new(),
        }
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
        router()
            .with_state(state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    fn get_with_session(uri: &str, session_id: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(SESSION_HEADER, session_id)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value, session_id: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(id) = session_id {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn moodle_session(state: &AppState, server: &MockServer) -> String {
        let mut info = Map::new();
        info.insert("username".into(), json!("alice"));
        state
            .sessions
            .create(format!("{}/", server.uri()), "tok", info)
    }

    async fn mount_rpc(server: &MockServer, function: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path("/webservice/rest/server.php"))
            .and(body_string_contains(format!("wsfunction={}", function)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health_counts_sessions() {
        let state = state_with(SessionStore::new());
        state.sessions.create("https://m.test/", "t", Map::new());

        let response = send(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["active_sessions"], 1);
    }

    #[tokio::test]
    async fn test_status_sweeps_expired_sessions() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = state_with(SessionStore::with_clock(clock.clone()));
        state.sessions.create("https://m.test/", "old", Map::new());
        clock.advance(session_ttl() + chrono::Duration::minutes(1));
        state.sessions.create("https://m.test/", "new", Map::new());

        let body = body_json(
            send(&state, Request::get("/api/status").body(Body::empty()).unwrap()).await,
        )
        .await;
        assert_eq!(body["cleaned_sessions"], 1);
        assert_eq!(body["active_sessions"], 1);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let state = state_with(SessionStore::new());
        let response = send(&state, Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_session() {
        let state = state_with(SessionStore::new());

        let response = send(&state, Request::get("/api/courses").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], "Session ID required");

        let response = send(&state, get_with_session("/api/courses/", "bogus")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["detail"], "Invalid or expired session");

        let response = send(&state, post_json("/api/auth/logout", json!({}), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_flow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login/token.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "x"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/token.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
            .mount(&server)
            .await;
        mount_rpc(
            &server,
            "core_webservice_get_site_info",
            json!({"userid": 7, "fullname": "Alice Smith", "email": "a@uni.test", "sitename": "Uni"}),
        )
        .await;

        let state = state_with(SessionStore::new());
        let login = json!({
            "moodle_url": server.uri(),
            "username": "alice",
            "password": "pw"
        });
        let body = body_json(send(&state, post_json("/api/auth/login", login, None)).await).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["user_info"]["fullname"], "Alice Smith");
        assert_eq!(body["user_info"]["userid"], 7);
        assert_eq!(body["user_info"]["username"], "alice");
        assert!(body.get("token").is_none());
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let session = state.sessions.get(&session_id).unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.moodle_url, format!("{}/", server.uri()));
        assert_eq!(session.user_info["sitename"], "Uni");

        let info = body_json(send(&state, get_with_session("/api/auth/session-info", &session_id)).await).await;
        assert_eq!(info["session_id"], session_id.as_str());
        assert!(info.get("token").is_none());
        assert!(info["created_at"].as_str().is_some());

        let logout = send(&state, post_json("/api/auth/logout", json!({}), Some(&session_id))).await;
        assert_eq!(body_json(logout).await["success"], true);

        let validate = body_json(send(&state, get_with_session("/api/auth/validate", &session_id)).await).await;
        assert_eq!(validate["valid"], false);
    }

    #[tokio::test]
    async fn test_login_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login/token.php"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/token.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"error": "invalid login", "errorcode": "invalidlogin"}),
            ))
            .mount(&server)
            .await;

        let state = state_with(SessionStore::new());
        let login = json!({"moodle_url": server.uri(), "username": "a", "password": "b"});
        let body = body_json(send(&state, post_json("/api/auth/login", login, None)).await).await;

        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Authentication failed: invalid login");
        assert!(body.get("session_id").is_none());
        assert_eq!(state.sessions.count(), 0);
    }

    #[tokio::test]
    async fn test_login_rejects_non_moodle_host() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("just a blog"))
            .mount(&server)
            .await;

        let state = state_with(SessionStore::new());
        let login = json!({"moodle_url": server.uri(), "username": "a", "password": "b"});
        let body = body_json(send(&state, post_json("/api/auth/login", login, None)).await).await;

        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid Moodle URL"));
    }

    #[tokio::test]
    async fn test_list_courses_skips_bad_records() {
        let server = MockServer::start().await;
        mount_rpc(&server, "core_webservice_get_site_info", json!({"userid": 3})).await;
        mount_rpc(
            &server,
            "core_enrol_get_users_courses",
            json!([
                {"id": 1, "fullname": "Physics", "shortname": "PHY", "category": 2, "visible": 1},
                {"fullname": "Broken"}
            ]),
        )
        .await;

        let state = state_with(SessionStore::new());
        let id = moodle_session(&state, &server);

        let response = send(&state, get_with_session("/api/courses", &id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let courses = body.as_array().unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0]["fullname"], "Physics");
        assert_eq!(courses[0]["visible"], true);
    }

    #[tokio::test]
    async fn test_list_courses_unresolved_user_is_empty() {
        let server = MockServer::start().await;
        mount_rpc(
            &server,
            "core_webservice_get_site_info",
            json!({"exception": "webservice_access_exception", "message": "nope"}),
        )
        .await;

        let state = state_with(SessionStore::new());
        let id = moodle_session(&state, &server);

        let response = send(&state, get_with_session("/api/courses", &id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_remote_failure_is_generic_500() {
        let server = MockServer::start().await;
        mount_rpc(
            &server,
            "core_course_get_contents",
            json!({"exception": "moodle_exception", "message": "secret internals"}),
        )
        .await;

        let state = state_with(SessionStore::new());
        let id = moodle_session(&state, &server);

        let response = send(&state, get_with_session("/api/courses/9/contents", &id)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Failed to retrieve course contents");
    }

    #[tokio::test]
    async fn test_get_course_not_found() {
        let server = MockServer::start().await;
        mount_rpc(&server, "core_course_get_courses_by_field", json!({"courses": []})).await;

        let state = state_with(SessionStore::new());
        let id = moodle_session(&state, &server);

        let response = send(&state, get_with_session("/api/courses/404", &id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Course not found");
    }

    #[tokio::test]
    async fn test_file_listing_and_download() {
        let server = MockServer::start().await;
        let file_url = format!("{}/webservice/pluginfile.php/5/slides.pdf", server.uri());
        mount_rpc(
            &server,
            "core_course_get_contents",
            json!([{
                "id": 1,
                "name": "Intro",
                "modules": [{
                    "id": 20,
                    "name": "Lecture",
                    "contents": [
                        {"type": "file", "filename": "slides.pdf", "fileurl": file_url, "mimetype": "application/pdf"},
                        {"type": "file", "filename": "evil.pdf", "fileurl": "https://elsewhere.test/evil.pdf"}
                    ]
                }]
            }]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/webservice/pluginfile.php/5/slides.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PDFDATA".to_vec()))
            .mount(&server)
            .await;

        let state = state_with(SessionStore::new());
        let id = moodle_session(&state, &server);

        let listing = body_json(send(&state, get_with_session("/api/courses/3/download?file_type=PDF", &id)).await).await;
        assert_eq!(listing["files_count"], 2);
        assert_eq!(listing["files"][0]["file_id"], "20-0");

        let response = send(&state, get_with_session("/api/courses/3/files/20-0", &id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"slides.pdf\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"PDFDATA");

        let response = send(&state, get_with_session("/api/courses/3/files/20-1", &id)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&state, get_with_session("/api/courses/3/files/99-0", &id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_replies() {
        let state = state_with(SessionStore::new());
        let mut info = Map::new();
        info.insert("fullname".into(), json!("Bea"));
        let id = state.sessions.create("https://m.test/", "t", info);

        let body = body_json(
            send(&state, post_json("/api/chat/", json!({"message": "Hello!"}), Some(&id))).await,
        )
        .await;
        assert!(body["response"].as_str().unwrap().starts_with("Hello Bea!"));
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 3);

        let body = body_json(send(&state, get_with_session("/api/chat/suggestions", &id)).await).await;
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 8);
        assert_eq!(body["context"], "Connected to https://m.test/");
        assert_eq!(body["user"], "Bea");

        let response = send(&state, post_json("/api/chat", json!({"message": "hi"}), Some("bogus"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
