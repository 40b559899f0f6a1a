//! Course listing, content trees and files

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::moodle::models::{self, Course, CourseSection};
use crate::moodle::urls;
use crate::AppState;

use super::error::ApiError;
use super::extract::ActiveSession;

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    /// File extension to keep, e.g. `pdf`
    pub file_type: Option<String>,
}

async fn list_courses(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
) -> Result<Json<Vec<Course>>, ApiError> {
    let client = state.moodle.client(session.moodle_url, session.token);
    let records = client
        .user_courses()
        .await
        .map_err(|_| ApiError::Retrieval("Failed to retrieve courses"))?;

    Ok(Json(models::map_records(records, "course")))
}

async fn get_course(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
    Path(course_id): Path<i64>,
) -> Result<Json<Course>, ApiError> {
    let client = state.moodle.client(session.moodle_url, session.token);
    let records = client
        .courses_by_field("id", &course_id.to_string())
        .await
        .map_err(|_| ApiError::Retrieval("Failed to retrieve course"))?;

    let record = records
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound("Course not found"))?;

    serde_json::from_value(record).map(Json).map_err(|e| {
        tracing::error!("Failed to map course {}: {}", course_id, e);
        ApiError::Retrieval("Failed to retrieve course")
    })
}

async fn course_contents(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
    Path(course_id): Path<i64>,
) -> Result<Json<Vec<CourseSection>>, ApiError> {
    let client = state.moodle.client(session.moodle_url, session.token);
    let sections = client
        .course_contents(course_id)
        .await
        .map_err(|_| ApiError::Retrieval("Failed to retrieve course contents"))?;

    Ok(Json(models::map_records(sections, "content")))
}

async fn course_files(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
    Path(course_id): Path<i64>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<Value>, ApiError> {
    let client = state.moodle.client(session.moodle_url, session.token);
    let sections = client
        .course_contents(course_id)
        .await
        .map_err(|_| ApiError::Retrieval("Failed to retrieve course files"))?;

    let files = models::course_files(&sections, query.file_type.as_deref());

    Ok(Json(json!({
        "course_id": course_id,
        "files_count": files.len(),
        "message": format!("Found {} files in course", files.len()),
        "files": files,
    })))
}

async fn download_file(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
    Path((course_id, file_id)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let client = state.moodle.client(session.moodle_url.clone(), session.token);
    let sections = client
        .course_contents(course_id)
        .await
        .map_err(|_| ApiError::Retrieval("Failed to retrieve file"))?;

    let file = models::find_course_file(&sections, &file_id)
        .ok_or(ApiError::NotFound("File not found"))?;
    let file_url = file.fileurl.ok_or(ApiError::NotFound("File not found"))?;

    // The token is only ever sent back to the host that issued it
    if !urls::same_origin(&session.moodle_url, &file_url) {
        tracing::warn!(
            "Refusing to fetch {} for session {}: not on {}",
            file_url,
            session.session_id,
            session.moodle_url
        );
        return Err(ApiError::Forbidden("File is not hosted on this Moodle instance"));
    }

    let download = client
        .download_file(&file_url)
        .await
        .map_err(|_| ApiError::Retrieval("Failed to retrieve file"))?;

    let content_type = download
        .content_type
        .or(file.mimetype)
        .unwrap_or_else(|| "application/octet-stream".into());
    let filename = file
        .filename
        .unwrap_or_else(|| file_id.clone())
        .replace(['"', '\\', '\r', '\n'], "_");

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        download.bytes,
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/courses", get(list_courses))
        .route("/api/courses/", get(list_courses))
        .route("/api/courses/:course_id", get(get_course))
        .route("/api/courses/:course_id/contents", get(course_contents))
        .route("/api/courses/:course_id/download", get(course_files))
        .route("/api/courses/:course_id/files/:file_id", get(download_file))
}
