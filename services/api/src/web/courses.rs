//! services/api/src/web/courses.rs
//!
//! Handlers for the `/courses` resource, including AI summary generation
//! and manual summary finalization.

use crate::{
    error::{ApiError, ErrorBody},
    web::{
        extract::{Path, ValidatedJson},
        schemas::{CourseCreate, CourseOut, CourseUpdate, MessageResponse, SummaryUpdate},
        state::AppState,
    },
};
use axum::{extract::State, Json};
use course_assistant_core::ports::{PortError, SummaryClaim};
use std::sync::Arc;
use tracing::{error, info, warn};

//=========================================================================================
// CRUD Handlers
//=========================================================================================

/// Create a course for an existing user.
#[utoipa::path(
    post,
    path = "/courses/",
    tag = "courses",
    request_body = CourseCreate,
    responses(
        (status = 200, description = "Course created", body = CourseOut),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Course title already used by this user", body = ErrorBody),
        (status = 422, description = "Invalid request body", body = ErrorBody)
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CourseCreate>,
) -> Result<Json<CourseOut>, ApiError> {
    let course = state.db.create_course(&req.into()).await?;
    info!("Created course {} for user {:?}", course.id, course.user_id);
    Ok(Json(course.into()))
}

/// Fetch a single course.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i32, Path, description = "Course id")),
    responses(
        (status = 200, description = "The course", body = CourseOut),
        (status = 404, description = "Course not found", body = ErrorBody)
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
) -> Result<Json<CourseOut>, ApiError> {
    let course = state.db.get_course(course_id).await?;
    Ok(Json(course.into()))
}

/// List every course.
#[utoipa::path(
    get,
    path = "/courses/",
    tag = "courses",
    responses((status = 200, description = "All courses", body = [CourseOut]))
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourseOut>>, ApiError> {
    let courses = state.db.list_courses().await?;
    Ok(Json(courses.into_iter().map(CourseOut::from).collect()))
}

/// Update the fields present in the body, leaving the rest untouched.
#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i32, Path, description = "Course id")),
    request_body = CourseUpdate,
    responses(
        (status = 200, description = "Updated course", body = CourseOut),
        (status = 404, description = "Course not found", body = ErrorBody),
        (status = 409, description = "Course title already used by this user", body = ErrorBody)
    )
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
    ValidatedJson(req): ValidatedJson<CourseUpdate>,
) -> Result<Json<CourseOut>, ApiError> {
    let course = state.db.update_course(course_id, &req.into()).await?;
    Ok(Json(course.into()))
}

/// Delete a course.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i32, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted", body = MessageResponse),
        (status = 404, description = "Course not found", body = ErrorBody)
    )
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_course(course_id).await?;
    info!("Deleted course {}", course_id);
    Ok(Json(MessageResponse {
        message: format!("Course with id {} deleted successfully.", course_id),
    }))
}

//=========================================================================================
// Summary Handlers
//=========================================================================================

/// Generate an AI summary of the course description.
///
/// Courses that already have a summary are returned unchanged. Each user may
/// generate at most three summaries per hour.
#[utoipa::path(
    post,
    path = "/generate_summary/{id}",
    tag = "courses",
    params(
        ("id" = i32, Path, description = "Course id"),
        ("x-api-key" = String, Header, description = "Shared API key")
    ),
    responses(
        (status = 200, description = "Course with its summary", body = CourseOut),
        (status = 401, description = "Invalid or missing API key", body = ErrorBody),
        (status = 404, description = "Course not found", body = ErrorBody),
        (status = 409, description = "A generation for this course is already running", body = ErrorBody),
        (status = 429, description = "Hourly summary quota exhausted", body = ErrorBody),
        (status = 500, description = "Summary provider failed", body = ErrorBody)
    )
)]
pub async fn generate_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
) -> Result<Json<CourseOut>, ApiError> {
    // 1. Reserve a slot against the owner's quota.
    let course = match state
        .db
        .claim_summary_slot(course_id, &state.summary_quota)
        .await?
    {
        SummaryClaim::AlreadySummarized(course) => {
            info!("Course {} already has a summary; skipping generation", course_id);
            return Ok(Json(course.into()));
        }
        SummaryClaim::Claimed(course) => course,
    };

    // 2. Ask the LLM and persist the result, handing the slot back on any failure.
    let result = async {
        let summary = state
            .summary_adapter
            .summarize_course(&course.course_description)
            .await?;
        if summary.trim().is_empty() {
            return Err(PortError::Unexpected(
                "Summary LLM returned an empty summary.".to_string(),
            ));
        }
        state.db.store_generated_summary(course_id, &summary).await
    }
    .await;

    match result {
        Ok(course) => {
            info!("Stored AI summary for course {}", course_id);
            Ok(Json(course.into()))
        }
        Err(e) => {
            error!("Summary generation failed for course {}: {:?}", course_id, e);
            if let Err(release_err) = state.db.release_summary_slot(course_id).await {
                warn!(
                    "Could not release summary slot for course {}: {:?}",
                    course_id, release_err
                );
            }
            Err(e.into())
        }
    }
}

/// Replace the summary with a reviewed one and mark the course `finalized`.
///
/// Needs no API key and does not count against the generation quota.
#[utoipa::path(
    put,
    path = "/courses/{id}/summary",
    tag = "courses",
    params(("id" = i32, Path, description = "Course id")),
    request_body = SummaryUpdate,
    responses(
        (status = 200, description = "Course with the finalized summary", body = CourseOut),
        (status = 404, description = "Course not found", body = ErrorBody)
    )
)]
pub async fn update_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
    ValidatedJson(req): ValidatedJson<SummaryUpdate>,
) -> Result<Json<CourseOut>, ApiError> {
    let course = state.db.finalize_summary(course_id, &req.ai_summary).await?;
    Ok(Json(course.into()))
}
