//! services/api/src/web/rest.rs
//!
//! Master definition for the OpenAPI specification of the REST API.

use crate::error::{ErrorBody, FieldError};
use crate::web::{
    courses, health,
    schemas::{
        CourseCreate, CourseOut, CourseStatusDto, CourseUpdate, MessageResponse, SummaryUpdate,
        UserCreate, UserOut, UserUpdate,
    },
    users,
};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        users::create_user_handler,
        users::get_user_handler,
        users::list_users_handler,
        users::update_user_handler,
        users::delete_user_handler,
        courses::create_course_handler,
        courses::get_course_handler,
        courses::list_courses_handler,
        courses::update_course_handler,
        courses::delete_course_handler,
        courses::generate_summary_handler,
        courses::update_summary_handler,
        health::health_handler,
    ),
    components(
        schemas(
            UserCreate, UserUpdate, UserOut,
            CourseCreate, CourseUpdate, CourseOut, CourseStatusDto, SummaryUpdate,
            MessageResponse, ErrorBody, FieldError, health::HealthResponse
        )
    ),
    tags(
        (name = "users", description = "User accounts."),
        (name = "courses", description = "Courses and their AI summaries."),
        (name = "health", description = "Service health.")
    )
)]
pub struct ApiDoc;
