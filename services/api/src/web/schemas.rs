//! services/api/src/web/schemas.rs
//!
//! Request and response payloads for the REST API. Request types carry their
//! validation rules; response types are built from the core domain structs.

use chrono::{DateTime, Utc};
use course_assistant_core::domain::{
    Course, CourseChanges, CourseStatus, NewCourse, NewUser, User, UserChanges,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
}

impl From<UserCreate> for NewUser {
    fn from(req: UserCreate) -> Self {
        NewUser {
            name: req.name,
            email: req.email,
        }
    }
}

/// Partial update: omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
}

impl From<UserUpdate> for UserChanges {
    fn from(req: UserUpdate) -> Self {
        UserChanges {
            name: req.name,
            email: req.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserOut {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        UserOut {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

//=========================================================================================
// Courses
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatusDto {
    Pending,
    Completed,
    Finalized,
}

impl From<CourseStatus> for CourseStatusDto {
    fn from(status: CourseStatus) -> Self {
        match status {
            CourseStatus::Pending => CourseStatusDto::Pending,
            CourseStatus::Completed => CourseStatusDto::Completed,
            CourseStatus::Finalized => CourseStatusDto::Finalized,
        }
    }
}

impl From<CourseStatusDto> for CourseStatus {
    fn from(status: CourseStatusDto) -> Self {
        match status {
            CourseStatusDto::Pending => CourseStatus::Pending,
            CourseStatusDto::Completed => CourseStatus::Completed,
            CourseStatusDto::Finalized => CourseStatus::Finalized,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CourseCreate {
    pub user_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub course_title: String,
    #[validate(length(min = 1))]
    pub course_description: String,
}

impl From<CourseCreate> for NewCourse {
    fn from(req: CourseCreate) -> Self {
        NewCourse {
            user_id: req.user_id,
            course_title: req.course_title,
            course_description: req.course_description,
        }
    }
}

/// Partial update: omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CourseUpdate {
    #[validate(length(min = 1, max = 255))]
    pub course_title: Option<String>,
    #[validate(length(min = 1))]
    pub course_description: Option<String>,
    pub status: Option<CourseStatusDto>,
}

impl From<CourseUpdate> for CourseChanges {
    fn from(req: CourseUpdate) -> Self {
        CourseChanges {
            course_title: req.course_title,
            course_description: req.course_description,
            status: req.status.map(CourseStatus::from),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SummaryUpdate {
    #[validate(length(min = 1))]
    pub ai_summary: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseOut {
    pub id: i32,
    /// `null` once the owning user has been deleted.
    pub user_id: Option<i32>,
    pub course_title: String,
    pub course_description: String,
    pub ai_summary: Option<String>,
    pub status: CourseStatusDto,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseOut {
    fn from(course: Course) -> Self {
        CourseOut {
            id: course.id,
            user_id: course.user_id,
            course_title: course.course_title,
            course_description: course.course_description,
            ai_summary: course.ai_summary,
            status: course.status.into(),
            created_at: course.created_at,
        }
    }
}

//=========================================================================================
// Shared
//=========================================================================================

/// Confirmation returned by the delete endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
