//! crates/course_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

/// A registered user. Owns zero or more courses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// The fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// A partial update to a user. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Where a course is in its summary lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseStatus {
    #[default]
    Pending,
    Completed,
    Finalized,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Pending => "pending",
            CourseStatus::Completed => "completed",
            CourseStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CourseStatus::Pending),
            "completed" => Ok(CourseStatus::Completed),
            "finalized" => Ok(CourseStatus::Finalized),
            other => Err(format!("unknown course status '{}'", other)),
        }
    }
}

/// An online course belonging to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: i32,
    /// `None` once the owning user has been deleted.
    pub user_id: Option<i32>,
    pub course_title: String,
    pub course_description: String,
    pub ai_summary: Option<String>,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// A course with a non-empty summary is never sent to the LLM again.
    pub fn has_summary(&self) -> bool {
        self.ai_summary.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub user_id: i32,
    pub course_title: String,
    pub course_description: String,
}

/// A partial update to a course. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub course_title: Option<String>,
    pub course_description: Option<String>,
    pub status: Option<CourseStatus>,
}

/// How many AI summaries a single user may generate inside a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryQuota {
    pub limit: i64,
    pub window_secs: i64,
}

impl SummaryQuota {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }

    /// The earliest generation time that still counts against the quota.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }
}

impl Default for SummaryQuota {
    /// Three generations per hour.
    fn default() -> Self {
        Self {
            limit: 3,
            window_secs: 60 * 60,
        }
    }
}
