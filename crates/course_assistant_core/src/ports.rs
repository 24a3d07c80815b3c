//! crates/course_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The web layer only talks to these traits, so the database and the LLM
//! provider can be swapped without touching the handlers.

use async_trait::async_trait;
use crate::domain::{
    Course, CourseChanges, NewCourse, NewUser, SummaryQuota, User, UserChanges,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Outcome of trying to reserve an AI generation for a course.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryClaim {
    /// The course already carries a summary; it is returned untouched.
    AlreadySummarized(Course),
    /// A generation slot was reserved; the caller must either store a summary
    /// or release the slot.
    Claimed(Course),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Round-trips a trivial query to prove the database is reachable.
    async fn ping(&self) -> PortResult<()>;

    // --- Users ---
    async fn create_user(&self, user: &NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: i32) -> PortResult<User>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn update_user(&self, user_id: i32, changes: &UserChanges) -> PortResult<User>;

    /// Removes the user. Their courses are kept with no owner.
    async fn delete_user(&self, user_id: i32) -> PortResult<()>;

    // --- Courses ---
    async fn create_course(&self, course: &NewCourse) -> PortResult<Course>;

    async fn get_course(&self, course_id: i32) -> PortResult<Course>;

    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn update_course(&self, course_id: i32, changes: &CourseChanges)
        -> PortResult<Course>;

    async fn delete_course(&self, course_id: i32) -> PortResult<()>;

    // --- AI Summaries ---

    /// Atomically checks the owner's quota and reserves a generation slot.
    ///
    /// Fails with `NotFound` for an unknown course, `RateLimited` once the
    /// owner has used up `quota`, and `Conflict` while another generation for
    /// the same course is still in flight.
    async fn claim_summary_slot(
        &self,
        course_id: i32,
        quota: &SummaryQuota,
    ) -> PortResult<SummaryClaim>;

    /// Stores an AI summary for a claimed course and marks it `completed`.
    async fn store_generated_summary(&self, course_id: i32, summary: &str)
        -> PortResult<Course>;

    /// Gives back a slot after a failed generation.
    async fn release_summary_slot(&self, course_id: i32) -> PortResult<()>;

    /// Overwrites the summary with a reviewed one and marks it `finalized`.
    async fn finalize_summary(&self, course_id: i32, summary: &str) -> PortResult<Course>;
}

#[async_trait]
pub trait SummaryGenerationService: Send + Sync {
    /// Produces a short natural-language summary of a course description.
    async fn summarize_course(&self, description: &str) -> PortResult<String>;
}
