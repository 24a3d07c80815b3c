//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_assistant_core::domain::{
    Course, CourseChanges, CourseStatus, NewCourse, NewUser, SummaryQuota, User, UserChanges,
};
use course_assistant_core::ports::{DatabaseService, PortError, PortResult, SummaryClaim};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

const USER_COLUMNS: &str = "id, name, email";
const COURSE_COLUMNS: &str =
    "id, user_id, course_title, course_description, ai_summary, status, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `users` and `courses` tables if they do not exist yet.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Waits for checked-out connections to come back, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed.");
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i32,
    name: String,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: i32,
    user_id: Option<i32>,
    course_title: String,
    course_description: String,
    ai_summary: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> PortResult<Course> {
        let status = self
            .status
            .parse::<CourseStatus>()
            .map_err(PortError::Unexpected)?;
        Ok(Course {
            id: self.id,
            user_id: self.user_id,
            course_title: self.course_title,
            course_description: self.course_description,
            ai_summary: self.ai_summary,
            status,
            created_at: self.created_at,
        })
    }
}

/// A course row together with its generation stamp, read while claiming a slot.
#[derive(FromRow)]
struct ClaimRecord {
    #[sqlx(flatten)]
    course: CourseRecord,
    summary_generated_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn user_not_found() -> PortError {
    PortError::NotFound("User not found.".to_string())
}

fn course_not_found() -> PortError {
    PortError::NotFound("Course not found.".to_string())
}

/// Maps a failed user write, turning the unique email index into a conflict.
fn map_user_write_error(e: sqlx::Error) -> PortError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return PortError::Conflict("Email already registered.".to_string());
        }
    }
    unexpected(e)
}

/// Maps a failed course write. The foreign key guards the owner and the
/// `(user_id, course_title)` index guards duplicate titles.
fn map_course_write_error(e: sqlx::Error) -> PortError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return user_not_found();
        }
        if db_err.is_unique_violation() {
            return PortError::Conflict("Course already exists for this user.".to_string());
        }
    }
    unexpected(e)
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_write_error)?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: i32) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(user_not_found)?;
        Ok(record.to_domain())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_user(&self, user_id: i32, changes: &UserChanges) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email) \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_write_error)?
        .ok_or_else(user_not_found)?;
        Ok(record.to_domain())
    }

    async fn delete_user(&self, user_id: i32) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(user_not_found());
        }
        Ok(())
    }

    async fn create_course(&self, course: &NewCourse) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "INSERT INTO courses (user_id, course_title, course_description, status) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(course.user_id)
        .bind(&course.course_title)
        .bind(&course.course_description)
        .bind(CourseStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_course_write_error)?;
        record.to_domain()
    }

    async fn get_course(&self, course_id: i32) -> PortResult<Course> {
        sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(course_not_found)?
        .to_domain()
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {} FROM courses ORDER BY id",
            COURSE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_course(
        &self,
        course_id: i32,
        changes: &CourseChanges,
    ) -> PortResult<Course> {
        sqlx::query_as::<_, CourseRecord>(&format!(
            "UPDATE courses SET \
                course_title = COALESCE($2, course_title), \
                course_description = COALESCE($3, course_description), \
                status = COALESCE($4, status) \
             WHERE id = $1 RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .bind(changes.course_title.as_deref())
        .bind(changes.course_description.as_deref())
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_course_write_error)?
        .ok_or_else(course_not_found)?
        .to_domain()
    }

    async fn delete_course(&self, course_id: i32) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(course_not_found());
        }
        Ok(())
    }

    async fn claim_summary_slot(
        &self,
        course_id: i32,
        quota: &SummaryQuota,
    ) -> PortResult<SummaryClaim> {
        let now = Utc::now();
        let window_start = quota.window_start(now);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let claim = sqlx::query_as::<_, ClaimRecord>(&format!(
            "SELECT {}, summary_generated_at FROM courses WHERE id = $1 FOR UPDATE",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(course_not_found)?;

        let in_flight = claim
            .summary_generated_at
            .is_some_and(|at| at >= window_start);
        let course = claim.course.to_domain()?;

        if course.has_summary() {
            return Ok(SummaryClaim::AlreadySummarized(course));
        }
        if in_flight {
            return Err(PortError::Conflict(
                "Summary generation already in progress.".to_string(),
            ));
        }

        // Serializes quota checks per owner; released when the transaction ends.
        // Orphaned courses share key 0.
        let lock_key = course.user_id.map(i64::from).unwrap_or(0);
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(lock_key)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let used = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM courses \
             WHERE user_id IS NOT DISTINCT FROM $1 AND summary_generated_at >= $2",
        )
        .bind(course.user_id)
        .bind(window_start)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        if used >= quota.limit {
            debug!(course_id, used, "Summary quota exhausted");
            return Err(PortError::RateLimited(format!(
                "You can only generate {} summaries per hour.",
                quota.limit
            )));
        }

        sqlx::query("UPDATE courses SET summary_generated_at = $2 WHERE id = $1")
            .bind(course_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;

        Ok(SummaryClaim::Claimed(course))
    }

    async fn store_generated_summary(
        &self,
        course_id: i32,
        summary: &str,
    ) -> PortResult<Course> {
        // A summary saved by hand while the LLM call ran takes precedence.
        let stored = sqlx::query_as::<_, CourseRecord>(&format!(
            "UPDATE courses SET ai_summary = $2, status = $3 \
             WHERE id = $1 AND ai_summary IS NULL RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .bind(summary)
        .bind(CourseStatus::Completed.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match stored {
            Some(record) => record.to_domain(),
            None => self.get_course(course_id).await,
        }
    }

    async fn release_summary_slot(&self, course_id: i32) -> PortResult<()> {
        sqlx::query(
            "UPDATE courses SET summary_generated_at = NULL \
             WHERE id = $1 AND ai_summary IS NULL",
        )
        .bind(course_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn finalize_summary(&self, course_id: i32, summary: &str) -> PortResult<Course> {
        sqlx::query_as::<_, CourseRecord>(&format!(
            "UPDATE courses SET ai_summary = $2, status = $3 WHERE id = $1 RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .bind(summary)
        .bind(CourseStatus::Finalized.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(course_not_found)?
        .to_domain()
    }
}
