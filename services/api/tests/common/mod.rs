//! Shared test harness: the real router wired to in-memory port implementations.

#![allow(dead_code)]

use api_lib::{
    config::Config,
    web::{build_router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use course_assistant_core::domain::{
    Course, CourseChanges, CourseStatus, NewCourse, NewUser, SummaryQuota, User, UserChanges,
};
use course_assistant_core::ports::{
    DatabaseService, PortError, PortResult, SummaryClaim, SummaryGenerationService,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tower::util::ServiceExt; // for `oneshot`

pub const API_KEY: &str = "test-api-key";

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

struct StoredCourse {
    course: Course,
    summary_generated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Store {
    next_user_id: i32,
    next_course_id: i32,
    users: BTreeMap<i32, User>,
    courses: BTreeMap<i32, StoredCourse>,
    reachable_override: Option<bool>,
    fail_summary_store: bool,
}

/// Mirrors the constraints of the Postgres schema: unique emails, unique
/// titles per owner, owner must exist on insert, owner nulled on delete.
#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

impl InMemoryDb {
    pub async fn course_count(&self) -> usize {
        self.store.lock().await.courses.len()
    }

    /// Moves every generation stamp back in time.
    pub async fn age_generations(&self, by: Duration) {
        let mut store = self.store.lock().await;
        for stored in store.courses.values_mut() {
            if let Some(at) = stored.summary_generated_at.as_mut() {
                *at -= by;
            }
        }
    }

    pub async fn set_unreachable(&self) {
        self.store.lock().await.reachable_override = Some(false);
    }

    /// Makes `store_generated_summary` fail until reset.
    pub async fn set_summary_store_failing(&self, failing: bool) {
        self.store.lock().await.fail_summary_store = failing;
    }

    pub async fn generation_stamp(&self, course_id: i32) -> Option<DateTime<Utc>> {
        let store = self.store.lock().await;
        store.courses.get(&course_id).and_then(|s| s.summary_generated_at)
    }
}

fn user_not_found() -> PortError {
    PortError::NotFound("User not found.".to_string())
}

fn course_not_found() -> PortError {
    PortError::NotFound("Course not found.".to_string())
}

impl Store {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn title_taken(&self, user_id: Option<i32>, title: &str, except: Option<i32>) -> bool {
        self.courses.values().any(|s| {
            s.course.user_id.is_some()
                && s.course.user_id == user_id
                && s.course.course_title == title
                && Some(s.course.id) != except
        })
    }

    fn course_mut(&mut self, course_id: i32) -> PortResult<&mut StoredCourse> {
        self.courses.get_mut(&course_id).ok_or_else(course_not_found)
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn ping(&self) -> PortResult<()> {
        match self.store.lock().await.reachable_override {
            Some(false) => Err(PortError::Unexpected("connection refused".to_string())),
            _ => Ok(()),
        }
    }

    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        let mut store = self.store.lock().await;
        if store.email_taken(&user.email, None) {
            return Err(PortError::Conflict("Email already registered.".to_string()));
        }
        store.next_user_id += 1;
        let created = User {
            id: store.next_user_id,
            name: user.name.clone(),
            email: user.email.clone(),
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: i32) -> PortResult<User> {
        let store = self.store.lock().await;
        store.users.get(&user_id).cloned().ok_or_else(user_not_found)
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(self.store.lock().await.users.values().cloned().collect())
    }

    async fn update_user(&self, user_id: i32, changes: &UserChanges) -> PortResult<User> {
        let mut store = self.store.lock().await;
        if !store.users.contains_key(&user_id) {
            return Err(user_not_found());
        }
        if let Some(email) = &changes.email {
            if store.email_taken(email, Some(user_id)) {
                return Err(PortError::Conflict("Email already registered.".to_string()));
            }
        }
        let user = store.users.get_mut(&user_id).ok_or_else(user_not_found)?;
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: i32) -> PortResult<()> {
        let mut store = self.store.lock().await;
        store.users.remove(&user_id).ok_or_else(user_not_found)?;
        for stored in store.courses.values_mut() {
            if stored.course.user_id == Some(user_id) {
                stored.course.user_id = None;
            }
        }
        Ok(())
    }

    async fn create_course(&self, course: &NewCourse) -> PortResult<Course> {
        let mut store = self.store.lock().await;
        if !store.users.contains_key(&course.user_id) {
            return Err(user_not_found());
        }
        if store.title_taken(Some(course.user_id), &course.course_title, None) {
            return Err(PortError::Conflict(
                "Course already exists for this user.".to_string(),
            ));
        }
        store.next_course_id += 1;
        let created = Course {
            id: store.next_course_id,
            user_id: Some(course.user_id),
            course_title: course.course_title.clone(),
            course_description: course.course_description.clone(),
            ai_summary: None,
            status: CourseStatus::Pending,
            created_at: Utc::now(),
        };
        store.courses.insert(
            created.id,
            StoredCourse {
                course: created.clone(),
                summary_generated_at: None,
            },
        );
        Ok(created)
    }

    async fn get_course(&self, course_id: i32) -> PortResult<Course> {
        let store = self.store.lock().await;
        store
            .courses
            .get(&course_id)
            .map(|s| s.course.clone())
            .ok_or_else(course_not_found)
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let store = self.store.lock().await;
        Ok(store.courses.values().map(|s| s.course.clone()).collect())
    }

    async fn update_course(
        &self,
        course_id: i32,
        changes: &CourseChanges,
    ) -> PortResult<Course> {
        let mut store = self.store.lock().await;
        let owner = store.course_mut(course_id)?.course.user_id;
        if let Some(title) = &changes.course_title {
            if store.title_taken(owner, title, Some(course_id)) {
                return Err(PortError::Conflict(
                    "Course already exists for this user.".to_string(),
                ));
            }
        }
        let course = &mut store.course_mut(course_id)?.course;
        if let Some(title) = &changes.course_title {
            course.course_title = title.clone();
        }
        if let Some(description) = &changes.course_description {
            course.course_description = description.clone();
        }
        if let Some(status) = changes.status {
            course.status = status;
        }
        Ok(course.clone())
    }

    async fn delete_course(&self, course_id: i32) -> PortResult<()> {
        let mut store = self.store.lock().await;
        store
            .courses
            .remove(&course_id)
            .map(|_| ())
            .ok_or_else(course_not_found)
    }

    async fn claim_summary_slot(
        &self,
        course_id: i32,
        quota: &SummaryQuota,
    ) -> PortResult<SummaryClaim> {
        let now = Utc::now();
        let window_start = quota.window_start(now);
        let mut store = self.store.lock().await;

        let stored = store.courses.get(&course_id).ok_or_else(course_not_found)?;
        let course = stored.course.clone();
        if course.has_summary() {
            return Ok(SummaryClaim::AlreadySummarized(course));
        }
        if stored.summary_generated_at.is_some_and(|at| at >= window_start) {
            return Err(PortError::Conflict(
                "Summary generation already in progress.".to_string(),
            ));
        }

        let used = store
            .courses
            .values()
            .filter(|s| s.course.user_id == course.user_id)
            .filter(|s| s.summary_generated_at.is_some_and(|at| at >= window_start))
            .count() as i64;
        if used >= quota.limit {
            return Err(PortError::RateLimited(format!(
                "You can only generate {} summaries per hour.",
                quota.limit
            )));
        }

        store.course_mut(course_id)?.summary_generated_at = Some(now);
        Ok(SummaryClaim::Claimed(course))
    }

    async fn store_generated_summary(
        &self,
        course_id: i32,
        summary: &str,
    ) -> PortResult<Course> {
        let mut store = self.store.lock().await;
        if store.fail_summary_store {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        let course = &mut store.course_mut(course_id)?.course;
        if course.ai_summary.is_none() {
            course.ai_summary = Some(summary.to_string());
            course.status = CourseStatus::Completed;
        }
        Ok(course.clone())
    }

    async fn release_summary_slot(&self, course_id: i32) -> PortResult<()> {
        let mut store = self.store.lock().await;
        if let Some(stored) = store.courses.get_mut(&course_id) {
            if stored.course.ai_summary.is_none() {
                stored.summary_generated_at = None;
            }
        }
        Ok(())
    }

    async fn finalize_summary(&self, course_id: i32, summary: &str) -> PortResult<Course> {
        let mut store = self.store.lock().await;
        let course = &mut store.course_mut(course_id)?.course;
        course.ai_summary = Some(summary.to_string());
        course.status = CourseStatus::Finalized;
        Ok(course.clone())
    }
}

//=========================================================================================
// Fake SummaryGenerationService
//=========================================================================================

/// A hand-written summary to save while a generation is in flight.
struct ConcurrentEdit {
    db: Arc<InMemoryDb>,
    course_id: i32,
    summary: String,
}

/// Echoes the description back and records how often it was called.
#[derive(Default)]
pub struct FakeSummarizer {
    calls: AtomicUsize,
    failing: AtomicBool,
    reply: StdMutex<Option<String>>,
    edit_during_call: StdMutex<Option<ConcurrentEdit>>,
}

impl FakeSummarizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replaces the echoed summary with a fixed reply.
    pub fn set_reply(&self, reply: Option<&str>) {
        *self.reply.lock().unwrap() = reply.map(str::to_string);
    }

    /// On the next call, finalizes `course_id` with `summary` before replying.
    pub fn finalize_during_next_call(&self, db: Arc<InMemoryDb>, course_id: i32, summary: &str) {
        *self.edit_during_call.lock().unwrap() = Some(ConcurrentEdit {
            db,
            course_id,
            summary: summary.to_string(),
        });
    }
}

#[async_trait]
impl SummaryGenerationService for FakeSummarizer {
    async fn summarize_course(&self, description: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("upstream timed out".to_string()));
        }
        let edit = self.edit_during_call.lock().unwrap().take();
        if let Some(edit) = edit {
            edit.db.finalize_summary(edit.course_id, &edit.summary).await?;
        }
        let reply = self.reply.lock().unwrap().clone();
        Ok(reply.unwrap_or_else(|| format!("Summary of: {}", description)))
    }
}

//=========================================================================================
// Test App
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub summarizer: Arc<FakeSummarizer>,
}

pub fn test_config(api_key: Option<&str>) -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/course_assistant_test".to_string()),
        "API_KEY" => api_key.map(str::to_string),
        _ => None,
    })
    .expect("test config should load")
}

pub fn test_app() -> TestApp {
    test_app_with_config(test_config(Some(API_KEY)))
}

pub fn test_app_with_config(config: Config) -> TestApp {
    let db = Arc::new(InMemoryDb::default());
    let summarizer = Arc::new(FakeSummarizer::default());
    let state = Arc::new(AppState {
        db: db.clone(),
        config: Arc::new(config),
        summary_adapter: summarizer.clone(),
        summary_quota: SummaryQuota::default(),
    });
    TestApp {
        router: build_router(state),
        db,
        summarizer,
    }
}

impl TestApp {
    /// Sends one request through the router and decodes the JSON response.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        api_key: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, json)
    }

    pub async fn create_user(&self, name: &str, email: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/users",
                Some(serde_json::json!({ "name": name, "email": email })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create user failed: {}", body);
        body
    }

    pub async fn create_course(&self, user_id: i64, title: &str, description: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/courses/",
                Some(serde_json::json!({
                    "user_id": user_id,
                    "course_title": title,
                    "course_description": description,
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create course failed: {}", body);
        body
    }

    pub async fn generate(&self, course_id: i64) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/generate_summary/{}", course_id),
            None,
            Some(API_KEY),
        )
        .await
    }
}
