//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use course_assistant_core::domain::SummaryQuota;
use course_assistant_core::ports::{DatabaseService, SummaryGenerationService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub summary_adapter: Arc<dyn SummaryGenerationService>,
    pub summary_quota: SummaryQuota,
}
