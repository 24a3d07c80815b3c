pub mod courses;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod rest;
pub mod schemas;
pub mod state;
pub mod users;

pub use middleware::require_api_key;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use courses::{
    create_course_handler, delete_course_handler, generate_summary_handler,
    get_course_handler, list_courses_handler, update_course_handler, update_summary_handler,
};
use health::health_handler;
use rest::ApiDoc;
use state::AppState;
use users::{
    create_user_handler, delete_user_handler, get_user_handler, list_users_handler,
    update_user_handler,
};

/// Builds the complete application router: the REST API, the Swagger UI,
/// request tracing and CORS.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(app_state.config.cors_allowed_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::API_KEY_HEADER),
        ]);

    // Public routes (no API key required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(create_user_handler).get(list_users_handler))
        .route("/users/", post(create_user_handler).get(list_users_handler))
        .route(
            "/users/{id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route("/courses", post(create_course_handler).get(list_courses_handler))
        .route("/courses/", post(create_course_handler).get(list_courses_handler))
        .route(
            "/courses/{id}",
            get(get_course_handler)
                .put(update_course_handler)
                .delete(delete_course_handler),
        )
        .route("/courses/{id}/summary", put(update_summary_handler));

    // Protected routes (x-api-key required)
    let protected_routes = Router::new()
        .route("/generate_summary/{id}", post(generate_summary_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_api_key,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
