use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/signup", post(handlers::signup))
        .route("/api/onboarding", post(handlers::onboarding))
        .route("/api/today", get(handlers::get_today))
        .route("/api/usage", post(handlers::record_usage))
        .route("/api/limits", put(handlers::update_limits))
        .route("/api/streak", get(handlers::get_streak))
        .route("/api/trend", get(handlers::get_trend))
        .route("/api/calendar", get(handlers::get_calendar))
        .route("/api/leaderboard", get(handlers::get_leaderboard))
        .route("/api/leaderboard/:user_id", get(handlers::get_friend_stats))
        .route(
            "/api/settings/goals",
            get(handlers::get_goals).put(handlers::update_goals),
        )
        .route(
            "/api/settings/notifications",
            get(handlers::get_notifications).put(handlers::update_notifications),
        )
        .route("/api/account", put(handlers::update_account))
        .route("/api/encouragements", get(handlers::get_encouragements))
        .route(
            "/api/encouragements/:user_id",
            post(handlers::send_encouragement),
        )
        .with_state(state)
}
