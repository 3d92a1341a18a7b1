use crate::document::{parse_history, parse_limits, raw_limits, UserDocument};
use crate::errors::AppError;
use crate::leaderboard::{build_leaderboard_at, friend_stats_at};
use crate::models::{
    AccountRequest, AppLimit, AppUsage, CalendarResponse, DailyUsageRecord, Encouragement,
    EncouragementRequest, FriendStatsResponse, GoalSettings, LeaderboardEntry, LeaderboardQuery,
    LimitsRequest, NotificationSettings, ProfileResponse, SignupRequest, StreakResponse,
    TodayResponse, TrendResponse, UsageHistory, UsageRequest,
};
use crate::session::Session;
use crate::state::AppState;
use crate::stats::{build_today_at, build_trend_at};
use crate::storage::{persist_data, AppData};
use crate::streak::{compute_streak, longest_streak, streak_label, streak_periods};
use crate::validation::{describe, validate_goals, validate_signup};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use tracing::info;

pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_signup(payload.email.trim(), &payload.password, payload.agreed_to_terms)
        .map_err(|errors| AppError::bad_request(describe(&errors)))?;
    let name = required_name(&payload.name)?;

    let mut data = state.data.lock().await;
    let doc = data.users.entry(session.user_id.clone()).or_default();
    doc.name = Some(name);
    doc.email = Some(payload.email.trim().to_string());
    let response = profile(&session.user_id, doc);

    persist_data(&state.config.data_path, &data).await?;
    info!("registered profile for user {}", session.user_id);
    Ok(Json(response))
}

pub async fn onboarding(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LimitsRequest>,
) -> Result<Json<TodayResponse>, AppError> {
    let limits = clean_limits(payload.limits)?;
    let date = today();

    let mut data = state.data.lock().await;
    let doc = data.users.entry(session.user_id.clone()).or_default();
    if !parse_history(&session.user_id, doc).is_empty() {
        return Err(AppError::conflict("onboarding already completed"));
    }
    doc.limits = Some(raw_limits(&limits));
    doc.upsert_record(&DailyUsageRecord::seeded(date, &limits));
    let response = build_today_at(date, &parse_history(&session.user_id, doc), &limits);

    persist_data(&state.config.data_path, &data).await?;
    info!("onboarded user {} with {} tracked apps", session.user_id, limits.len());
    Ok(Json(response))
}

pub async fn get_today(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<TodayResponse>, AppError> {
    let data = state.data.lock().await;
    let (history, limits) = user_view(&data, &session.user_id);
    Ok(Json(build_today_at(today(), &history, &limits)))
}

/// Sets today's used minutes for one tracked app. Only the current day is
/// ever written.
pub async fn record_usage(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<UsageRequest>,
) -> Result<Json<TodayResponse>, AppError> {
    let app_name = payload.app_name.trim();
    if app_name.is_empty() {
        return Err(AppError::bad_request("app_name must not be empty"));
    }
    let date = today();

    let mut data = state.data.lock().await;
    let doc = data
        .users
        .get_mut(&session.user_id)
        .ok_or_else(|| AppError::not_found("no usage document for this user"))?;
    let history = parse_history(&session.user_id, doc);
    let limits = parse_limits(doc);

    let mut record = history
        .get(date)
        .cloned()
        .unwrap_or_else(|| DailyUsageRecord::seeded(date, &limits));
    match record.app_usage.iter_mut().find(|app| app.app_name == app_name) {
        Some(app) => app.used_minutes = payload.used_minutes,
        None => {
            let limit = limits
                .iter()
                .find(|limit| limit.app_name == app_name)
                .ok_or_else(|| AppError::bad_request(format!("'{app_name}' is not a tracked app")))?;
            record.app_usage.push(AppUsage {
                app_name: app_name.to_string(),
                used_minutes: payload.used_minutes,
                limit_minutes: limit.limit_minutes,
            });
        }
    }
    doc.upsert_record(&record);
    let response = build_today_at(date, &parse_history(&session.user_id, doc), &limits);

    persist_data(&state.config.data_path, &data).await?;
    Ok(Json(response))
}

/// Replaces the configured limits. Days already recorded keep theirs.
pub async fn update_limits(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LimitsRequest>,
) -> Result<Json<Vec<AppLimit>>, AppError> {
    let limits = clean_limits(payload.limits)?;

    let mut data = state.data.lock().await;
    let doc = data.users.entry(session.user_id.clone()).or_default();
    doc.limits = Some(raw_limits(&limits));

    persist_data(&state.config.data_path, &data).await?;
    Ok(Json(limits))
}

pub async fn get_streak(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StreakResponse>, AppError> {
    let data = state.data.lock().await;
    let (history, _) = user_view(&data, &session.user_id);
    let date = today();
    let streak = compute_streak(&history, date);

    Ok(Json(StreakResponse {
        streak,
        longest_streak: longest_streak(&history, date),
        label: streak_label(streak),
    }))
}

pub async fn get_trend(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<TrendResponse>, AppError> {
    let data = state.data.lock().await;
    let (history, _) = user_view(&data, &session.user_id);
    Ok(Json(build_trend_at(today(), &history, state.config.missing_day_limit)))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CalendarResponse>, AppError> {
    let data = state.data.lock().await;
    let (history, _) = user_view(&data, &session.user_id);
    let date = today();
    Ok(Json(CalendarResponse {
        today: date,
        days: streak_periods(&history, date),
    }))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let data = state.data.lock().await;
    let mut entries = build_leaderboard_at(today(), &data.users, &session.user_id);
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }
    Ok(Json(entries))
}

pub async fn get_friend_stats(
    State(state): State<AppState>,
    _session: Session,
    Path(user_id): Path<String>,
) -> Result<Json<FriendStatsResponse>, AppError> {
    let data = state.data.lock().await;
    let doc = data
        .users
        .get(&user_id)
        .ok_or_else(|| AppError::not_found(format!("no user '{user_id}'")))?;
    Ok(Json(friend_stats_at(today(), &user_id, doc)))
}

pub async fn get_goals(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<GoalSettings>, AppError> {
    let data = state.data.lock().await;
    let goals = data
        .settings
        .get(&session.user_id)
        .cloned()
        .unwrap_or_default()
        .goals(today());
    Ok(Json(goals))
}

pub async fn update_goals(
    State(state): State<AppState>,
    session: Session,
    Json(mut payload): Json<GoalSettings>,
) -> Result<Json<GoalSettings>, AppError> {
    validate_goals(&payload).map_err(|errors| AppError::bad_request(describe(&errors)))?;
    payload.description = payload.description.trim().to_string();

    let mut data = state.data.lock().await;
    data.settings
        .entry(session.user_id.clone())
        .or_default()
        .set_goals(&payload);

    persist_data(&state.config.data_path, &data).await?;
    Ok(Json(payload))
}

pub async fn get_notifications(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<NotificationSettings>, AppError> {
    let data = state.data.lock().await;
    let settings = data
        .settings
        .get(&session.user_id)
        .map(|doc| doc.notifications())
        .unwrap_or_default();
    Ok(Json(settings))
}

pub async fn update_notifications(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<NotificationSettings>,
) -> Result<Json<NotificationSettings>, AppError> {
    let mut data = state.data.lock().await;
    data.settings
        .entry(session.user_id.clone())
        .or_default()
        .set_notifications(&payload);

    persist_data(&state.config.data_path, &data).await?;
    Ok(Json(payload))
}

pub async fn update_account(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AccountRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let name = required_name(&payload.name)?;

    let mut data = state.data.lock().await;
    let doc = data.users.entry(session.user_id.clone()).or_default();
    doc.name = Some(name);
    let response = profile(&session.user_id, doc);

    persist_data(&state.config.data_path, &data).await?;
    Ok(Json(response))
}

/// Newest first.
pub async fn get_encouragements(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Encouragement>>, AppError> {
    let data = state.data.lock().await;
    let mut messages = data
        .users
        .get(&session.user_id)
        .and_then(|doc| doc.encouragements.clone())
        .unwrap_or_default();
    messages.reverse();
    Ok(Json(messages))
}

pub async fn send_encouragement(
    State(state): State<AppState>,
    session: Session,
    Path(user_id): Path<String>,
    Json(payload): Json<EncouragementRequest>,
) -> Result<Json<Encouragement>, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("message must not be empty"));
    }

    let mut data = state.data.lock().await;
    let sender = data
        .users
        .get(&session.user_id)
        .map(|doc| doc.display_name(&session.user_id))
        .unwrap_or_else(|| session.user_id.clone());
    let doc = data
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::not_found(format!("no user '{user_id}'")))?;
    let encouragement = Encouragement {
        message: message.to_string(),
        sender,
    };
    doc.encouragements
        .get_or_insert_with(Vec::new)
        .push(encouragement.clone());

    persist_data(&state.config.data_path, &data).await?;
    Ok(Json(encouragement))
}

/// A user without a document reads as empty history and no limits.
fn user_view(data: &AppData, user_id: &str) -> (UsageHistory, Vec<AppLimit>) {
    match data.users.get(user_id) {
        Some(doc) => (parse_history(user_id, doc), parse_limits(doc)),
        None => (UsageHistory::default(), Vec::new()),
    }
}

fn clean_limits(limits: Vec<AppLimit>) -> Result<Vec<AppLimit>, AppError> {
    let mut seen = HashSet::new();
    limits
        .into_iter()
        .map(|limit| {
            let app_name = limit.app_name.trim().to_string();
            if app_name.is_empty() {
                return Err(AppError::bad_request("app_name must not be empty"));
            }
            if !seen.insert(app_name.clone()) {
                return Err(AppError::bad_request(format!("duplicate limit for '{app_name}'")));
            }
            Ok(AppLimit {
                app_name,
                limit_minutes: limit.limit_minutes,
            })
        })
        .collect()
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    Ok(name.to_string())
}

fn profile(user_id: &str, doc: &UserDocument) -> ProfileResponse {
    ProfileResponse {
        user_id: user_id.to_string(),
        name: doc.display_name(user_id),
        email: doc.email.clone(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
