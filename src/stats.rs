use crate::models::{
    AppLimit, AppRemaining, DailyUsageRecord, TodayResponse, TrendPoint, TrendResponse,
    UsageHistory,
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const DAY_LABELS: [char; 7] = ['S', 'M', 'T', 'W', 'T', 'F', 'S'];

/// How a day without a record gets its limit in the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingDayLimit {
    /// The day shows a zero limit.
    Zero,
    /// The day borrows the limit totals of the most recent record on or
    /// before it, so a zero-usage day still has a denominator.
    #[default]
    LatestKnown,
}

impl MissingDayLimit {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero" => Some(Self::Zero),
            "latest" | "latest_known" => Some(Self::LatestKnown),
            _ => None,
        }
    }
}

/// Oldest first, ending at `today`.
pub fn last_7_days(today: NaiveDate) -> [NaiveDate; 7] {
    let mut days = [today; 7];
    for (slot, offset) in days.iter_mut().zip((0..7).rev()) {
        *slot = today - Duration::days(offset as i64);
    }
    days
}

pub fn day_label(date: NaiveDate) -> char {
    DAY_LABELS[date.weekday().num_days_from_sunday() as usize]
}

pub fn compute_trend(
    history: &UsageHistory,
    last_7_days: &[NaiveDate; 7],
    policy: MissingDayLimit,
) -> [TrendPoint; 7] {
    last_7_days.map(|date| {
        let (used_minutes, limit_minutes) = match history.get(date) {
            Some(record) => record.totals(),
            None => match policy {
                MissingDayLimit::Zero => (0, 0),
                MissingDayLimit::LatestKnown => (
                    0,
                    history
                        .latest_on_or_before(date)
                        .map(|record| record.totals().1)
                        .unwrap_or(0),
                ),
            },
        };
        TrendPoint {
            date,
            day_label: day_label(date),
            used_minutes,
            limit_minutes,
        }
    })
}

pub fn build_trend_at(
    today: NaiveDate,
    history: &UsageHistory,
    policy: MissingDayLimit,
) -> TrendResponse {
    let points = compute_trend(history, &last_7_days(today), policy);

    let (used_sum, limit_sum) = points.iter().fold((0u64, 0u64), |(used, limit), point| {
        (
            used + u64::from(point.used_minutes),
            limit + u64::from(point.limit_minutes),
        )
    });
    let denom = points.len() as f64;

    TrendResponse {
        points,
        average_used_minutes: used_sum as f64 / denom,
        average_limit_minutes: limit_sum as f64 / denom,
    }
}

/// Today's per-app breakdown. Without a record for today the configured
/// limits are shown with zero usage.
pub fn build_today_at(today: NaiveDate, history: &UsageHistory, limits: &[AppLimit]) -> TodayResponse {
    let record = history
        .get(today)
        .cloned()
        .unwrap_or_else(|| DailyUsageRecord::seeded(today, limits));

    let apps: Vec<AppRemaining> = record
        .app_usage
        .iter()
        .map(|app| AppRemaining {
            app_name: app.app_name.clone(),
            used_minutes: app.used_minutes,
            limit_minutes: app.limit_minutes,
            remaining_minutes: app.limit_minutes.saturating_sub(app.used_minutes),
        })
        .collect();
    let total_remaining_minutes = apps
        .iter()
        .fold(0u32, |sum, app| sum.saturating_add(app.remaining_minutes));

    TodayResponse {
        date: today,
        within_limit: record.within_limit(),
        apps,
        total_remaining_minutes,
    }
}
