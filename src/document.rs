//! Loosely-typed documents as they sit in the store, and the parsing step
//! that turns them into the typed model.
//!
//! Documents carry the remote store's camelCase field names and every field
//! is optional. Nothing past this module sees a partial record.

use crate::models::{
    AppLimit, AppUsage, DailyUsageRecord, Encouragement, GoalSettings, GoalType,
    NotificationSettings, UsageHistory,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("record has no date")]
    MissingDate,
    #[error("unparseable date '{0}'")]
    InvalidDate(String),
    #[error("app entry on {0} has no name")]
    MissingAppName(NaiveDate),
    #[error("negative minutes for '{app}' on {date}")]
    NegativeMinutes { app: String, date: NaiveDate },
    #[error("duplicate record for {0}, keeping the last one")]
    DuplicateDate(NaiveDate),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDailyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_usage: Option<Vec<RawAppUsage>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Vec<RawAppLimit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_data: Option<Vec<RawDailyRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encouragements: Option<Vec<Encouragement>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotifications {
    #[serde(default)]
    pub every10_minutes: Option<bool>,
    #[serde(default)]
    pub app_use25: Option<bool>,
    #[serde(default)]
    pub app_use50: Option<bool>,
    #[serde(default)]
    pub app_use75: Option<bool>,
    #[serde(default)]
    pub app_use95: Option<bool>,
    #[serde(default)]
    pub encouragements: Option<bool>,
    #[serde(default)]
    pub streaks: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<RawNotifications>,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, DocumentError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DocumentError::InvalidDate(value.to_string()))
}

fn minutes(value: Option<i64>, app: &str, date: NaiveDate) -> Result<u32, DocumentError> {
    match value {
        None => Ok(0),
        Some(v) if v < 0 => Err(DocumentError::NegativeMinutes {
            app: app.to_string(),
            date,
        }),
        Some(v) => Ok(u32::try_from(v).unwrap_or(u32::MAX)),
    }
}

/// Missing minute fields read as zero; a missing `appUsage` reads as no apps.
pub fn parse_record(raw: &RawDailyRecord) -> Result<DailyUsageRecord, DocumentError> {
    let date = parse_date(raw.date.as_deref().ok_or(DocumentError::MissingDate)?)?;
    let app_usage = raw
        .app_usage
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|entry| -> Result<AppUsage, DocumentError> {
            let app_name = entry
                .app_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or(DocumentError::MissingAppName(date))?;
            Ok(AppUsage {
                app_name: app_name.to_string(),
                used_minutes: minutes(entry.used_minutes, app_name, date)?,
                limit_minutes: minutes(entry.limit_minutes, app_name, date)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DailyUsageRecord { date, app_usage })
}

/// Records that fail to parse are dropped with a warning, as are all but
/// the last record for a repeated date.
pub fn parse_history(user_id: &str, doc: &UserDocument) -> UsageHistory {
    let Some(daily) = doc.daily_data.as_deref() else {
        return UsageHistory::default();
    };

    let records: Vec<DailyUsageRecord> = daily
        .iter()
        .filter_map(|raw| match parse_record(raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("skipping daily record for user {user_id}: {err}");
                None
            }
        })
        .collect();
    for err in duplicate_dates(&records) {
        warn!("daily data for user {user_id}: {err}");
    }
    UsageHistory::from_records(records)
}

/// One error per date that appears more than once, in first-seen order.
pub fn duplicate_dates(records: &[DailyUsageRecord]) -> Vec<DocumentError> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    records
        .iter()
        .filter(|record| !seen.insert(record.date) && reported.insert(record.date))
        .map(|record| DocumentError::DuplicateDate(record.date))
        .collect()
}

pub fn parse_limits(doc: &UserDocument) -> Vec<AppLimit> {
    doc.limits
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|raw| {
            let app_name = raw.app_name.as_deref()?.trim();
            if app_name.is_empty() {
                return None;
            }
            let limit_minutes = u32::try_from(raw.limit_minutes.unwrap_or(0).max(0)).unwrap_or(u32::MAX);
            Some(AppLimit {
                app_name: app_name.to_string(),
                limit_minutes,
            })
        })
        .collect()
}

pub fn raw_limits(limits: &[AppLimit]) -> Vec<RawAppLimit> {
    limits
        .iter()
        .map(|limit| RawAppLimit {
            app_name: Some(limit.app_name.clone()),
            limit_minutes: Some(i64::from(limit.limit_minutes)),
        })
        .collect()
}

impl From<&DailyUsageRecord> for RawDailyRecord {
    fn from(record: &DailyUsageRecord) -> Self {
        Self {
            date: Some(record.date.format("%Y-%m-%d").to_string()),
            app_usage: Some(
                record
                    .app_usage
                    .iter()
                    .map(|app| RawAppUsage {
                        app_name: Some(app.app_name.clone()),
                        used_minutes: Some(i64::from(app.used_minutes)),
                        limit_minutes: Some(i64::from(app.limit_minutes)),
                    })
                    .collect(),
            ),
        }
    }
}

impl UserDocument {
    /// Drops every stored entry for `record.date` and appends `record`.
    pub fn upsert_record(&mut self, record: &DailyUsageRecord) {
        let daily = self.daily_data.get_or_insert_with(Vec::new);
        daily.retain(|entry| {
            entry
                .date
                .as_deref()
                .and_then(|value| parse_date(value).ok())
                != Some(record.date)
        });
        daily.push(RawDailyRecord::from(record));
    }

    pub fn display_name(&self, user_id: &str) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(user_id)
            .to_string()
    }
}

impl SettingsDocument {
    pub fn goals(&self, today: NaiveDate) -> GoalSettings {
        let goal_type = match self.goal_type.as_deref() {
            Some("Maintain") => GoalType::Maintain,
            _ => GoalType::Reduce,
        };
        GoalSettings {
            goal_type,
            hours: self.hours.unwrap_or(0).clamp(0, 23) as u8,
            minutes: self.minutes.unwrap_or(0).clamp(0, 59) as u8,
            date: self
                .date
                .as_deref()
                .and_then(|value| parse_date(value).ok())
                .unwrap_or(today),
            description: self.description.clone().unwrap_or_default(),
        }
    }

    pub fn set_goals(&mut self, goals: &GoalSettings) {
        let goal_type = match goals.goal_type {
            GoalType::Reduce => "Reduce",
            GoalType::Maintain => "Maintain",
        };
        self.goal_type = Some(goal_type.to_string());
        self.hours = Some(i64::from(goals.hours));
        self.minutes = Some(i64::from(goals.minutes));
        self.date = Some(goals.date.format("%Y-%m-%d").to_string());
        self.description = Some(goals.description.clone());
    }

    pub fn notifications(&self) -> NotificationSettings {
        let raw = self.notifications.clone().unwrap_or_default();
        NotificationSettings {
            every_10_minutes: raw.every10_minutes.unwrap_or(false),
            app_use_25: raw.app_use25.unwrap_or(false),
            app_use_50: raw.app_use50.unwrap_or(false),
            app_use_75: raw.app_use75.unwrap_or(false),
            app_use_95: raw.app_use95.unwrap_or(false),
            encouragements: raw.encouragements.unwrap_or(false),
            streaks: raw.streaks.unwrap_or(false),
        }
    }

    pub fn set_notifications(&mut self, settings: &NotificationSettings) {
        self.notifications = Some(RawNotifications {
            every10_minutes: Some(settings.every_10_minutes),
            app_use25: Some(settings.app_use_25),
            app_use50: Some(settings.app_use_50),
            app_use75: Some(settings.app_use_75),
            app_use95: Some(settings.app_use_95),
            encouragements: Some(settings.encouragements),
            streaks: Some(settings.streaks),
        });
    }
}
