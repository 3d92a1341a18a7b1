use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One app's usage on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub app_name: String,
    pub used_minutes: u32,
    pub limit_minutes: u32,
}

impl AppUsage {
    pub fn within_limit(&self) -> bool {
        self.used_minutes <= self.limit_minutes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsageRecord {
    pub date: NaiveDate,
    pub app_usage: Vec<AppUsage>,
}

impl DailyUsageRecord {
    /// A day with no tracked apps counts as within limit.
    pub fn within_limit(&self) -> bool {
        self.app_usage.iter().all(AppUsage::within_limit)
    }

    /// Returns `(used, limit)` summed across apps.
    pub fn totals(&self) -> (u32, u32) {
        self.app_usage.iter().fold((0u32, 0u32), |(used, limit), app| {
            (
                used.saturating_add(app.used_minutes),
                limit.saturating_add(app.limit_minutes),
            )
        })
    }

    /// Seeds a day from configured limits with zero usage.
    pub fn seeded(date: NaiveDate, limits: &[AppLimit]) -> Self {
        Self {
            date,
            app_usage: limits
                .iter()
                .map(|limit| AppUsage {
                    app_name: limit.app_name.clone(),
                    used_minutes: 0,
                    limit_minutes: limit.limit_minutes,
                })
                .collect(),
        }
    }
}

/// A user's daily records, oldest first, at most one per date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageHistory {
    records: Vec<DailyUsageRecord>,
}

impl UsageHistory {
    /// Sorts by date. For a duplicated date the record inserted last wins.
    pub fn from_records(records: impl IntoIterator<Item = DailyUsageRecord>) -> Self {
        let mut records: Vec<DailyUsageRecord> = records.into_iter().collect();
        // stable sort keeps insertion order among equal dates
        records.sort_by_key(|record| record.date);
        let mut deduped: Vec<DailyUsageRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last_mut() {
                Some(last) if last.date == record.date => *last = record,
                _ => deduped.push(record),
            }
        }
        Self { records: deduped }
    }

    pub fn records(&self) -> &[DailyUsageRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyUsageRecord> {
        self.records
            .binary_search_by_key(&date, |record| record.date)
            .ok()
            .map(|idx| &self.records[idx])
    }

    pub fn latest_on_or_before(&self, date: NaiveDate) -> Option<&DailyUsageRecord> {
        self.records.iter().rev().find(|record| record.date <= date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLimit {
    pub app_name: String,
    pub limit_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub day_label: char,
    pub used_minutes: u32,
    pub limit_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub within_limit: bool,
    pub starting_day: bool,
    pub ending_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GoalType {
    #[default]
    Reduce,
    Maintain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSettings {
    pub goal_type: GoalType,
    pub hours: u8,
    pub minutes: u8,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotificationSettings {
    pub every_10_minutes: bool,
    pub app_use_25: bool,
    pub app_use_50: bool,
    pub app_use_75: bool,
    pub app_use_95: bool,
    pub encouragements: bool,
    pub streaks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encouragement {
    pub message: String,
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub agreed_to_terms: bool,
}

#[derive(Debug, Deserialize)]
pub struct LimitsRequest {
    pub limits: Vec<AppLimit>,
}

#[derive(Debug, Deserialize)]
pub struct UsageRequest {
    pub app_name: String,
    pub used_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EncouragementRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppRemaining {
    pub app_name: String,
    pub used_minutes: u32,
    pub limit_minutes: u32,
    pub remaining_minutes: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub apps: Vec<AppRemaining>,
    pub total_remaining_minutes: u32,
    pub within_limit: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreakResponse {
    pub streak: u32,
    pub longest_streak: u32,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendResponse {
    pub points: [TrendPoint; 7],
    pub average_used_minutes: f64,
    pub average_limit_minutes: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarResponse {
    pub today: NaiveDate,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub streak: u32,
    pub streak_label: String,
    pub is_viewer: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendStatsResponse {
    pub user_id: String,
    pub name: String,
    pub streak: u32,
    pub longest_streak: u32,
    pub streak_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn record(day: u32, used: u32) -> DailyUsageRecord {
        DailyUsageRecord {
            date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
            app_usage: vec![AppUsage {
                app_name: "Snapchat".into(),
                used_minutes: used,
                limit_minutes: 40,
            }],
        }
    }

    #[test]
    fn history_sorts_and_keeps_last_duplicate() {
        let history = UsageHistory::from_records(vec![
            record(3, 1),
            record(1, 2),
            record(2, 3),
            record(1, 4),
            record(3, 5),
            record(3, 6),
        ]);

        let days: Vec<u32> = history.records().iter().map(|r| r.date.day()).collect();
        assert_eq!(days, vec![1, 2, 3]);
        let used: Vec<u32> = history.records().iter().map(|r| r.totals().0).collect();
        assert_eq!(used, vec![4, 3, 6]);
    }

    #[test]
    fn lookups_by_date() {
        let history = UsageHistory::from_records(vec![record(5, 10), record(2, 20)]);
        let day = |d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap();

        assert_eq!(history.get(day(2)).map(|r| r.totals().0), Some(20));
        assert!(history.get(day(3)).is_none());
        assert_eq!(history.latest_on_or_before(day(4)).map(|r| r.date), Some(day(2)));
        assert!(history.latest_on_or_before(day(1)).is_none());
    }
}
