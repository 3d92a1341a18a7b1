use crate::document::{parse_history, UserDocument};
use crate::models::{FriendStatsResponse, LeaderboardEntry};
use crate::streak::{compute_streak, longest_streak};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub fn leaderboard_label(streak: u32) -> String {
    if streak == 0 {
        "-".to_string()
    } else {
        format!("{streak} Days")
    }
}

/// Ranks every user by current streak, longest first. Ties order by name,
/// then id.
pub fn build_leaderboard_at(
    today: NaiveDate,
    users: &BTreeMap<String, UserDocument>,
    viewer: &str,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(u32, String, &String)> = users
        .iter()
        .map(|(user_id, doc)| {
            let streak = compute_streak(&parse_history(user_id, doc), today);
            (streak, doc.display_name(user_id), user_id)
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)).then_with(|| a.2.cmp(b.2)));

    rows.into_iter()
        .enumerate()
        .map(|(idx, (streak, name, user_id))| LeaderboardEntry {
            rank: idx + 1,
            user_id: user_id.clone(),
            name,
            streak,
            streak_label: leaderboard_label(streak),
            is_viewer: user_id == viewer,
        })
        .collect()
}

pub fn friend_stats_at(today: NaiveDate, user_id: &str, doc: &UserDocument) -> FriendStatsResponse {
    let history = parse_history(user_id, doc);
    let streak = compute_streak(&history, today);
    FriendStatsResponse {
        user_id: user_id.to_string(),
        name: doc.display_name(user_id),
        streak,
        longest_streak: longest_streak(&history, today),
        streak_label: leaderboard_label(streak),
    }
}
