use crate::models::{CalendarDay, DailyUsageRecord, UsageHistory};
use chrono::NaiveDate;

/// Length of the run of calendar-adjacent within-limit days ending at the
/// most recent record dated on or before `today`.
///
/// Records after `today` are ignored. The run stops at the first record over
/// its limit or at the first missing day. A record with no tracked apps is
/// within limit.
pub fn compute_streak(history: &UsageHistory, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut expected: Option<NaiveDate> = None;

    for record in history.records().iter().rev() {
        if record.date > today {
            continue;
        }
        if let Some(expected) = expected {
            if record.date != expected {
                break;
            }
        }
        if !record.within_limit() {
            break;
        }
        streak += 1;
        match record.date.pred_opt() {
            Some(previous) => expected = Some(previous),
            None => break,
        }
    }

    streak
}

/// Longest run of calendar-adjacent within-limit days on or before `today`.
pub fn longest_streak(history: &UsageHistory, today: NaiveDate) -> u32 {
    let mut best = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for record in past_records(history, today) {
        let adjacent = previous.is_some_and(|prev| prev.succ_opt() == Some(record.date));
        run = match (record.within_limit(), adjacent) {
            (false, _) => 0,
            (true, true) => run + 1,
            (true, false) => 1,
        };
        best = best.max(run);
        previous = Some(record.date);
    }

    best
}

/// Marks each recorded day with whether it opens or closes a run of
/// adjacent days that share the same within-limit status.
pub fn streak_periods(history: &UsageHistory, today: NaiveDate) -> Vec<CalendarDay> {
    let records: Vec<&DailyUsageRecord> = past_records(history, today).collect();
    let continues = |a: &DailyUsageRecord, b: &DailyUsageRecord| {
        a.date.succ_opt() == Some(b.date) && a.within_limit() == b.within_limit()
    };

    records
        .iter()
        .copied()
        .enumerate()
        .map(|(idx, record)| {
            let starting_day = idx == 0 || !continues(records[idx - 1], record);
            let ending_day = records
                .get(idx + 1)
                .copied()
                .is_none_or(|next| !continues(record, next));
            CalendarDay {
                date: record.date,
                within_limit: record.within_limit(),
                starting_day,
                ending_day,
            }
        })
        .collect()
}

pub fn streak_label(streak: u32) -> String {
    format!("{streak} \u{1F525}")
}

fn past_records(
    history: &UsageHistory,
    today: NaiveDate,
) -> impl Iterator<Item = &DailyUsageRecord> {
    history
        .records()
        .iter()
        .take_while(move |record| record.date <= today)
}
