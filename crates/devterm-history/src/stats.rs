use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use devterm_types::time::{now_ms, to_datetime};
use serde::Serialize;

use crate::store::HistoryStore;

/// Number of days covered by [`HistoryStatistics::recent_activity`].
pub const ACTIVITY_DAYS: u64 = 7;

const TOP_COMMANDS: usize = 10;

/// Commands run on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatistics {
    pub total_commands: usize,
    pub unique_commands: usize,
    /// Mean milliseconds over entries that recorded a duration.
    pub average_execution_time: f64,
    /// Percentage of successful entries among those with an exit code.
    pub success_rate: f64,
    pub most_used: Vec<(String, usize)>,
    /// Oldest day first, ending today.
    pub recent_activity: Vec<DayActivity>,
}

impl HistoryStore {
    pub fn statistics(&self) -> HistoryStatistics {
        self.statistics_at(now_ms())
    }

    /// Statistics with "today" taken from `now` (epoch milliseconds).
    pub fn statistics_at(&self, now: i64) -> HistoryStatistics {
        let unique: HashSet<&str> = self.entries().map(|e| e.command.as_str()).collect();

        let timed: Vec<u64> = self.entries().filter_map(|e| e.execution_time).collect();
        let average_execution_time = if timed.is_empty() {
            0.0
        } else {
            timed.iter().sum::<u64>() as f64 / timed.len() as f64
        };

        let (with_code, succeeded) = self
            .entries()
            .filter(|e| e.exit_code.is_some())
            .fold((0usize, 0usize), |(n, ok), e| {
                (n + 1, ok + usize::from(e.succeeded()))
            });
        let success_rate = if with_code == 0 {
            0.0
        } else {
            succeeded as f64 * 100.0 / with_code as f64
        };

        let today = to_datetime(now).date_naive();
        let recent_activity = (0..ACTIVITY_DAYS)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| DayActivity {
                date,
                count: self
                    .entries()
                    .filter(|e| to_datetime(e.timestamp).date_naive() == date)
                    .count(),
            })
            .collect();

        HistoryStatistics {
            total_commands: self.len(),
            unique_commands: unique.len(),
            average_execution_time,
            success_rate,
            most_used: self.most_used(TOP_COMMANDS),
            recent_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use devterm_types::config::HistoryConfig;
    use devterm_types::store::MemoryStore;

    use super::*;
    use crate::entry::{HistoryEntry, HistoryMeta};
    use crate::store::tests::entry;

    const DAY: i64 = 86_400_000;
    // 2024-03-10 12:00:00 UTC
    const NOW: i64 = 1_710_072_000_000;

    #[test]
    fn empty_history() {
        let stats = HistoryStore::in_memory().statistics_at(NOW);
        assert_eq!(stats.total_commands, 0);
        assert_eq!(stats.average_execution_time, 0.0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.recent_activity.len(), 7);
        assert!(stats.recent_activity.iter().all(|d| d.count == 0));
    }

    #[test]
    fn averages_only_over_recorded_values() {
        let mut h = HistoryStore::in_memory();
        h.add("ls", HistoryMeta::success(10, ""));
        h.add("bad", HistoryMeta::failure(30, "nope"));
        h.add("pwd", HistoryMeta::default());
        let stats = h.statistics_at(NOW);
        assert_eq!(stats.total_commands, 3);
        assert_eq!(stats.unique_commands, 3);
        assert_eq!(stats.average_execution_time, 20.0);
        assert_eq!(stats.success_rate, 50.0);
    }

    #[test]
    fn activity_buckets_by_day() {
        let mut list: Vec<HistoryEntry> = vec![
            entry("1", "ls", NOW),
            entry("2", "ls", NOW - 1000),
            entry("3", "pwd", NOW - DAY),
            entry("4", "old", NOW - 6 * DAY),
            entry("5", "older", NOW - 7 * DAY),
        ];
        list.sort_by_key(|e| e.timestamp);
        let h = HistoryStore::open(
            &HistoryConfig::default(),
            Box::new(MemoryStore::with_value(list)),
            Box::new(MemoryStore::<Vec<HistoryEntry>>::new()),
        );
        let stats = h.statistics_at(NOW);
        let counts: Vec<_> = stats.recent_activity.iter().map(|d| d.count).collect();
        assert_eq!(counts, [1, 0, 0, 0, 0, 1, 2]);
        assert_eq!(
            stats.recent_activity[6].date,
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert_eq!(stats.most_used[0], ("ls".to_string(), 2));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(HistoryStore::in_memory().statistics_at(NOW)).unwrap();
        assert!(json.get("successRate").is_some());
        assert_eq!(json["recentActivity"][6]["date"], "2024-03-10");
    }
}
