use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use eureka_core::store::{Record, Repository};

use crate::clock::Clock;
use crate::model::SearchQuery;

const ACTIVITY_KEY: &str = "eureka-activity";
const HISTORY_KEY: &str = "eureka-history";
pub const HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DailyActivity {
    /// Searches per calendar day (UTC).
    days: BTreeMap<NaiveDate, u64>,
}

impl Record for DailyActivity {
    const SCHEMA_VERSION: u32 = 1;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntry {
    pub query: SearchQuery,
    pub searched_at: DateTime<Utc>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SearchHistory {
    /// Newest first.
    entries: Vec<HistoryEntry>,
}

impl Record for SearchHistory {
    const SCHEMA_VERSION: u32 = 1;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DayCount {
    pub date: NaiveDate,
    pub search_count: u64,
}

/// Search counters and recent history. Best effort: a store outage loses records, never
/// a submission.
///
/// Both records are read, updated and written back whole. Clones share one write lock so
/// concurrent connections cannot drop each other's updates.
#[derive(Clone)]
pub struct ActivityTracker {
    repo: Repository,
    clock: Arc<dyn Clock>,
    writes: Arc<Mutex<()>>,
}

impl ActivityTracker {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub async fn record(&self, query: &SearchQuery, from_cache: bool) {
        let _guard = self.writes.lock().await;
        let now = self.clock.now();

        let mut activity: DailyActivity = self.repo.get(ACTIVITY_KEY).await.unwrap_or_default();
        *activity.days.entry(now.date_naive()).or_insert(0) += 1;
        if !self.repo.set(ACTIVITY_KEY, &activity).await {
            warn!("failed to persist daily activity");
        }

        let mut history: SearchHistory = self.repo.get(HISTORY_KEY).await.unwrap_or_default();
        history.entries.insert(
            0,
            HistoryEntry {
                query: query.clone(),
                searched_at: now,
                from_cache,
            },
        );
        history.entries.truncate(HISTORY_CAP);
        if !self.repo.set(HISTORY_KEY, &history).await {
            warn!("failed to persist search history");
        }
    }

    /// The `days` most recent days that saw any searches, newest first.
    pub async fn daily_activity(&self, days: usize) -> Vec<DayCount> {
        let activity: DailyActivity = self.repo.get(ACTIVITY_KEY).await.unwrap_or_default();
        activity
            .days
            .iter()
            .rev()
            .take(days)
            .map(|(date, count)| DayCount {
                date: *date,
                search_count: *count,
            })
            .collect()
    }

    /// One page of history, newest first. `page` is 1-based.
    pub async fn search_history(&self, page: usize, limit: usize) -> Vec<HistoryEntry> {
        let history: SearchHistory = self.repo.get(HISTORY_KEY).await.unwrap_or_default();
        let offset = page.saturating_sub(1).saturating_mul(limit);
        history.entries.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::ExampleKind;
    use eureka_core::store::MemoryStore;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn tracker() -> (Arc<ManualClock>, ActivityTracker) {
        // 2024-03-01T12:00:00Z
        let clock = Arc::new(ManualClock::at_millis(1_709_294_400_000));
        let tracker = ActivityTracker::new(Repository::new(Arc::new(MemoryStore::new())), clock.clone());
        (clock, tracker)
    }

    #[tokio::test]
    async fn counts_per_day_newest_first() {
        let (clock, tracker) = tracker();
        let query = ExampleKind::Research.query();
        tracker.record(&query, false).await;
        tracker.record(&query, true).await;
        clock.advance_millis(DAY_MS);
        tracker.record(&query, false).await;

        let days = tracker.daily_activity(7).await;
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(days[0].search_count, 1);
        assert_eq!(days[1].search_count, 2);
        assert_eq!(tracker.daily_activity(1).await.len(), 1);
    }

    #[tokio::test]
    async fn history_is_paged_and_capped() {
        let (clock, tracker) = tracker();
        for i in 0..(HISTORY_CAP + 5) {
            let mut query = ExampleKind::Design.query();
            query.additional = Some(format!("search {i}"));
            tracker.record(&query, false).await;
            clock.advance_millis(1000);
        }

        let first = tracker.search_history(1, 10).await;
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].query.additional.as_deref(), Some("search 54"));

        let last = tracker.search_history(5, 10).await;
        assert_eq!(last.len(), 10);
        assert!(tracker.search_history(6, 10).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_records_are_all_counted() {
        let (_, tracker) = tracker();
        let tasks: Vec<_> = (0..400)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    let mut query = ExampleKind::Data.query();
                    query.additional = Some(format!("search {i}"));
                    tracker.record(&query, i % 2 == 0).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let days = tracker.daily_activity(7).await;
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].search_count, 400);
        assert_eq!(tracker.search_history(1, 100).await.len(), HISTORY_CAP);
    }
}
