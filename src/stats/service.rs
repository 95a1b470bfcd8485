use anyhow::Result;
use chrono::{DateTime, Days, Local, NaiveDate, Timelike};
use tracing::{debug, instrument, warn};

use crate::{
    storage::{
        entities::{DayTotals, NodeEntity, SessionEntity},
        store::SessionStore,
    },
    utils::clock::Clock,
};

use super::{
    streak::{DailyActivity, STREAK_LOOKBACK_DAYS},
    suggestions::{hour_window, rank_suggestions, FREQUENT_SLOTS, SUGGESTION_SLOTS},
    DayStat, UserStats,
};

/// Amount of sessions returned by [StatsService::recent_sessions].
pub const RECENT_SESSIONS: usize = 20;
/// The weekly overview starts this many days before today.
pub const WEEK_DAYS: u64 = 7;

/// Bridges a [SessionStore] and the stats engines. Reads that only enrich a response degrade to
/// empty data when the store fails, so a broken store still produces a valid answer.
pub struct StatsService<S> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: SessionStore> StatsService<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.time()
    }

    fn days_before_today(&self, days: u64) -> NaiveDate {
        let today = self.now().date_naive();
        today.checked_sub_days(Days::new(days)).unwrap_or(today)
    }

    #[instrument(skip(self))]
    pub async fn user_stats(&self) -> UserStats {
        let today = self.now().date_naive();

        let lifetime_points = self.store.lifetime_points().await.unwrap_or_else(|e| {
            warn!("Failed to read lifetime points {e:?}");
            0.
        });

        let totals = self.store.day_totals(today).await.unwrap_or_else(|e| {
            warn!("Failed to read totals for {today} {e:?}");
            DayTotals::empty(today)
        });

        let activity = self
            .store
            .active_dates(self.days_before_today(STREAK_LOOKBACK_DAYS))
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to read active dates {e:?}");
                vec![]
            })
            .into_iter()
            .collect::<DailyActivity>();

        let stats = UserStats::compute(
            lifetime_points,
            totals.total_points,
            totals.total_minutes,
            &activity,
            today,
        );
        debug!("Computed stats {stats:?}");
        stats
    }

    /// Nodes that are likely to be worked on right now.
    #[instrument(skip(self))]
    pub async fn suggestions(&self) -> Vec<NodeEntity> {
        let (low, high) = hour_window(self.now().hour());

        let frequent = self
            .store
            .node_frequencies(low, high, FREQUENT_SLOTS)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to rank nodes between {low} and {high} hours {e:?}");
                vec![]
            });

        let taken = frequent
            .iter()
            .take(FREQUENT_SLOTS)
            .map(|v| v.node.id.clone())
            .collect::<Vec<_>>();

        let recent = if taken.len() < SUGGESTION_SLOTS {
            self.store
                .recent_nodes(&taken, SUGGESTION_SLOTS - taken.len())
                .await
                .unwrap_or_else(|e| {
                    warn!("Failed to read recent nodes {e:?}");
                    vec![]
                })
        } else {
            vec![]
        };

        rank_suggestions(frequent, recent)
    }

    pub async fn recent_sessions(&self) -> Vec<SessionEntity> {
        self.store
            .recent_sessions(RECENT_SESSIONS)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to read recent sessions {e:?}");
                vec![]
            })
    }

    pub async fn daily(&self) -> Result<DayTotals> {
        self.store.day_totals(self.now().date_naive()).await
    }

    pub async fn weekly(&self) -> Result<Vec<DayStat>> {
        Ok(self
            .history(self.days_before_today(WEEK_DAYS))
            .await?
            .into_iter()
            .map(DayStat::from)
            .collect())
    }

    /// Totals of every active day since `since`, ascending.
    pub async fn history(&self, since: NaiveDate) -> Result<Vec<DayTotals>> {
        self.store.daily_totals_since(since).await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};

    use crate::{
        storage::{
            entities::{NodeEntity, NodeFrequency, SessionEntity},
            memory_store::MemoryStore,
            store::MockSessionStore,
        },
        utils::{clock::FixedClock, logging::TEST_LOGGING},
    };

    use super::StatsService;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2018, 7, 4, 14, 30, 0).unwrap()
    }

    fn days_ago(days: i64, hour: u32) -> DateTime<FixedOffset> {
        let date = now().date_naive() - Duration::days(days);
        Local
            .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
            .unwrap()
            .fixed_offset()
    }

    fn session(id: &str, node: Option<&str>, start_at: DateTime<FixedOffset>) -> SessionEntity {
        SessionEntity {
            id: id.into(),
            node_id: node.map(Into::into),
            draft_title: "".into(),
            start_at,
            minutes: 25,
            points: 50.,
            focus: 3,
        }
    }

    fn node(id: &str, age_hours: i64) -> NodeEntity {
        NodeEntity {
            id: id.into(),
            title: id.into(),
            updated_at: Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()
                - Duration::hours(age_hours),
        }
    }

    fn service<S>(store: S) -> StatsService<S> {
        StatsService {
            store,
            clock: Box::new(FixedClock(now())),
        }
    }

    fn ids(nodes: &[NodeEntity]) -> Vec<&str> {
        nodes.iter().map(|v| v.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_user_stats_from_history() {
        *TEST_LOGGING;
        let store = MemoryStore::new(
            vec![
                session("a", None, days_ago(0, 9)),
                session("b", None, days_ago(0, 11)),
                session("c", None, days_ago(1, 20)),
                session("d", None, days_ago(2, 8)),
                session("e", None, days_ago(4, 8)),
            ],
            vec![],
        );

        let stats = service(store).user_stats().await;

        assert_eq!(stats.total_points, 250.);
        assert_eq!(stats.level, 2);
        assert_eq!(stats.progress, 0.5);
        assert_eq!(stats.points_to_next, 150.);
        assert_eq!(stats.daily_points, 100.);
        assert_eq!(stats.daily_minutes, 50);
        assert_eq!(stats.current_streak, 3);
    }

    #[tokio::test]
    async fn test_streak_is_limited_by_lookback() {
        let sessions = (0..70)
            .map(|v| session(&v.to_string(), None, days_ago(v, 10)))
            .collect();
        let stats = service(MemoryStore::new(sessions, vec![])).user_stats().await;
        assert_eq!(stats.current_streak, 61);
    }

    #[tokio::test]
    async fn test_user_stats_survive_failing_store() {
        let mut store = MockSessionStore::new();
        store
            .expect_lifetime_points()
            .returning(|| Err(anyhow!("broken")));
        store
            .expect_day_totals()
            .returning(|_| Err(anyhow!("broken")));
        store
            .expect_active_dates()
            .returning(|_| Err(anyhow!("broken")));

        let stats = service(store).user_stats().await;
        assert_eq!(stats.total_points, 0.);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.daily_minutes, 0);
    }

    #[tokio::test]
    async fn test_suggestions_prefer_time_of_day() {
        let store = MemoryStore::new(
            vec![
                session("1", Some("lab"), days_ago(1, 13)),
                session("2", Some("lab"), days_ago(2, 15)),
                session("3", Some("essay"), days_ago(3, 16)),
                // far from 14:30
                session("4", Some("gym"), days_ago(1, 7)),
                session("5", Some("gym"), days_ago(2, 7)),
                session("6", Some("gym"), days_ago(3, 7)),
            ],
            vec![
                node("gym", 1),
                node("essay", 5),
                node("lab", 3),
                node("reading", 2),
            ],
        );

        let suggestions = service(store).suggestions().await;
        assert_eq!(ids(&suggestions), vec!["lab", "essay", "gym", "reading"]);
    }

    #[tokio::test]
    async fn test_suggestions_fall_back_to_recent_on_failure() {
        let mut store = MockSessionStore::new();
        store
            .expect_node_frequencies()
            .withf(|low, high, limit| (*low, *high, *limit) == (12, 16, 5))
            .returning(|_, _, _| Err(anyhow!("broken")));
        store
            .expect_recent_nodes()
            .withf(|exclude, limit| exclude.is_empty() && *limit == 8)
            .returning(|_, _| Ok(vec![node("X", 0), node("Y", 1)]));

        let suggestions = service(store).suggestions().await;
        assert_eq!(ids(&suggestions), vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_suggestions_exclude_ranked_nodes_from_recent() {
        let mut store = MockSessionStore::new();
        store.expect_node_frequencies().returning(|_, _, _| {
            Ok(vec![
                NodeFrequency {
                    node: node("A", 0),
                    count: 5,
                },
                NodeFrequency {
                    node: node("B", 0),
                    count: 3,
                },
            ])
        });
        store
            .expect_recent_nodes()
            .withf(|exclude, limit| {
                exclude.to_vec() == vec!["A".to_string(), "B".to_string()] && *limit == 6
            })
            .returning(|_, _| Ok(vec![node("C", 0), node("D", 1)]));

        let suggestions = service(store).suggestions().await;
        assert_eq!(ids(&suggestions), vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_weekly_and_daily() -> Result<()> {
        let store = MemoryStore::new(
            vec![
                session("a", None, days_ago(0, 9)),
                session("b", None, days_ago(3, 9)),
                session("c", None, days_ago(3, 10)),
                session("d", None, days_ago(7, 10)),
                session("e", None, days_ago(8, 10)),
            ],
            vec![],
        );
        let service = service(store);

        let daily = service.daily().await?;
        assert_eq!(daily.date, NaiveDate::from_ymd_opt(2018, 7, 4).unwrap());
        assert_eq!(daily.session_count, 1);

        let weekly = service.weekly().await?;
        assert_eq!(
            weekly.iter().map(|v| (v.day.to_string(), v.minutes)).collect::<Vec<_>>(),
            vec![
                ("2018-06-27".to_string(), 25),
                ("2018-07-01".to_string(), 50),
                ("2018-07-04".to_string(), 25)
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_recent_sessions_degrade_to_empty() {
        let mut store = MockSessionStore::new();
        store
            .expect_recent_sessions()
            .withf(|limit| *limit == 20)
            .returning(|_| Err(anyhow!("broken")));
        assert!(service(store).recent_sessions().await.is_empty());
    }
}
