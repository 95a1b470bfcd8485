//! Everything derived from the session history: levels, streaks and suggestions. The engines in
//! [level], [streak] and [suggestions] are pure, [service::StatsService] feeds them from a store.

pub mod level;
pub mod service;
pub mod streak;
pub mod suggestions;

use chrono::NaiveDate;
use level::LevelProgress;
use serde::Serialize;
use streak::DailyActivity;

use crate::storage::entities::DayTotals;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_points: f64,
    pub level: u32,
    pub progress: f64,
    pub points_to_next: f64,
    pub daily_points: f64,
    pub daily_minutes: u32,
    pub current_streak: u32,
}

impl UserStats {
    pub fn compute(
        lifetime_points: f64,
        today_points: f64,
        today_minutes: u32,
        activity: &DailyActivity,
        today: NaiveDate,
    ) -> Self {
        let LevelProgress {
            level,
            progress,
            points_to_next,
        } = LevelProgress::from_points(lifetime_points);

        Self {
            total_points: lifetime_points,
            level,
            progress,
            points_to_next,
            daily_points: today_points,
            daily_minutes: today_minutes,
            current_streak: activity.current_streak(today),
        }
    }
}

/// Short form of [DayTotals] used by the weekly overview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayStat {
    pub day: NaiveDate,
    pub points: f64,
    pub minutes: u32,
}

impl From<DayTotals> for DayStat {
    fn from(value: DayTotals) -> Self {
        Self {
            day: value.date,
            points: value.total_points,
            minutes: value.total_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{streak::DailyActivity, UserStats};

    #[test]
    fn test_compute_user_stats() {
        let today = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let activity = [today, today.pred_opt().unwrap()]
            .into_iter()
            .collect::<DailyActivity>();

        let stats = UserStats::compute(250., 40., 50, &activity, today);

        assert_eq!(
            stats,
            UserStats {
                total_points: 250.,
                level: 2,
                progress: 0.5,
                points_to_next: 150.,
                daily_points: 40.,
                daily_minutes: 50,
                current_streak: 2,
            }
        );

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["pointsToNext"], 150.);
        assert_eq!(json["currentStreak"], 2);
    }
}
