use chrono::{Days, NaiveDate};

/// How far back activity is looked up. Streaks longer than this are cut to the window, which is
/// an accepted limitation.
pub const STREAK_LOOKBACK_DAYS: u64 = 60;

/// Distinct local days that have at least one session, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyActivity(Vec<NaiveDate>);

impl FromIterator<NaiveDate> for DailyActivity {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        let mut dates = iter.into_iter().collect::<Vec<_>>();
        dates.sort_by(|a, b| b.cmp(a));
        dates.dedup();
        Self(dates)
    }
}

impl DailyActivity {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.0
    }

    /// Amount of consecutive active days that ends either today or yesterday. Missing one day
    /// keeps the streak alive until the end of today, missing two resets it. Days after `today`
    /// are ignored.
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        let mut dates = self.0.iter().copied().skip_while(|v| *v > today);

        let Some(latest) = dates.next() else {
            return 0;
        };
        let anchor = if latest == today {
            today
        } else if Some(latest) == today.pred_opt() {
            latest
        } else {
            return 0;
        };

        let mut streak = 1;
        for (offset, date) in (1..).zip(dates) {
            if anchor.checked_sub_days(Days::new(offset)) == Some(date) {
                streak += 1;
            } else {
                break;
            }
        }
        streak
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};

    use super::DailyActivity;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap()
    }

    fn days_ago(days: u64) -> NaiveDate {
        today().checked_sub_days(Days::new(days)).unwrap()
    }

    fn streak(days: &[u64]) -> u32 {
        days.iter()
            .map(|v| days_ago(*v))
            .collect::<DailyActivity>()
            .current_streak(today())
    }

    #[test]
    fn test_empty_activity() {
        assert_eq!(streak(&[]), 0);
    }

    #[test]
    fn test_only_today() {
        assert_eq!(streak(&[0]), 1);
    }

    #[test]
    fn test_consecutive_days() {
        assert_eq!(streak(&[0, 1, 2]), 3);
    }

    #[test]
    fn test_gap_stops_streak() {
        assert_eq!(streak(&[0, 2]), 1);
        assert_eq!(streak(&[0, 1, 3, 4, 5]), 2);
    }

    #[test]
    fn test_grace_period() {
        assert_eq!(streak(&[1, 2]), 2);
        assert_eq!(streak(&[1]), 1);
    }

    #[test]
    fn test_two_missed_days() {
        assert_eq!(streak(&[2, 3, 4]), 0);
    }

    #[test]
    fn test_unsorted_and_duplicated_input() {
        assert_eq!(streak(&[2, 0, 1, 0, 2]), 3);
    }

    #[test]
    fn test_future_days_are_ignored() {
        let activity = [today().succ_opt().unwrap(), today(), days_ago(1)]
            .into_iter()
            .collect::<DailyActivity>();
        assert_eq!(activity.current_streak(today()), 2);
    }

    #[test]
    fn test_long_streak() {
        let days = (0..60).collect::<Vec<_>>();
        assert_eq!(streak(&days), 60);
    }
}
