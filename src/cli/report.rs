use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    stats::{level::level_ceil, service::StatsService, UserStats},
    storage::{
        entities::{DayTotals, NodeEntity},
        ingest::{record_session, IngestOutcome, NewSession},
        store::SessionStore,
    },
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "First day of the history. Examples are \"yesterday\", \"2 weeks ago\", \"15/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

#[derive(Debug, Parser)]
pub struct LogCommand {
    #[arg(long, help = "Length of the session. The session is considered to end now")]
    minutes: u32,
    #[arg(long, help = "Points earned during the session")]
    points: f64,
    #[arg(long, help = "Title of the task. Used to find or create a node")]
    title: Option<String>,
    #[arg(long, help = "Id of an existing node. Takes priority over the title")]
    node: Option<String>,
    #[arg(long, default_value_t = 3, help = "How focused the session was")]
    focus: u8,
}

const DEFAULT_HISTORY_DAYS: i64 = 7;

pub async fn print_stats<S: SessionStore>(service: &StatsService<S>) {
    println!("{}", format_stats(&service.user_stats().await));
}

pub async fn print_suggestions<S: SessionStore>(service: &StatsService<S>) {
    let suggestions = service.suggestions().await;
    if suggestions.is_empty() {
        println!("Nothing to suggest yet. Log a session with a title first.");
    }
    for line in format_suggestions(&suggestions) {
        println!("{line}");
    }
}

/// Command to process `history` command. Prints totals of every active day from the start date
/// until today.
pub async fn process_history_command<S: SessionStore>(
    service: &StatsService<S>,
    HistoryCommand {
        start_date,
        date_style,
    }: HistoryCommand,
) -> Result<()> {
    let start = parse_start(start_date, date_style, service.now())?;
    let days = service.history(start.date_naive()).await?;
    if days.is_empty() {
        println!("No sessions since {}", start.format("%x"));
    }
    for line in format_history(&days) {
        println!("{line}");
    }
    Ok(())
}

pub async fn process_log_command<S: SessionStore>(
    service: &StatsService<S>,
    LogCommand {
        minutes,
        points,
        title,
        node,
        focus,
    }: LogCommand,
) -> Result<()> {
    let now = service.now();
    let request = NewSession {
        id: String::new(),
        node_id: node.unwrap_or_default(),
        draft_title: title.unwrap_or_default(),
        start_at: (now - Duration::minutes(minutes as i64)).fixed_offset(),
        minutes,
        points,
        focus,
    };
    match record_session(service.store(), request, now.with_timezone(&Utc)).await? {
        IngestOutcome::Saved(id) => println!("Saved session {id}"),
        IngestOutcome::DuplicateId(id) => println!("Session {id} already exists"),
    }
    Ok(())
}

fn parse_start(
    start_date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DateTime<Local>> {
    let dialect: chrono_english::Dialect = date_style.into();
    let start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now - Duration::days(DEFAULT_HISTORY_DAYS),
    };
    Ok(start.beginning_of_day())
}

fn format_stats(stats: &UserStats) -> String {
    format!(
        "Level\t{} ({}% done, {} points to level {})\n\
         Total\t{} points of {}\n\
         Today\t{} points\t{}\n\
         Streak\t{} days",
        stats.level,
        (stats.progress * 100.).floor() as u32,
        stats.points_to_next.ceil(),
        stats.level + 1,
        stats.total_points,
        level_ceil(stats.level),
        stats.daily_points,
        format_minutes(stats.daily_minutes),
        stats.current_streak,
    )
}

fn format_suggestions(nodes: &[NodeEntity]) -> Vec<String> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| format!("{}\t{}\t{}", index + 1, node.title, node.id))
        .collect()
}

fn format_history(days: &[DayTotals]) -> Vec<String> {
    days.iter()
        .map(|day| {
            format!(
                "{}\t{}\t{}\t{} sessions",
                day.date.format("%x"),
                day.total_points,
                format_minutes(day.total_minutes),
                day.session_count
            )
        })
        .collect()
}

fn format_minutes(minutes: u32) -> String {
    if minutes >= 60 {
        format!("{}h{}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone, Timelike};

    use crate::{
        stats::UserStats,
        storage::entities::DayTotals,
    };

    use super::{format_history, format_minutes, format_stats, parse_start, DateStyle};

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(135), "2h15m");
    }

    #[test]
    fn test_format_stats() {
        let stats = UserStats {
            total_points: 250.,
            level: 2,
            progress: 0.5,
            points_to_next: 150.,
            daily_points: 40.,
            daily_minutes: 75,
            current_streak: 3,
        };
        let text = format_stats(&stats);
        assert!(text.contains("Level\t2 (50% done, 150 points to level 3)"));
        assert!(text.contains("Total\t250 points of 400"));
        assert!(text.contains("Today\t40 points\t1h15m"));
        assert!(text.contains("Streak\t3 days"));
    }

    #[test]
    fn test_format_history() {
        let mut day = DayTotals::empty(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap());
        day.total_points = 12.5;
        day.total_minutes = 50;
        day.session_count = 2;
        let lines = format_history(&[day]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("12.5\t50m\t2 sessions"));
    }

    #[test]
    fn test_parse_start_defaults_to_a_week() {
        let now = Local.with_ymd_and_hms(2018, 7, 4, 14, 30, 0).unwrap();
        let start = parse_start(None, DateStyle::Uk, now).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2018, 6, 27).unwrap());
        assert_eq!(start.hour(), 0);
    }

    #[test]
    fn test_parse_start_dialect() {
        let now = Local.with_ymd_and_hms(2018, 7, 4, 14, 30, 0).unwrap();
        let start = parse_start(Some("02/07/2018".into()), DateStyle::Uk, now).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2018, 7, 2).unwrap());
        let start = parse_start(Some("06/30/2018".into()), DateStyle::Us, now).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2018, 6, 30).unwrap());
        assert!(parse_start(Some("not a date".into()), DateStyle::Uk, now).is_err());
    }
}
