use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One logged unit of focused work. This is the struct stored on the disk as well as the one
/// returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default)]
    pub draft_title: String,
    pub start_at: DateTime<FixedOffset>,
    pub minutes: u32,
    pub points: f64,
    #[serde(default)]
    pub focus: u8,
}

impl SessionEntity {
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start_at.with_timezone(&Utc)
    }
}

/// A task or project sessions can be attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntity {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// A node together with the amount of sessions that matched a query.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFrequency {
    pub node: NodeEntity,
    pub count: usize,
}

/// Sums of all sessions that happened on a local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotals {
    pub date: NaiveDate,
    pub total_points: f64,
    pub total_minutes: u32,
    pub session_count: u32,
}

impl DayTotals {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_points: 0.,
            total_minutes: 0,
            session_count: 0,
        }
    }

    pub fn add(&mut self, session: &SessionEntity) {
        self.total_points += session.points;
        self.total_minutes = self.total_minutes.saturating_add(session.minutes);
        self.session_count = self.session_count.saturating_add(1);
    }
}
