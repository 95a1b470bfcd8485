use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::entities::{DayTotals, NodeEntity, NodeFrequency, SessionEntity};

/// Interface for abstracting storage of sessions and nodes. Dates and hours are always in the
/// server's local time zone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Sessions ordered by start, newest first.
    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionEntity>>;

    /// Sum of points of every stored session.
    async fn lifetime_points(&self) -> Result<f64>;

    async fn day_totals(&self, date: NaiveDate) -> Result<DayTotals>;

    /// Totals for every day since `since` (inclusive) that has at least one session, in
    /// ascending order.
    async fn daily_totals_since(&self, since: NaiveDate) -> Result<Vec<DayTotals>>;

    /// Distinct days since `since` (inclusive) with at least one session, newest first.
    async fn active_dates(&self, since: NaiveDate) -> Result<Vec<NaiveDate>>;

    /// Nodes ranked by the amount of their sessions started between `hour_low` and `hour_high`
    /// (both inclusive). Hours outside of 0..=23 simply match nothing.
    async fn node_frequencies(
        &self,
        hour_low: i32,
        hour_high: i32,
        limit: usize,
    ) -> Result<Vec<NodeFrequency>>;

    /// Nodes ordered by last update, newest first.
    async fn recent_nodes(&self, exclude: &[String], limit: usize) -> Result<Vec<NodeEntity>>;

    /// Returns false if a session with the same id already exists.
    async fn insert_session(&self, session: SessionEntity) -> Result<bool>;

    /// Returns false if there is no such session.
    async fn update_draft_title(&self, id: &str, draft_title: &str) -> Result<bool>;

    /// Returns false if there is no such session.
    async fn delete_session(&self, id: &str) -> Result<bool>;

    /// Finds the first node with the title and bumps it, or creates a new one.
    async fn upsert_node_by_title(&self, title: &str, now: DateTime<Utc>) -> Result<String>;

    async fn create_node(&self, title: &str, now: DateTime<Utc>) -> Result<NodeEntity>;

    /// Bumps update time of a node. Unknown ids are ignored.
    async fn touch_node(&self, id: &str, now: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionEntity>> {
        (**self).recent_sessions(limit).await
    }

    async fn lifetime_points(&self) -> Result<f64> {
        (**self).lifetime_points().await
    }

    async fn day_totals(&self, date: NaiveDate) -> Result<DayTotals> {
        (**self).day_totals(date).await
    }

    async fn daily_totals_since(&self, since: NaiveDate) -> Result<Vec<DayTotals>> {
        (**self).daily_totals_since(since).await
    }

    async fn active_dates(&self, since: NaiveDate) -> Result<Vec<NaiveDate>> {
        (**self).active_dates(since).await
    }

    async fn node_frequencies(
        &self,
        hour_low: i32,
        hour_high: i32,
        limit: usize,
    ) -> Result<Vec<NodeFrequency>> {
        (**self).node_frequencies(hour_low, hour_high, limit).await
    }

    async fn recent_nodes(&self, exclude: &[String], limit: usize) -> Result<Vec<NodeEntity>> {
        (**self).recent_nodes(exclude, limit).await
    }

    async fn insert_session(&self, session: SessionEntity) -> Result<bool> {
        (**self).insert_session(session).await
    }

    async fn update_draft_title(&self, id: &str, draft_title: &str) -> Result<bool> {
        (**self).update_draft_title(id, draft_title).await
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        (**self).delete_session(id).await
    }

    async fn upsert_node_by_title(&self, title: &str, now: DateTime<Utc>) -> Result<String> {
        (**self).upsert_node_by_title(title, now).await
    }

    async fn create_node(&self, title: &str, now: DateTime<Utc>) -> Result<NodeEntity> {
        (**self).create_node(title, now).await
    }

    async fn touch_node(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        (**self).touch_node(id, now).await
    }
}

/// Id for a node created on the fly.
pub fn new_node_id() -> String {
    format!("node_{}", uuid::Uuid::new_v4().simple())
}
