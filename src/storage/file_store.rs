use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::utils::time::{date_to_record_name, record_name_to_date};

use super::{
    entities::{DayTotals, NodeEntity, NodeFrequency, SessionEntity},
    lines::{append_line, read_lines, rewrite_lines},
    queries,
    store::{new_node_id, SessionStore},
};

/// Amount of record files read at the same time.
const READ_CONCURRENCY: usize = 4;

/// The main realization of [SessionStore].
///
/// Sessions are stored as json lines inside record files, one file per UTC day of the session
/// start. Nodes are stored as json lines inside a single file, in creation order. Every file is
/// locked while being read or written, so that a cli and a server can work with the same
/// directory. See [super::lines] for how interrupted writes are handled.
pub struct FileStore {
    session_dir: PathBuf,
    nodes_path: PathBuf,
    // Serializes read-modify-write cycles inside of this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        let session_dir = dir.join("sessions");
        std::fs::create_dir_all(&session_dir)?;

        Ok(Self {
            session_dir,
            nodes_path: dir.join("nodes"),
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, date: NaiveDate) -> PathBuf {
        self.session_dir.join(date_to_record_name(date))
    }

    /// Days that have a record file, ascending.
    async fn record_days(&self) -> Result<Vec<NaiveDate>> {
        let mut entries = tokio::fs::read_dir(&self.session_dir).await?;
        let mut days = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            match name.to_str().map(record_name_to_date) {
                Some(Ok(day)) => days.push(day),
                _ => debug!("Skipping unknown file {name:?}"),
            }
        }
        days.sort();
        Ok(days)
    }

    async fn read_days(&self, days: Vec<NaiveDate>) -> Result<Vec<SessionEntity>> {
        let files = stream::iter(days)
            .map(|day| read_lines::<SessionEntity>(self.record_path(day)))
            .buffered(READ_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(files.into_iter().flatten().collect())
    }

    async fn all_sessions(&self) -> Result<Vec<SessionEntity>> {
        let days = self.record_days().await?;
        self.read_days(days).await
    }

    /// Sessions that might start on a local day after `since`. A local day can spill into the
    /// neighbouring UTC days, so one extra file is read.
    async fn sessions_since(&self, since: NaiveDate) -> Result<Vec<SessionEntity>> {
        let first = since.checked_sub_days(Days::new(1)).unwrap_or(since);
        let days = self
            .record_days()
            .await?
            .into_iter()
            .filter(|v| *v >= first)
            .collect();
        self.read_days(days).await
    }

    async fn sessions_around(&self, date: NaiveDate) -> Result<Vec<SessionEntity>> {
        let days = [
            date.checked_sub_days(Days::new(1)),
            Some(date),
            date.checked_add_days(Days::new(1)),
        ]
        .into_iter()
        .flatten()
        .collect();
        self.read_days(days).await
    }

    async fn nodes(&self) -> Result<Vec<NodeEntity>> {
        read_lines(self.nodes_path.clone()).await
    }

    /// Applies `change` to the first record file it succeeds on.
    async fn change_session<F>(&self, mut change: F) -> Result<bool>
    where
        F: FnMut(&mut Vec<SessionEntity>) -> Option<()>,
    {
        let _guard = self.write_lock.lock().await;
        for day in self.record_days().await?.into_iter().rev() {
            if rewrite_lines(&self.record_path(day), false, &mut change)
                .await?
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionEntity>> {
        // Record files split sessions by start, so older files can only contain older sessions.
        let mut collected = vec![];
        for day in self.record_days().await?.into_iter().rev() {
            if collected.len() >= limit {
                break;
            }
            collected.extend(read_lines::<SessionEntity>(self.record_path(day)).await?);
        }
        Ok(queries::newest_sessions(&collected, limit))
    }

    async fn lifetime_points(&self) -> Result<f64> {
        Ok(self.all_sessions().await?.iter().map(|v| v.points).sum())
    }

    async fn day_totals(&self, date: NaiveDate) -> Result<DayTotals> {
        Ok(queries::totals_for(&self.sessions_around(date).await?, date))
    }

    async fn daily_totals_since(&self, since: NaiveDate) -> Result<Vec<DayTotals>> {
        Ok(queries::totals_since(&self.sessions_since(since).await?, since))
    }

    async fn active_dates(&self, since: NaiveDate) -> Result<Vec<NaiveDate>> {
        Ok(queries::active_dates(&self.sessions_since(since).await?, since))
    }

    async fn node_frequencies(
        &self,
        hour_low: i32,
        hour_high: i32,
        limit: usize,
    ) -> Result<Vec<NodeFrequency>> {
        let (sessions, nodes) = tokio::try_join!(self.all_sessions(), self.nodes())?;
        Ok(queries::node_frequencies(
            &sessions, &nodes, hour_low, hour_high, limit,
        ))
    }

    async fn recent_nodes(&self, exclude: &[String], limit: usize) -> Result<Vec<NodeEntity>> {
        Ok(queries::recent_nodes(&self.nodes().await?, exclude, limit))
    }

    async fn insert_session(&self, session: SessionEntity) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.all_sessions().await?.iter().any(|v| v.id == session.id) {
            return Ok(false);
        }
        let path = self.record_path(session.start_utc().date_naive());
        append_line(&path, &session).await?;
        Ok(true)
    }

    async fn update_draft_title(&self, id: &str, draft_title: &str) -> Result<bool> {
        self.change_session(|sessions| {
            let session = sessions.iter_mut().find(|v| v.id == id)?;
            session.draft_title = draft_title.into();
            Some(())
        })
        .await
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        self.change_session(|sessions| {
            let index = sessions.iter().position(|v| v.id == id)?;
            sessions.remove(index);
            Some(())
        })
        .await
    }

    async fn upsert_node_by_title(&self, title: &str, now: DateTime<Utc>) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let id = rewrite_lines(&self.nodes_path, true, |nodes: &mut Vec<NodeEntity>| {
            if let Some(node) = nodes.iter_mut().find(|v| v.title == title) {
                node.updated_at = now;
                return Some(node.id.clone());
            }
            let id = new_node_id();
            nodes.push(NodeEntity {
                id: id.clone(),
                title: title.into(),
                updated_at: now,
            });
            Some(id)
        })
        .await?;
        // The closure never declines, so the id is always there.
        id.ok_or_else(|| anyhow::anyhow!("Node {title} was not saved"))
    }

    async fn create_node(&self, title: &str, now: DateTime<Utc>) -> Result<NodeEntity> {
        let _guard = self.write_lock.lock().await;
        let node = NodeEntity {
            id: new_node_id(),
            title: title.into(),
            updated_at: now,
        };
        append_line(&self.nodes_path, &node).await?;
        Ok(node)
    }

    async fn touch_node(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        rewrite_lines(&self.nodes_path, false, |nodes: &mut Vec<NodeEntity>| {
            let node = nodes.iter_mut().find(|v| v.id == id)?;
            node.updated_at = now;
            Some(())
        })
        .await?;
        Ok(())
    }
}
