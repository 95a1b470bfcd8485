use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{
    entities::{DayTotals, NodeEntity, NodeFrequency, SessionEntity},
    queries,
    store::{new_node_id, SessionStore},
};

/// Keeps sessions and nodes in memory. Mostly useful for fixtures.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<Vec<SessionEntity>>,
    nodes: RwLock<Vec<NodeEntity>>,
}

impl MemoryStore {
    pub fn new(sessions: Vec<SessionEntity>, nodes: Vec<NodeEntity>) -> Self {
        Self {
            sessions: RwLock::new(sessions),
            nodes: RwLock::new(nodes),
        }
    }

    pub async fn nodes(&self) -> Vec<NodeEntity> {
        self.nodes.read().await.clone()
    }

    pub async fn sessions(&self) -> Vec<SessionEntity> {
        self.sessions.read().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionEntity>> {
        Ok(queries::newest_sessions(self.sessions.read().await.iter(), limit))
    }

    async fn lifetime_points(&self) -> Result<f64> {
        Ok(self.sessions.read().await.iter().map(|v| v.points).sum())
    }

    async fn day_totals(&self, date: NaiveDate) -> Result<DayTotals> {
        Ok(queries::totals_for(self.sessions.read().await.iter(), date))
    }

    async fn daily_totals_since(&self, since: NaiveDate) -> Result<Vec<DayTotals>> {
        Ok(queries::totals_since(self.sessions.read().await.iter(), since))
    }

    async fn active_dates(&self, since: NaiveDate) -> Result<Vec<NaiveDate>> {
        Ok(queries::active_dates(self.sessions.read().await.iter(), since))
    }

    async fn node_frequencies(
        &self,
        hour_low: i32,
        hour_high: i32,
        limit: usize,
    ) -> Result<Vec<NodeFrequency>> {
        let sessions = self.sessions.read().await;
        let nodes = self.nodes.read().await;
        Ok(queries::node_frequencies(
            sessions.iter(),
            &nodes,
            hour_low,
            hour_high,
            limit,
        ))
    }

    async fn recent_nodes(&self, exclude: &[String], limit: usize) -> Result<Vec<NodeEntity>> {
        Ok(queries::recent_nodes(&self.nodes.read().await, exclude, limit))
    }

    async fn insert_session(&self, session: SessionEntity) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|v| v.id == session.id) {
            return Ok(false);
        }
        sessions.push(session);
        Ok(true)
    }

    async fn update_draft_title(&self, id: &str, draft_title: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|v| v.id == id) {
            Some(session) => {
                session.draft_title = draft_title.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|v| v.id != id);
        Ok(sessions.len() != before)
    }

    async fn upsert_node_by_title(&self, title: &str, now: DateTime<Utc>) -> Result<String> {
        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes.iter_mut().find(|v| v.title == title) {
            node.updated_at = now;
            return Ok(node.id.clone());
        }
        let node = NodeEntity {
            id: new_node_id(),
            title: title.into(),
            updated_at: now,
        };
        let id = node.id.clone();
        nodes.push(node);
        Ok(id)
    }

    async fn create_node(&self, title: &str, now: DateTime<Utc>) -> Result<NodeEntity> {
        let node = NodeEntity {
            id: new_node_id(),
            title: title.into(),
            updated_at: now,
        };
        self.nodes.write().await.push(node.clone());
        Ok(node)
    }

    async fn touch_node(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        if let Some(node) = self.nodes.write().await.iter_mut().find(|v| v.id == id) {
            node.updated_at = now;
        }
        Ok(())
    }
}
