use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::{entities::SessionEntity, store::SessionStore};

/// A session as it is sent by a client. Unlike [SessionEntity] most of the fields are optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub draft_title: String,
    pub start_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub focus: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Saved(String),
    DuplicateId(String),
}

/// Saves a session and links it to a node.
///
/// An explicit node id is used as is and its node gets bumped. Without one, the draft title is
/// used to find a node with the same title or to create it. Failing to create the node doesn't
/// prevent the session from being saved, it just stays unlinked.
pub async fn record_session(
    store: &impl SessionStore,
    request: NewSession,
    now: DateTime<Utc>,
) -> Result<IngestOutcome> {
    let NewSession {
        id,
        node_id,
        draft_title,
        start_at,
        minutes,
        points,
        focus,
    } = request;

    let id = if id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        id
    };

    let node_id = if !node_id.is_empty() {
        if let Err(e) = store.touch_node(&node_id, now).await {
            warn!("Failed to bump node {node_id}: {e:?}");
        }
        Some(node_id)
    } else if !draft_title.is_empty() {
        store
            .upsert_node_by_title(&draft_title, now)
            .await
            .inspect_err(|e| warn!("Failed to find or create node {draft_title}: {e:?}"))
            .ok()
    } else {
        None
    };

    let session = SessionEntity {
        id: id.clone(),
        node_id,
        draft_title,
        start_at,
        minutes,
        points,
        focus,
    };

    if store.insert_session(session).await? {
        info!("Saved session {id}");
        Ok(IngestOutcome::Saved(id))
    } else {
        Ok(IngestOutcome::DuplicateId(id))
    }
}
