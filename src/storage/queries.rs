//! Aggregations shared by every [SessionStore](super::store::SessionStore) realization. Stores
//! only need to provide the sessions that might be relevant, filtering by local time happens
//! here.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::utils::time::{local_date, local_hour};

use super::entities::{DayTotals, NodeEntity, NodeFrequency, SessionEntity};

/// Newest sessions first.
pub fn newest_sessions<'a>(
    sessions: impl IntoIterator<Item = &'a SessionEntity>,
    limit: usize,
) -> Vec<SessionEntity> {
    let mut sessions = sessions.into_iter().cloned().collect::<Vec<_>>();
    sessions.sort_by(|a, b| b.start_at.cmp(&a.start_at));
    sessions.truncate(limit);
    sessions
}

pub fn totals_for<'a>(
    sessions: impl IntoIterator<Item = &'a SessionEntity>,
    date: NaiveDate,
) -> DayTotals {
    let mut totals = DayTotals::empty(date);
    for session in sessions {
        if local_date(&session.start_at) == date {
            totals.add(session);
        }
    }
    totals
}

/// Groups sessions by local day, ascending.
pub fn totals_since<'a>(
    sessions: impl IntoIterator<Item = &'a SessionEntity>,
    since: NaiveDate,
) -> Vec<DayTotals> {
    let mut days = BTreeMap::<NaiveDate, DayTotals>::new();
    for session in sessions {
        let date = local_date(&session.start_at);
        if date < since {
            continue;
        }
        days.entry(date)
            .or_insert_with(|| DayTotals::empty(date))
            .add(session);
    }
    days.into_values().collect()
}

/// Distinct local days with activity, newest first.
pub fn active_dates<'a>(
    sessions: impl IntoIterator<Item = &'a SessionEntity>,
    since: NaiveDate,
) -> Vec<NaiveDate> {
    let dates = sessions
        .into_iter()
        .map(|v| local_date(&v.start_at))
        .filter(|v| *v >= since)
        .collect::<BTreeSet<_>>();
    dates.into_iter().rev().collect()
}

/// Counts sessions of every node started inside the hour window. Only sessions pointing to an
/// existing node count. Ties keep the order of `nodes`.
pub fn node_frequencies<'a>(
    sessions: impl IntoIterator<Item = &'a SessionEntity>,
    nodes: &[NodeEntity],
    hour_low: i32,
    hour_high: i32,
    limit: usize,
) -> Vec<NodeFrequency> {
    let mut counts = HashMap::<&str, usize>::new();
    for session in sessions {
        let Some(node_id) = session.node_id.as_deref() else {
            continue;
        };
        let hour = local_hour(&session.start_at);
        if hour_low <= hour && hour <= hour_high {
            *counts.entry(node_id).or_default() += 1;
        }
    }

    let mut ranked = nodes
        .iter()
        .filter_map(|node| {
            counts.get(node.id.as_str()).map(|count| NodeFrequency {
                node: node.clone(),
                count: *count,
            })
        })
        .collect::<Vec<_>>();
    // Stable, so equal counts stay in storage order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Nodes by last update, newest first, skipping `exclude`. Ties keep the order of `nodes`.
pub fn recent_nodes(nodes: &[NodeEntity], exclude: &[String], limit: usize) -> Vec<NodeEntity> {
    let mut recent = nodes
        .iter()
        .filter(|v| !exclude.contains(&v.id))
        .cloned()
        .collect::<Vec<_>>();
    recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    recent.truncate(limit);
    recent
}
