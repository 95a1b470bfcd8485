use std::collections::HashSet;

use crate::storage::entities::{NodeEntity, NodeFrequency};

/// Total amount of suggested nodes.
pub const SUGGESTION_SLOTS: usize = 8;
/// How many of the slots can be taken by nodes used around the current time of day.
pub const FREQUENT_SLOTS: usize = 5;
/// Sessions started this many hours before or after the current hour count as "around now".
pub const HOUR_SPREAD: i32 = 2;

/// Hour window used for frequency ranking. It doesn't wrap around midnight, so at 1 AM the
/// window is -1..=3 and sessions from 23:00 are not considered.
pub fn hour_window(hour: u32) -> (i32, i32) {
    let hour = hour as i32;
    (hour - HOUR_SPREAD, hour + HOUR_SPREAD)
}

/// Combines nodes used around this time of day with recently touched ones.
///
/// Up to [FREQUENT_SLOTS] nodes are taken from `frequent` in the given order, then the rest of
/// [SUGGESTION_SLOTS] is filled from `recent`. A node never appears twice.
pub fn rank_suggestions(
    frequent: impl IntoIterator<Item = NodeFrequency>,
    recent: impl IntoIterator<Item = NodeEntity>,
) -> Vec<NodeEntity> {
    let mut seen = HashSet::<String>::new();
    let mut suggestions = Vec::with_capacity(SUGGESTION_SLOTS);

    for NodeFrequency { node, .. } in frequent {
        if suggestions.len() >= FREQUENT_SLOTS {
            break;
        }
        if seen.insert(node.id.clone()) {
            suggestions.push(node);
        }
    }

    for node in recent {
        if suggestions.len() >= SUGGESTION_SLOTS {
            break;
        }
        if seen.insert(node.id.clone()) {
            suggestions.push(node);
        }
    }

    suggestions
}
