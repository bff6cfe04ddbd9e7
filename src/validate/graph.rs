use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::model::journal::{EventJournal, JournalEvent};

use super::ValidationError;

/// Build the referrer → user graph from the journal's joins and check it is
/// acyclic. A cycle can only come from a corrupted journal (journals built
/// against a live engine reject unknown referrers first), but replay must
/// never loop on one.
pub fn check_referral_graph(journal: &EventJournal) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut graph = DiGraph::<&str, ()>::new();
    let mut index_map: HashMap<&str, NodeIndex> = HashMap::new();

    for event in &journal.events {
        if let JournalEvent::Join {
            user_id,
            referrer_id,
            ..
        } = event
        {
            let from = *index_map
                .entry(referrer_id.as_str())
                .or_insert_with(|| graph.add_node(referrer_id.as_str()));
            let to = *index_map
                .entry(user_id.as_str())
                .or_insert_with(|| graph.add_node(user_id.as_str()));
            if from != to {
                graph.add_edge(from, to, ());
            }
        }
    }

    if is_cyclic_directed(&graph) {
        errors.push(ValidationError::ReferralCycle);
    }
    errors
}
