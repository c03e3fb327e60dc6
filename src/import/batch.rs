use crate::events::{ActorRow, EventRow, ProjectedTriple, RepoRow};
use std::collections::BTreeMap;

/// One drained flush unit: everything accumulated since the last drain.
#[derive(Debug, Default)]
pub struct Batch {
    pub actors: Vec<ActorRow>,
    pub repos: Vec<RepoRow>,
    pub events: Vec<EventRow>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty() && self.repos.is_empty() && self.events.is_empty()
    }
}

/// Per-entity-kind buffers keyed by identity, owned exclusively by the
/// orchestrator for the duration of one run.
///
/// Keying dedupes repeats of the same id within a batch, last write
/// wins. The store ignores conflicting ids anyway; this just avoids
/// sending redundant rows.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    actors: BTreeMap<i64, ActorRow>,
    repos: BTreeMap<i64, RepoRow>,
    events: BTreeMap<i64, EventRow>,
}

impl BatchAccumulator {
    pub fn append(&mut self, triple: ProjectedTriple) {
        self.actors.insert(triple.actor.id, triple.actor);
        self.repos.insert(triple.repo.id, triple.repo);
        self.events.insert(triple.event.id, triple.event);
    }

    /// Number of events buffered since the last drain.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn should_flush(&self, batch_size: usize) -> bool {
        self.events.len() >= batch_size
    }

    /// Take and clear all three buffers atomically; no row is returned
    /// twice.
    pub fn drain(&mut self) -> Batch {
        Batch {
            actors: std::mem::take(&mut self.actors).into_values().collect(),
            repos: std::mem::take(&mut self.repos).into_values().collect(),
            events: std::mem::take(&mut self.events).into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    fn triple(event_id: i64, actor_id: i64, repo_id: i64) -> ProjectedTriple {
        ProjectedTriple {
            actor: ActorRow {
                id: actor_id,
                login: format!("user{actor_id}"),
                url: String::new(),
                avatar_url: String::new(),
            },
            repo: RepoRow {
                id: repo_id,
                name: format!("org/repo{repo_id}"),
                url: String::new(),
            },
            event: EventRow {
                id: event_id,
                kind: EventKind::PullRequest,
                actor_id,
                repo_id,
                payload: "{}".to_string(),
                created_at: "2015-01-01T15:00:00Z".to_string(),
                comment: String::new(),
                count: 1,
            },
        }
    }

    #[test]
    fn flush_threshold_counts_events() {
        let mut acc = BatchAccumulator::default();
        for i in 0..3 {
            assert!(!acc.should_flush(3));
            acc.append(triple(i, 100, 200));
        }
        assert_eq!(acc.event_count(), 3);
        assert!(acc.should_flush(3));
    }

    #[test]
    fn repeated_ids_within_a_batch_dedupe_last_write_wins() {
        let mut acc = BatchAccumulator::default();
        acc.append(triple(1, 100, 200));
        let mut updated = triple(2, 100, 200);
        updated.actor.login = "renamed".to_string();
        acc.append(updated);

        let batch = acc.drain();
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.actors.len(), 1);
        assert_eq!(batch.repos.len(), 1);
        assert_eq!(batch.actors[0].login, "renamed");
    }

    #[test]
    fn drain_clears_and_returns_nothing_twice() {
        let mut acc = BatchAccumulator::default();
        acc.append(triple(1, 100, 200));
        let first = acc.drain();
        assert_eq!(first.events.len(), 1);
        assert!(!first.is_empty());

        let second = acc.drain();
        assert!(second.is_empty());
        assert_eq!(acc.event_count(), 0);
        assert!(!acc.should_flush(1));
    }
}
