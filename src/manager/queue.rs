//! Ordered job containers with an explicit uniqueness index.
//!
//! Uniqueness is keyed by the `(source URI, destination URI)` pair, never
//! by the ordering timestamp, so two distinct jobs created in the same
//! second both survive.

use std::collections::HashSet;
use std::sync::Arc;

use crate::transfer::Transfer;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JobKey {
    source: String,
    destination: String,
}

impl JobKey {
    fn of(transfer: &Transfer) -> Self {
        Self {
            source: transfer.source().uri().to_string(),
            destination: transfer.destination().uri().to_string(),
        }
    }
}

/// Insertion-ordered set of transfers, unique by `(source, destination)`.
/// Insertion order is creation order for jobs the manager builds itself;
/// snapshot loads preserve the persisted order.
#[derive(Default)]
pub(crate) struct JobSet {
    jobs: Vec<Arc<Transfer>>,
    keys: HashSet<JobKey>,
}

impl JobSet {
    pub fn contains(&self, transfer: &Transfer) -> bool {
        self.keys.contains(&JobKey::of(transfer))
    }

    /// Insert unless the pair is already present; reports whether the
    /// transfer was added.
    pub fn insert(&mut self, transfer: Arc<Transfer>) -> bool {
        if !self.keys.insert(JobKey::of(&transfer)) {
            return false;
        }
        self.jobs.push(transfer);
        true
    }

    pub fn remove(&mut self, transfer: &Transfer) -> bool {
        let key = JobKey::of(transfer);
        if !self.keys.remove(&key) {
            return false;
        }
        self.jobs.retain(|j| JobKey::of(j) != key);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Transfer>> {
        self.jobs.iter()
    }

    pub fn to_vec(&self) -> Vec<Arc<Transfer>> {
        self.jobs.clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}
