//! Causal graphs cached by model digest.

use cl_graph::{CausalGraph, GraphBuilder};
use cl_model::Model;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::AppResult;

/// Graphs kept before the oldest is dropped.
pub const DEFAULT_MAX_GRAPHS: usize = 16;

#[derive(Debug, Default)]
struct Entries {
    graphs: HashMap<String, Arc<CausalGraph>>,
    /// Digests in insertion order.
    order: VecDeque<String>,
}

/// Builds each distinct model's graph once, keeping at most `max_entries`.
#[derive(Debug)]
pub struct GraphCache {
    entries: Mutex<Entries>,
    max_entries: usize,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_GRAPHS)
    }
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `max_entries` graphs (at least one).
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn get_or_build(&self, model: &Model) -> AppResult<Arc<CausalGraph>> {
        let digest = cl_trace::model_digest(model);
        if let Some(graph) = self.lock().graphs.get(&digest) {
            return Ok(Arc::clone(graph));
        }
        debug!(digest = %digest, "building causal graph");
        let graph = Arc::new(GraphBuilder::from_model(model)?);

        let mut entries = self.lock();
        if let Some(existing) = entries.graphs.get(&digest) {
            return Ok(Arc::clone(existing));
        }
        while entries.graphs.len() >= self.max_entries {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            debug!(digest = %oldest, "evicting causal graph");
            entries.graphs.remove(&oldest);
        }
        entries.order.push_back(digest.clone());
        entries.graphs.insert(digest, Arc::clone(&graph));
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.lock().graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.graphs.clear();
        entries.order.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave a half-built entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(coef: f64) -> Model {
        serde_yaml::from_str(&format!(
            r#"
entities:
  A:
    components:
      x: {{ type: state, initial: 1.0 }}
      y:
        type: state
        initial: 0.0
        influences: [ {{ from: x, coef: {coef}, kind: positive }} ]
"#
        ))
        .unwrap()
    }

    #[test]
    fn same_model_shares_one_graph() {
        let cache = GraphCache::new();
        let a = cache.get_or_build(&model(0.5)).unwrap();
        let b = cache.get_or_build(&model(0.5)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_build(&model(0.7)).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn oldest_graph_is_evicted_at_capacity() {
        let cache = GraphCache::with_max_entries(2);
        let first = cache.get_or_build(&model(0.1)).unwrap();
        cache.get_or_build(&model(0.2)).unwrap();
        cache.get_or_build(&model(0.3)).unwrap();
        assert_eq!(cache.len(), 2);

        let rebuilt = cache.get_or_build(&model(0.1)).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(cache.len(), 2);
    }
}
