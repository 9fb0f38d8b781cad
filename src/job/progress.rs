//! Shared per-job progress.
//!
//! One writer per job (its progress parser, then the orchestrator) and any
//! number of polling readers. Entries are never evicted.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{JobId, JobState};

/// Last recorded state of a job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobProgress {
    /// Always within [0, 100]
    pub percent: f64,
    pub state: JobState,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            percent: 0.0,
            state: JobState::Created,
        }
    }
}

/// Clamp a percentage into [0, 100]. NaN becomes 0.
pub fn clamp_percent(pct: f64) -> f64 {
    if pct.is_nan() {
        0.0
    } else {
        pct.clamp(0.0, 100.0)
    }
}

/// Cloneable handle to the progress map
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    inner: Arc<RwLock<HashMap<JobId, JobProgress>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in state `Created`.
    ///
    /// Returns false, leaving the existing entry untouched, if the id is
    /// already known.
    pub async fn try_register(&self, id: &JobId) -> bool {
        let mut map = self.inner.write().await;
        if map.contains_key(id) {
            return false;
        }
        map.insert(id.clone(), JobProgress::default());
        true
    }

    /// Record a percentage, replacing any previous value
    pub async fn set_progress(&self, id: &JobId, pct: f64) {
        let pct = clamp_percent(pct);
        let mut map = self.inner.write().await;
        map.entry(id.clone()).or_default().percent = pct;
    }

    /// Last recorded percentage, or 0 for unknown ids
    pub async fn get_progress(&self, id: &str) -> f64 {
        self.inner
            .read()
            .await
            .get(id)
            .map(|p| p.percent)
            .unwrap_or(0.0)
    }

    pub async fn set_state(&self, id: &JobId, state: JobState) {
        let mut map = self.inner.write().await;
        map.entry(id.clone()).or_default().state = state;
    }

    pub async fn snapshot(&self, id: &str) -> Option<JobProgress> {
        self.inner.read().await.get(id).copied()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
