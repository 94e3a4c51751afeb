//! Bounded in-memory run history.

use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::types::JobRun;

/// Maximum number of job runs to keep in memory.
pub(crate) const MAX_JOB_RUNS: usize = 1000;

/// Internal storage optimized for both iteration and lookup by ID.
#[derive(Debug, Default)]
pub(crate) struct RunHistory {
    /// Ordered list of job run IDs (oldest first).
    order: VecDeque<Uuid>,
    runs: HashMap<Uuid, JobRun>,
}

impl RunHistory {
    /// Insert a new job run, maintaining the size limit.
    pub(crate) fn insert(&mut self, run: JobRun) {
        let id = run.id;
        self.runs.insert(id, run);
        self.order.push_back(id);

        while self.order.len() > MAX_JOB_RUNS {
            if let Some(old_id) = self.order.pop_front() {
                self.runs.remove(&old_id);
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, id: &Uuid) -> Option<&JobRun> {
        self.runs.get(id)
    }

    /// Applies `f` to a run if it is still retained.
    pub(crate) fn update(&mut self, id: &Uuid, f: impl FnOnce(&mut JobRun)) {
        if let Some(run) = self.runs.get_mut(id) {
            f(run);
        }
    }

    /// Most recent first, optionally filtered by job name.
    pub(crate) fn list(&self, job_name: Option<&str>, limit: usize, offset: usize) -> Vec<JobRun> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.runs.get(id))
            .filter(|r| job_name.map_or(true, |name| r.job_name == name))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub(crate) fn count(&self, job_name: Option<&str>) -> usize {
        match job_name {
            Some(name) => self.runs.values().filter(|r| r.job_name == name).count(),
            None => self.runs.len(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.runs.clear();
    }
}
