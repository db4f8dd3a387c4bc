use std::collections::BTreeMap;

use super::{ProjectRecord, ScheduleStore};
use crate::ScheduleResult;

/// In-process store, keyed by project name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: BTreeMap<String, ProjectRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ScheduleStore for MemoryStore {
    fn load_project(&self, name: &str) -> ScheduleResult<Option<ProjectRecord>> {
        Ok(self.projects.get(name).cloned())
    }

    fn put_project(&mut self, record: ProjectRecord) -> ScheduleResult<()> {
        self.projects.insert(record.name.clone(), record);
        Ok(())
    }

    fn project_names(&self) -> ScheduleResult<Vec<String>> {
        Ok(self.projects.keys().cloned().collect())
    }
}
