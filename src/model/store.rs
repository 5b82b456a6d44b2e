//! The store: every open project plus its history.

use super::project::Project;
use crate::command::{CommandError, EntityKind};
use crate::config::StoreConfig;
use crate::history::HistoryManager;
use crate::id::{ProjectId, StoreId};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// Owns all open projects, the active-project selection and one history per
/// project.
///
/// Projects are held behind `Arc` so snapshots can share them; a project is
/// copied only when it is edited while a snapshot still references it.
#[derive(Debug, Clone)]
pub struct Store {
    id: StoreId,
    projects: BTreeMap<ProjectId, Arc<Project>>,
    active_project: Option<ProjectId>,
    histories: HashMap<ProjectId, HistoryManager>,
    config: StoreConfig,
}

impl Store {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            id: StoreId::new(),
            projects: BTreeMap::new(),
            active_project: None,
            histories: HashMap::new(),
            config,
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn active_project(&self) -> Option<ProjectId> {
        self.active_project
    }

    /// Returns the open projects ordered by id.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values().map(|p| p.as_ref())
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.projects.keys().copied().collect()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id).map(|p| p.as_ref())
    }

    pub fn history(&self, id: ProjectId) -> Option<&HistoryManager> {
        self.histories.get(&id)
    }

    /// Returns the project's content revision, see [`HistoryManager::revision`].
    pub fn revision(&self, id: ProjectId) -> Option<u64> {
        self.histories.get(&id).map(HistoryManager::revision)
    }

    pub(crate) fn shared_projects(&self) -> &BTreeMap<ProjectId, Arc<Project>> {
        &self.projects
    }

    /// Borrows a project and its history for editing.
    pub(crate) fn project_and_history_mut(
        &mut self,
        id: ProjectId,
    ) -> Result<(&mut Project, &mut HistoryManager), CommandError> {
        let not_found = || CommandError::not_found(EntityKind::Project, id);
        let project = self.projects.get_mut(&id).ok_or_else(not_found)?;
        let history = self.histories.get_mut(&id).ok_or_else(not_found)?;
        Ok((Arc::make_mut(project), history))
    }

    /// Adds a project with an empty history and makes it active.
    pub(crate) fn insert_project(&mut self, project: Project) -> ProjectId {
        let id = project.id();
        self.histories
            .insert(id, HistoryManager::new(self.config.history_limit));
        self.projects.insert(id, Arc::new(project));
        self.active_project = Some(id);
        id
    }

    /// Removes a project and discards its history.
    ///
    /// If it was active, the next project by id becomes active, else the
    /// previous one, else none.
    pub(crate) fn remove_project(&mut self, id: ProjectId) -> Result<Arc<Project>, CommandError> {
        let project = self
            .projects
            .remove(&id)
            .ok_or_else(|| CommandError::not_found(EntityKind::Project, id))?;
        self.histories.remove(&id);

        if self.active_project == Some(id) {
            let next = self
                .projects
                .range((Bound::Excluded(id), Bound::Unbounded))
                .next()
                .or_else(|| self.projects.range(..id).next_back())
                .map(|(id, _)| *id);
            self.active_project = next;
        }
        Ok(project)
    }

    pub(crate) fn set_active_project(&mut self, id: ProjectId) -> Result<(), CommandError> {
        if !self.projects.contains_key(&id) {
            return Err(CommandError::not_found(EntityKind::Project, id));
        }
        self.active_project = Some(id);
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
