//! Read-only views of the store.
//!
//! A [`Snapshot`] shares project data with the live store through `Arc`, so
//! taking one is cheap and holding one never blocks later edits: the store
//! copies a project the first time it edits it while a snapshot still
//! references it.
//!
//! Callers that cannot hold Rust references (scripts, foreign bindings) refer
//! to snapshots through opaque [`Handle`]s issued by a [`HandleTable`].

use crate::id::{ProjectId, StoreId};
use crate::model::{Project, Store};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// The whole entity graph as of one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    store: StoreId,
    active_project: Option<ProjectId>,
    projects: BTreeMap<ProjectId, Arc<Project>>,
}

impl Snapshot {
    pub fn store_id(&self) -> StoreId {
        self.store
    }

    pub fn active_project(&self) -> Option<ProjectId> {
        self.active_project
    }

    /// Returns the active project, if any.
    pub fn active(&self) -> Option<&Project> {
        self.active_project.and_then(|id| self.project(id))
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id).map(|p| p.as_ref())
    }

    /// Returns the projects ordered by id.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values().map(|p| p.as_ref())
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Serializes the snapshot as pretty JSON.
    ///
    /// Output is deterministic: equal snapshots produce identical text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Store {
    /// Takes a snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            store: self.id(),
            active_project: self.active_project(),
            projects: self.shared_projects().clone(),
        }
    }
}

/// Opaque reference to an entry of a [`HandleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues handles for values held on behalf of a caller.
///
/// Handle values are never reused, so a stale handle can only miss, never
/// resolve to someone else's value.
#[derive(Debug)]
pub struct HandleTable<T> {
    entries: HashMap<Handle, T>,
    next: u64,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next: 1,
        }
    }

    /// Stores `value` and returns its handle.
    pub fn acquire(&mut self, value: T) -> Handle {
        let handle = Handle(self.next);
        self.next += 1;
        self.entries.insert(handle, value);
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle)
    }

    /// Drops the value behind `handle`, returning it if the handle was live.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        self.entries.remove(&handle)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot registered in a shared handle table for as long as the lease
/// lives. Dropping the lease releases the handle.
pub struct SnapshotLease {
    handle: Handle,
    snapshot: Snapshot,
    table: Arc<Mutex<HandleTable<Snapshot>>>,
}

impl SnapshotLease {
    pub(crate) fn new(table: Arc<Mutex<HandleTable<Snapshot>>>, snapshot: Snapshot) -> Self {
        let handle = table.lock().acquire(snapshot.clone());
        Self {
            handle,
            snapshot,
            table,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl Deref for SnapshotLease {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl Drop for SnapshotLease {
    fn drop(&mut self) {
        self.table.lock().release(self.handle);
    }
}

impl fmt::Debug for SnapshotLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotLease")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{apply, Command};

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let mut store = Store::default();
        apply(&mut store, Command::NewProject).unwrap();
        let project = store.active_project().unwrap();
        let before = store.snapshot();

        apply(
            &mut store,
            Command::AddPattern {
                project,
                name: "B".to_string(),
            },
        )
        .unwrap();

        assert_eq!(before.project(project).unwrap().song().pattern_count(), 1);
        assert_eq!(
            store.snapshot().project(project).unwrap().song().pattern_count(),
            2
        );
        assert_ne!(before, store.snapshot());
    }

    #[test]
    fn test_equal_states_serialize_identically() {
        let mut store = Store::default();
        apply(&mut store, Command::NewProject).unwrap();
        let a = store.snapshot().to_json().unwrap();
        let b = store.snapshot().to_json().unwrap();
        assert_eq!(a, b);
        assert_eq!(store.snapshot().active().map(Project::id), store.active_project());
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut table = HandleTable::new();
        let a = table.acquire("a");
        assert_eq!(table.release(a), Some("a"));
        let b = table.acquire("b");
        assert_ne!(a, b);
        assert!(table.get(a).is_none());
        assert_eq!(table.get(b), Some(&"b"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let table = Arc::new(Mutex::new(HandleTable::new()));
        let store = Store::default();
        let lease = SnapshotLease::new(table.clone(), store.snapshot());
        let handle = lease.handle();
        assert!(table.lock().get(handle).is_some());
        assert_eq!(lease.project_count(), 0);

        drop(lease);
        assert!(table.lock().get(handle).is_none());
        assert!(table.lock().is_empty());
    }
}
