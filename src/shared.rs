//! Thread-safe store handle.
//!
//! [`SharedStore`] serializes command application behind a reader/writer lock
//! and reports every completed command, successful or not, on a notification
//! channel. Notifications are sent while the write lock is held, so their
//! order matches the order in which commands took effect.
//!
//! File I/O for save and load happens outside the lock; only the final state
//! change is applied under it.

use crate::command::{self, Applied, Command, CommandError, CommandKind};
use crate::config::StoreConfig;
use crate::id::ProjectId;
use crate::model::Store;
use crate::persistence::{self, PersistenceError};
use crate::snapshot::{Handle, HandleTable, Snapshot, SnapshotLease};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors reported by [`SharedStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The project was edited while its bytes were being written, so the
    /// file does not match the in-memory state.
    #[error("project {project} changed while it was being saved")]
    Conflict { project: ProjectId },
}

/// Completion signal for one submitted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Sequence number of the request, in completion order.
    pub request: u64,
    pub command: CommandKind,
    /// The raw id of the created entity on success.
    pub result: Result<Option<u64>, StoreError>,
}

/// A store shared between threads.
pub struct SharedStore {
    store: RwLock<Store>,
    notifier: Sender<Notification>,
    handles: Arc<Mutex<HandleTable<Snapshot>>>,
    next_request: Mutex<u64>,
}

impl SharedStore {
    /// Creates an empty store and the receiving end of its notification
    /// channel.
    pub fn new(config: StoreConfig) -> (Self, Receiver<Notification>) {
        let (notifier, notifications) = crossbeam_channel::unbounded();
        let store = Self {
            store: RwLock::new(Store::new(config)),
            notifier,
            handles: Arc::new(Mutex::new(HandleTable::new())),
            next_request: Mutex::new(1),
        };
        (store, notifications)
    }

    /// Applies a command.
    pub fn submit(&self, command: Command) -> Result<Applied, StoreError> {
        let mut store = self.store.write();
        self.apply_locked(&mut store, command)
    }

    /// Runs `f` against the current state under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        f(&self.store.read())
    }

    /// Takes a snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.store.read().snapshot()
    }

    /// Takes a snapshot and registers it under a handle until the lease is
    /// dropped.
    pub fn lease_snapshot(&self) -> SnapshotLease {
        SnapshotLease::new(Arc::clone(&self.handles), self.snapshot())
    }

    /// Looks up a leased snapshot by handle.
    pub fn resolve(&self, handle: Handle) -> Option<Snapshot> {
        self.handles.lock().get(handle).cloned()
    }

    /// Releases a handle early. Returns `false` if it was not live.
    pub fn release(&self, handle: Handle) -> bool {
        self.handles.lock().release(handle).is_some()
    }

    /// Number of live snapshot handles.
    pub fn live_handles(&self) -> usize {
        self.handles.lock().len()
    }

    /// Writes a project to `path` and marks it saved.
    ///
    /// The project is encoded from a snapshot outside the lock. If it was
    /// edited in the meantime the save is reported as a conflict and the
    /// project stays unsaved.
    pub fn save_project(&self, project: ProjectId, path: &Path) -> Result<Applied, StoreError> {
        let (shared, revision, fallback) = {
            let store = self.store.read();
            let shared = store.shared_projects().get(&project).cloned();
            (shared, store.revision(project), store.config().save_format)
        };
        let Some(shared) = shared else {
            let err = CommandError::not_found(command::EntityKind::Project, project);
            return Err(self.reject(CommandKind::SaveProject, err.into()));
        };

        match persistence::save_to_file(&shared, path, fallback) {
            Ok(format) => {
                info!(project = %project, path = %path.display(), ?format, "project written")
            }
            Err(err) => return Err(self.reject(CommandKind::SaveProject, err.into())),
        }

        let mut store = self.store.write();
        let current = store.revision(project);
        if current.is_some() && current != revision {
            let err = StoreError::Conflict { project };
            return Err(self.reject_locked(CommandKind::SaveProject, err));
        }
        self.apply_locked(
            &mut store,
            Command::SaveProject {
                project,
                path: path.to_path_buf(),
            },
        )
    }

    /// Reads the project stored at `path` and opens it as the active project.
    pub fn load_project(&self, path: &Path) -> Result<Applied, StoreError> {
        let fallback = self.store.read().config().save_format;
        match persistence::load_from_file(path, fallback) {
            Ok(project) => self.submit(Command::LoadProject {
                path: path.to_path_buf(),
                project: Box::new(project),
            }),
            Err(err) => Err(self.reject(CommandKind::LoadProject, err.into())),
        }
    }

    fn apply_locked(&self, store: &mut Store, command: Command) -> Result<Applied, StoreError> {
        let kind = command.kind();
        let request = self.next_request();
        match command::apply(store, command) {
            Ok(applied) => {
                debug!(request, command = %kind, created = ?applied.created, "command applied");
                self.notify(Notification {
                    request,
                    command: kind,
                    result: Ok(applied.created),
                });
                Ok(applied)
            }
            Err(err) => {
                warn!(request, command = %kind, error = %err, "command rejected");
                let err = StoreError::from(err);
                self.notify(Notification {
                    request,
                    command: kind,
                    result: Err(err.clone()),
                });
                Err(err)
            }
        }
    }

    /// Reports a failure that happened before the command reached the store.
    fn reject(&self, kind: CommandKind, err: StoreError) -> StoreError {
        let _store = self.store.write();
        self.reject_locked(kind, err)
    }

    fn reject_locked(&self, kind: CommandKind, err: StoreError) -> StoreError {
        let request = self.next_request();
        warn!(request, command = %kind, error = %err, "command failed");
        self.notify(Notification {
            request,
            command: kind,
            result: Err(err.clone()),
        });
        err
    }

    fn next_request(&self) -> u64 {
        let mut next = self.next_request.lock();
        let request = *next;
        *next += 1;
        request
    }

    fn notify(&self, notification: Notification) {
        if self.notifier.send(notification).is_err() {
            trace!("notification receiver dropped");
        }
    }
}
