use crate::model::{InstalledModule, PendingUpdate};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Which user actions are currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionState {
    pub refresh: bool,
    pub update: bool,
    pub update_all: bool,
    pub view_notes: bool,
}

/// View-model holding the two module collections and the update selection.
///
/// Collections are swapped as whole `Arc`s, so a reader sees either the old
/// or the new list and never a partially filled one.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    updates: RwLock<Arc<Vec<PendingUpdate>>>,
    installed: RwLock<Arc<Vec<InstalledModule>>>,
    /// Lowercased names of selected pending updates.
    selection: RwLock<BTreeSet<String>>,
    status: RwLock<String>,
    in_flight: AtomicUsize,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Arc<Vec<PendingUpdate>> {
        read(&self.updates).clone()
    }

    pub fn installed(&self) -> Arc<Vec<InstalledModule>> {
        read(&self.installed).clone()
    }

    /// Replaces the pending updates and drops the selection.
    pub fn replace_updates(&self, updates: Vec<PendingUpdate>) {
        *write(&self.updates) = Arc::new(updates);
        write(&self.selection).clear();
    }

    pub fn replace_installed(&self, modules: Vec<InstalledModule>) {
        *write(&self.installed) = Arc::new(modules);
    }

    /// Selects the pending update called `name`; false if there is none.
    pub fn select(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        let known = self
            .updates()
            .iter()
            .any(|u| u.name.to_ascii_lowercase() == key);
        if known {
            write(&self.selection).insert(key);
        }
        known
    }

    pub fn select_all(&self) {
        let updates = self.updates();
        let mut selection = write(&self.selection);
        selection.extend(updates.iter().map(|u| u.name.to_ascii_lowercase()));
    }

    #[cfg(test)]
    pub fn clear_selection(&self) {
        write(&self.selection).clear();
    }

    /// Names of the selected pending updates, in collection order.
    pub fn selected_names(&self) -> Vec<String> {
        let updates = self.updates();
        let selection = read(&self.selection);
        updates
            .iter()
            .filter(|u| selection.contains(&u.name.to_ascii_lowercase()))
            .map(|u| u.name.clone())
            .collect()
    }

    /// The first selected pending update.
    pub fn selected_update(&self) -> Option<PendingUpdate> {
        let updates = self.updates();
        let selection = read(&self.selection);
        updates
            .iter()
            .find(|u| selection.contains(&u.name.to_ascii_lowercase()))
            .cloned()
    }

    pub fn find_installed(&self, name: &str) -> Option<InstalledModule> {
        self.installed()
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn actions(&self) -> ActionState {
        let idle = !self.is_busy();
        let has_selection = !self.selected_names().is_empty();
        let has_updates = !self.updates().is_empty();
        ActionState {
            refresh: idle,
            update: idle && has_selection,
            update_all: idle && has_updates,
            view_notes: has_selection,
        }
    }

    pub fn status(&self) -> String {
        read(&self.status).clone()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        *write(&self.status) = status.into();
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Marks an operation in flight until the returned guard is dropped.
    pub fn begin_operation(&self) -> BusyGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        BusyGuard { registry: self }
    }
}

/// Re-enables actions on drop, whichever way the operation ended.
#[must_use = "actions are re-enabled as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    registry: &'a ModuleRegistry,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.registry.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
