use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::tab::{Tab, TabId};

/// The workspace owns every open editor tab
pub struct Workspace {
    tabs: RwLock<Vec<Arc<Tab>>>,
    next_tab_id: AtomicUsize,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tabs: RwLock::new(Vec::new()),
            next_tab_id: AtomicUsize::new(0),
        }
    }

    /// Create a new, empty tab. The name is for display only and does not
    /// need to be unique.
    pub fn create_editor(&self, name: &str) -> Arc<Tab> {
        let id = self.next_tab_id.fetch_add(1, Ordering::Relaxed);
        let tab = Arc::new(Tab::new(id, name));
        if let Ok(mut tabs) = self.tabs.write() {
            tabs.push(Arc::clone(&tab));
        }
        debug!(tab_id = id, name, "created editor tab");
        tab
    }

    pub fn tabs(&self) -> Vec<Arc<Tab>> {
        self.tabs.read().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn tab(&self, id: TabId) -> Option<Arc<Tab>> {
        self.tabs
            .read()
            .ok()?
            .iter()
            .find(|t| t.id() == id)
            .cloned()
    }

    /// First tab with the given display name
    pub fn find(&self, name: &str) -> Option<Arc<Tab>> {
        self.tabs
            .read()
            .ok()?
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    pub fn close_tab(&self, id: TabId) -> bool {
        let Ok(mut tabs) = self.tabs.write() else {
            return false;
        };
        let before = tabs.len();
        tabs.retain(|t| t.id() != id);
        tabs.len() != before
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
