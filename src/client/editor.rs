//! Editor session state: open tabs and in-memory file buffers.
//!
//! The buffer map is the authoritative client-side value for an open file
//! until the next save round-trip. Tabs are kept in open order; when the
//! active tab goes away, the most recently opened remaining tab takes over.

use crate::client::tree::path_is_within;
use crate::language::language_for_path;
use std::collections::HashMap;

/// One open file tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TabState {
    pub path: String,
    pub language: &'static str,
    /// True once local content diverges from the last persisted content
    pub modified: bool,
    pub has_errors: bool,
}

/// Open tabs plus the per-path content buffers.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    buffers: HashMap<String, String>,
    /// Tabs in the order they were opened
    tabs: Vec<TabState>,
    active: Option<String>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab for a path (no-op if already open) and make it active.
    pub fn open_tab(&mut self, path: &str) {
        if !self.tabs.iter().any(|t| t.path == path) {
            self.tabs.push(TabState {
                path: path.to_string(),
                language: language_for_path(path),
                modified: false,
                has_errors: false,
            });
        }
        self.active = Some(path.to_string());
    }

    /// Close a tab, keeping its buffer. Falls back to the most recently
    /// opened remaining tab if the active one was closed.
    pub fn close_tab(&mut self, path: &str) {
        self.tabs.retain(|t| t.path != path);
        if self.active.as_deref() == Some(path) {
            self.active = self.tabs.last().map(|t| t.path.clone());
        }
    }

    pub fn set_active(&mut self, path: &str) {
        if self.tabs.iter().any(|t| t.path == path) {
            self.active = Some(path.to_string());
        }
    }

    pub fn active_path(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_tab(&self) -> Option<&TabState> {
        let path = self.active.as_deref()?;
        self.tab(path)
    }

    pub fn tab(&self, path: &str) -> Option<&TabState> {
        self.tabs.iter().find(|t| t.path == path)
    }

    pub fn tabs(&self) -> &[TabState] {
        &self.tabs
    }

    pub fn buffer(&self, path: &str) -> Option<&str> {
        self.buffers.get(path).map(String::as_str)
    }

    pub fn set_buffer(&mut self, path: &str, content: impl Into<String>) {
        self.buffers.insert(path.to_string(), content.into());
    }

    pub fn set_modified(&mut self, path: &str, modified: bool) {
        if let Some(tab) = self.tabs.iter_mut().find(|t| t.path == path) {
            tab.modified = modified;
        }
    }

    pub fn set_has_errors(&mut self, path: &str, has_errors: bool) {
        if let Some(tab) = self.tabs.iter_mut().find(|t| t.path == path) {
            tab.has_errors = has_errors;
        }
    }

    /// Migrate every buffer, tab, and the active marker from paths under
    /// `old_prefix` to the same position under `new_prefix`. Used after a
    /// rename or move so no state remains under the old path.
    pub fn rekey_prefix(&mut self, old_prefix: &str, new_prefix: &str) {
        let rekey = |path: &str| -> Option<String> {
            if path_is_within(path, old_prefix) {
                Some(format!("{}{}", new_prefix, &path[old_prefix.len()..]))
            } else {
                None
            }
        };

        let moved: Vec<(String, String)> = self
            .buffers
            .keys()
            .filter_map(|path| rekey(path).map(|new| (path.clone(), new)))
            .collect();
        for (old, new) in moved {
            if let Some(content) = self.buffers.remove(&old) {
                self.buffers.insert(new, content);
            }
        }

        for tab in &mut self.tabs {
            if let Some(new) = rekey(&tab.path) {
                tab.language = language_for_path(&new);
                tab.path = new;
            }
        }

        if let Some(active) = &self.active {
            if let Some(new) = rekey(active) {
                self.active = Some(new);
            }
        }
    }

    /// Drop all buffers and tabs at or under a path. If the active tab was
    /// among them, the most recently opened remaining tab becomes active.
    pub fn remove_under(&mut self, path: &str) {
        self.buffers.retain(|p, _| !path_is_within(p, path));
        self.tabs.retain(|t| !path_is_within(&t.path, path));
        match &self.active {
            Some(active) if path_is_within(active, path) => {
                self.active = self.tabs.last().map(|t| t.path.clone());
            }
            _ => {}
        }
    }

    /// Discard everything, e.g. on team switch.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.tabs.clear();
        self.active = None;
    }
}
