//! Synchronization engine: turns tree and content mutations into store calls.
//!
//! The engine owns the session state (tree + editor) and a per-path debounce
//! timer map. Auto-save failures are logged but never surfaced; the next
//! edit's debounce cycle retries, and the user can always save explicitly.
//! Structural operations apply to the tree optimistically and restore the
//! pre-operation tree if a store call fails; the error still surfaces.
//!
//! The store has no atomic rename, so rename and move are write-then-delete
//! per file. A failure between the two leaves the old file behind as an
//! orphan; the engine logs that divergence and keeps the new file.

use super::api::{ClientError, WorkspaceBackend};
use super::editor::{EditorState, TabState};
use super::tree::{path_is_within, EntryKind, WorkspaceTree};
use crate::language::default_content;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Quiet period before a debounced auto-save fires.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// The one pending clipboard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOp {
    Cut,
    Copy,
}

#[derive(Debug, Clone)]
pub struct Clipboard {
    pub path: String,
    pub op: ClipboardOp,
}

/// Session state shared with debounce timer tasks.
#[derive(Debug, Default)]
struct Session {
    tree: WorkspaceTree,
    editor: EditorState,
}

/// An armed debounce timer for one path.
struct PendingSave {
    handle: JoinHandle<()>,
    /// Set by the task once the store write has been issued
    in_flight: Arc<AtomicBool>,
}

impl PendingSave {
    /// Abort the timer only while it is still sleeping. A write already
    /// issued runs to completion; last-write-wins resolves the overlap.
    fn cancel(self) {
        if !self.in_flight.load(Ordering::Acquire) {
            self.handle.abort();
        }
    }
}

/// Client-side orchestration between the editor session and the store.
pub struct SyncEngine<B: WorkspaceBackend + 'static> {
    backend: Arc<B>,
    session: Arc<Mutex<Session>>,
    /// One armed timer per path; rearming cancels the previous one
    pending_saves: HashMap<String, PendingSave>,
    clipboard: Option<Clipboard>,
    quiet_period: Duration,
}

impl<B: WorkspaceBackend + 'static> SyncEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_quiet_period(backend, DEFAULT_QUIET_PERIOD)
    }

    pub fn with_quiet_period(backend: B, quiet_period: Duration) -> Self {
        Self {
            backend: Arc::new(backend),
            session: Arc::new(Mutex::new(Session::default())),
            pending_saves: HashMap::new(),
            clipboard: None,
            quiet_period,
        }
    }

    /// Fetch the team's flat listing and rebuild the tree from it,
    /// discarding all local session state (team selection / refresh).
    pub async fn load_workspace(&mut self) -> Result<(), ClientError> {
        let files = self.backend.list_files().await?;
        self.abort_all_pending();
        self.clipboard = None;

        let mut session = self.session.lock().await;
        session.tree = WorkspaceTree::from_listing(files.iter().map(|f| f.name.as_str()));
        session.editor.clear();
        Ok(())
    }

    /// Open a file: reuse a buffered copy if present, otherwise read from
    /// the store. A `NotFound` read seeds the buffer with the default
    /// content template instead of failing the open.
    pub async fn open_file(&mut self, path: &str) -> Result<(), ClientError> {
        {
            let mut session = self.session.lock().await;
            if session.editor.buffer(path).is_some() {
                session.editor.open_tab(path);
                return Ok(());
            }
        }

        let (content, seeded) = match self.backend.load_file(path).await {
            Ok(file) => (file.content, false),
            Err(ClientError::NotFound(_)) => {
                debug!(path = %path, "file missing on store, seeding default content");
                (default_content(path), true)
            }
            Err(e) => return Err(e),
        };

        let mut session = self.session.lock().await;
        if !session.tree.create_at_path(path, EntryKind::File) {
            return Err(ClientError::Validation(format!(
                "cannot open {} here",
                path
            )));
        }
        session.editor.set_buffer(path, content);
        session.editor.open_tab(path);
        // Seeded content matches nothing persisted yet
        session.editor.set_modified(path, seeded);
        Ok(())
    }

    /// Record a content keystroke: the buffer is updated synchronously and
    /// the per-path timer is rearmed. Only after the quiet period does one
    /// store write go out, so bursts coalesce into a single call.
    pub async fn edit(&mut self, path: &str, content: &str) {
        {
            let mut session = self.session.lock().await;
            session.editor.set_buffer(path, content);
            session.editor.set_modified(path, true);
        }

        if let Some(pending) = self.pending_saves.remove(path) {
            pending.cancel();
        }

        let backend = self.backend.clone();
        let session = self.session.clone();
        let quiet_period = self.quiet_period;
        let in_flight = Arc::new(AtomicBool::new(false));
        let issued = in_flight.clone();
        let path = path.to_string();
        let content = content.to_string();
        let key = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            issued.store(true, Ordering::Release);
            match backend.save_file(&path, &content).await {
                Ok(()) => {
                    let mut session = session.lock().await;
                    // Only clear the flag if no further edit landed meanwhile
                    if session.editor.buffer(&path) == Some(content.as_str()) {
                        session.editor.set_modified(&path, false);
                    }
                }
                Err(e) => {
                    // Deliberately silent: the next debounce cycle retries
                    warn!(path = %path, "auto-save failed: {}", e);
                }
            }
        });
        self.pending_saves
            .insert(key, PendingSave { handle, in_flight });
    }

    /// Explicit save: bypasses the debounce, writes immediately, and
    /// surfaces failure to the caller.
    pub async fn save(&mut self, path: &str) -> Result<(), ClientError> {
        if let Some(pending) = self.pending_saves.remove(path) {
            pending.cancel();
        }

        let content = {
            let session = self.session.lock().await;
            session
                .editor
                .buffer(path)
                .map(str::to_string)
                .ok_or_else(|| ClientError::Validation(format!("no buffer for {}", path)))?
        };

        self.backend.save_file(path, &content).await?;

        let mut session = self.session.lock().await;
        if session.editor.buffer(path) == Some(content.as_str()) {
            session.editor.set_modified(path, false);
        }
        Ok(())
    }

    /// Create a file or folder: optimistic tree insert, then the store
    /// call. The tree is restored and the error surfaced if the store
    /// rejects it.
    pub async fn create(&mut self, path: &str, kind: EntryKind) -> Result<(), ClientError> {
        let snapshot = {
            let mut session = self.session.lock().await;
            if session.tree.find_by_path(path).is_some() {
                return Err(ClientError::Validation(format!("{} already exists", path)));
            }
            let snapshot = session.tree.clone();
            if !session.tree.create_at_path(path, kind) {
                return Err(ClientError::Validation(format!(
                    "cannot create {} here",
                    path
                )));
            }
            snapshot
        };

        let result = match kind {
            EntryKind::File => self.backend.save_file(path, "").await,
            EntryKind::Folder => self.backend.make_dir(path).await,
        };

        if let Err(e) = result {
            let mut session = self.session.lock().await;
            session.tree = snapshot;
            return Err(e);
        }
        Ok(())
    }

    /// Rename an entry. For a file this is a store write at the new path
    /// followed by a delete at the old one; folders are a display-only
    /// concept client-side, so a folder rename touches no store state.
    /// Open tabs and buffers under the old path migrate with the rename.
    pub async fn rename(&mut self, path: &str, new_name: &str) -> Result<(), ClientError> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(ClientError::Validation(format!(
                "invalid name: {:?}",
                new_name
            )));
        }

        let (kind, new_path) = {
            let session = self.session.lock().await;
            let entry = session
                .tree
                .find_by_path(path)
                .ok_or_else(|| ClientError::Validation(format!("{} does not exist", path)))?;
            let new_path = join_path(parent_of(path), new_name);
            if session.tree.find_by_path(&new_path).is_some() {
                return Err(ClientError::Validation(format!(
                    "{} already exists",
                    new_path
                )));
            }
            (entry.kind, new_path)
        };

        self.abort_pending_under(path);

        if kind == EntryKind::File {
            let content = self.content_for(path).await?;
            self.backend.save_file(&new_path, &content).await?;
            if let Err(e) = self.backend.delete_file(path).await {
                // Orphan: the new file exists, the old one could not be
                // removed. Keep the new file and log the divergence.
                warn!(old = %path, new = %new_path, "rename left orphan on store: {}", e);
            }
        }

        let mut session = self.session.lock().await;
        session.tree.rename_at_path(path, new_name);
        session.editor.rekey_prefix(path, &new_path);
        Ok(())
    }

    /// Put a subtree on the clipboard for a later cut-paste.
    pub async fn cut(&mut self, path: &str) -> Result<(), ClientError> {
        self.clip(path, ClipboardOp::Cut).await
    }

    /// Put a subtree on the clipboard for a later copy-paste.
    pub async fn copy(&mut self, path: &str) -> Result<(), ClientError> {
        self.clip(path, ClipboardOp::Copy).await
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    async fn clip(&mut self, path: &str, op: ClipboardOp) -> Result<(), ClientError> {
        let session = self.session.lock().await;
        if session.tree.find_by_path(path).is_none() {
            return Err(ClientError::Validation(format!("{} does not exist", path)));
        }
        drop(session);
        // Replaces whatever was on the clipboard before
        self.clipboard = Some(Clipboard {
            path: path.to_string(),
            op,
        });
        Ok(())
    }

    /// Paste the clipboard subtree into a destination folder (empty string
    /// for the root level), consuming the clipboard. Per file this is a
    /// write at the new path, plus a delete at the old path for a cut.
    pub async fn paste(&mut self, dest_folder: &str) -> Result<(), ClientError> {
        let clip = self
            .clipboard
            .clone()
            .ok_or_else(|| ClientError::Validation("clipboard is empty".to_string()))?;
        let src = clip.path;

        let (snapshot, file_moves) = {
            let mut session = self.session.lock().await;
            if session.tree.find_by_path(&src).is_none() {
                return Err(ClientError::Validation(format!("{} does not exist", src)));
            }
            if clip.op == ClipboardOp::Cut && path_is_within(dest_folder, &src) {
                return Err(ClientError::Validation(format!(
                    "cannot move {} into itself",
                    src
                )));
            }

            let name = src.rsplit('/').next().unwrap_or(&src);
            let new_root = join_path(dest_folder, name);

            let snapshot = session.tree.clone();
            let applied = match clip.op {
                ClipboardOp::Cut => session.tree.move_at_path(&src, dest_folder),
                ClipboardOp::Copy => session.tree.copy_at_path(&src, dest_folder),
            };
            if !applied {
                return Err(ClientError::Validation(format!(
                    "cannot paste {} into {:?}",
                    src, dest_folder
                )));
            }

            let file_moves: Vec<(String, String)> = snapshot
                .file_paths_under(&src)
                .into_iter()
                .map(|old| {
                    let new = format!("{}{}", new_root, &old[src.len()..]);
                    (old, new)
                })
                .collect();
            (snapshot, file_moves)
        };

        if clip.op == ClipboardOp::Cut {
            self.abort_pending_under(&src);
        }

        for (old, new) in &file_moves {
            let content = match self.content_for(old).await {
                Ok(content) => content,
                Err(e) => {
                    self.restore_tree(snapshot).await;
                    return Err(e);
                }
            };
            if let Err(e) = self.backend.save_file(new, &content).await {
                self.restore_tree(snapshot).await;
                return Err(e);
            }
            if clip.op == ClipboardOp::Cut {
                if let Err(e) = self.backend.delete_file(old).await {
                    warn!(old = %old, new = %new, "move left orphan on store: {}", e);
                }
            }
        }

        if clip.op == ClipboardOp::Cut {
            let name = src.rsplit('/').next().unwrap_or(&src);
            let new_root = join_path(dest_folder, name);
            let mut session = self.session.lock().await;
            session.editor.rekey_prefix(&src, &new_root);
        }
        // A failed paste keeps the clipboard; only success consumes it
        self.clipboard = None;
        Ok(())
    }

    /// Delete a subtree. Store-first: only when every file delete has
    /// succeeded are the tree entry, buffers, and tabs dropped. A file the
    /// store no longer has counts as deleted (the local view was stale).
    pub async fn delete(&mut self, path: &str) -> Result<(), ClientError> {
        let files = {
            let session = self.session.lock().await;
            if session.tree.find_by_path(path).is_none() {
                return Err(ClientError::Validation(format!("{} does not exist", path)));
            }
            session.tree.file_paths_under(path)
        };

        self.abort_pending_under(path);

        for file in &files {
            match self.backend.delete_file(file).await {
                Ok(()) => {}
                Err(ClientError::NotFound(_)) => {
                    debug!(path = %file, "already absent on store");
                }
                Err(e) => return Err(e),
            }
        }

        let mut session = self.session.lock().await;
        session.tree.remove_at_path(path);
        session.editor.remove_under(path);
        Ok(())
    }

    /// UI expand/collapse for a folder.
    pub async fn set_expanded(&mut self, path: &str, expanded: bool) {
        self.session.lock().await.tree.set_expanded(path, expanded);
    }

    /// Close a tab, keeping its buffer.
    pub async fn close_tab(&mut self, path: &str) {
        self.session.lock().await.editor.close_tab(path);
    }

    /// Mark or clear the error flag on a tab (editor diagnostics).
    pub async fn set_has_errors(&mut self, path: &str, has_errors: bool) {
        self.session
            .lock()
            .await
            .editor
            .set_has_errors(path, has_errors);
    }

    // Session views (cloned snapshots; the session itself stays private).

    pub async fn tree(&self) -> WorkspaceTree {
        self.session.lock().await.tree.clone()
    }

    pub async fn tabs(&self) -> Vec<TabState> {
        self.session.lock().await.editor.tabs().to_vec()
    }

    pub async fn active_tab(&self) -> Option<TabState> {
        self.session.lock().await.editor.active_tab().cloned()
    }

    pub async fn buffer(&self, path: &str) -> Option<String> {
        self.session
            .lock()
            .await
            .editor
            .buffer(path)
            .map(str::to_string)
    }

    pub async fn editor(&self) -> EditorState {
        self.session.lock().await.editor.clone()
    }

    /// Current content of a file: the local buffer if one exists,
    /// otherwise a store read. A file the store does not have reads as
    /// empty (it was created locally and never auto-saved).
    async fn content_for(&self, path: &str) -> Result<String, ClientError> {
        if let Some(content) = self.buffer(path).await {
            return Ok(content);
        }
        match self.backend.load_file(path).await {
            Ok(file) => Ok(file.content),
            Err(ClientError::NotFound(_)) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    async fn restore_tree(&self, snapshot: WorkspaceTree) {
        self.session.lock().await.tree = snapshot;
    }

    /// Abort armed debounce timers for a path and everything under it, so
    /// a stale auto-save cannot resurrect a renamed or deleted file.
    fn abort_pending_under(&mut self, path: &str) {
        let stale: Vec<String> = self
            .pending_saves
            .keys()
            .filter(|p| path_is_within(p, path))
            .cloned()
            .collect();
        for p in stale {
            if let Some(pending) = self.pending_saves.remove(&p) {
                pending.cancel();
            }
        }
    }

    fn abort_all_pending(&mut self) {
        for (_, pending) in self.pending_saves.drain() {
            pending.cancel();
        }
    }
}

impl<B: WorkspaceBackend + 'static> Drop for SyncEngine<B> {
    fn drop(&mut self) {
        self.abort_all_pending();
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
