//! Virtual tree model: the client-side mirror of a team's workspace.
//!
//! The tree is a disposable cache rebuilt from the store's flat listing on
//! team selection. Paths are never stored on entries; they are computed by
//! walking from the root, which is what makes folder renames cheap (every
//! descendant path changes implicitly). All mutations are path-addressed
//! because the tree is rebuilt often enough that node references would
//! dangle.
//!
//! A path that does not resolve is a silent no-op here; callers that need a
//! user-visible error check with [`WorkspaceTree::find_by_path`] first.

use crate::language::language_for_path;

/// Kind of a workspace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// One node in the tree. Children are owned exclusively by the parent:
/// this is a tree, not a DAG.
#[derive(Debug, Clone)]
pub struct WorkspaceEntry {
    /// The entry's own segment; never contains a separator
    pub name: String,
    pub kind: EntryKind,
    /// Editor language tag, files only
    pub language: Option<&'static str>,
    /// Folder children, in insertion order
    pub children: Vec<WorkspaceEntry>,
    /// UI expand/collapse state, never persisted
    pub expanded: bool,
}

impl WorkspaceEntry {
    fn file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EntryKind::File,
            language: Some(language_for_path(name)),
            children: Vec::new(),
            expanded: false,
        }
    }

    fn folder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EntryKind::Folder,
            language: None,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&WorkspaceEntry> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut WorkspaceEntry> {
        self.children.iter_mut().find(|c| c.name == name)
    }
}

/// Split a `/`-joined path into segments, dropping empties.
fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// True if `inner` is the same path as `outer` or lies inside it.
pub fn path_is_within(inner: &str, outer: &str) -> bool {
    inner == outer || inner.starts_with(&format!("{}/", outer))
}

/// The tree of one team's workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceTree {
    roots: Vec<WorkspaceEntry>,
}

impl WorkspaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a flat file listing, creating folder nodes on
    /// demand and marking each terminal segment as a file.
    pub fn from_listing<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tree = Self::new();
        for path in paths {
            tree.create_at_path(path, EntryKind::File);
        }
        tree
    }

    /// Top-level entries.
    pub fn roots(&self) -> &[WorkspaceEntry] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Find an entry by path.
    pub fn find_by_path(&self, path: &str) -> Option<&WorkspaceEntry> {
        let segs = segments(path);
        let (first, rest) = segs.split_first()?;
        let mut current = self.roots.iter().find(|e| &e.name == first)?;
        for seg in rest {
            current = current.child(seg)?;
        }
        Some(current)
    }

    fn find_by_path_mut(&mut self, path: &str) -> Option<&mut WorkspaceEntry> {
        let segs = segments(path);
        let (first, rest) = segs.split_first()?;
        let mut current = self.roots.iter_mut().find(|e| &e.name == first)?;
        for seg in rest {
            current = current.child_mut(seg)?;
        }
        Some(current)
    }

    /// The children of a folder path; the empty path addresses the root
    /// level. `None` if the path resolves to a file or nothing at all.
    fn children_mut(&mut self, folder_path: &str) -> Option<&mut Vec<WorkspaceEntry>> {
        if segments(folder_path).is_empty() {
            return Some(&mut self.roots);
        }
        let entry = self.find_by_path_mut(folder_path)?;
        if entry.kind == EntryKind::Folder {
            Some(&mut entry.children)
        } else {
            None
        }
    }

    /// Create an entry at a path, reusing existing entries segment by
    /// segment. Intermediate segments become folders; the terminal segment
    /// is created with the requested kind. Creating something that already
    /// exists is a no-op, which makes folder creation idempotent. Returns
    /// false without mutating anything if a non-terminal segment resolves
    /// to a file, since only folders carry children.
    pub fn create_at_path(&mut self, path: &str, kind: EntryKind) -> bool {
        let segs = segments(path);
        if segs.is_empty() {
            return false;
        }
        // Walk read-only first so a rejected path leaves no half-made folders
        let mut probe: &[WorkspaceEntry] = &self.roots;
        for seg in &segs[..segs.len() - 1] {
            match probe.iter().find(|e| &e.name == seg) {
                Some(entry) if entry.kind == EntryKind::File => return false,
                Some(entry) => probe = &entry.children,
                None => break,
            }
        }
        let last = segs.len() - 1;
        let mut level = &mut self.roots;
        for (i, seg) in segs.iter().enumerate() {
            let found = level.iter().position(|e| &e.name == seg);
            let index = match found {
                Some(index) => index,
                None => {
                    let entry = if i == last && kind == EntryKind::File {
                        WorkspaceEntry::file(seg)
                    } else {
                        WorkspaceEntry::folder(seg)
                    };
                    level.push(entry);
                    level.len() - 1
                }
            };
            level = &mut level[index].children;
        }
        true
    }

    /// Rename an entry in place. Descendant paths change implicitly since
    /// paths are computed, not stored; remapping open tabs is the caller's
    /// job. Returns false if the path does not resolve or a sibling already
    /// carries the new name.
    pub fn rename_at_path(&mut self, path: &str, new_name: &str) -> bool {
        let segs = segments(path);
        let Some((target, parent_segs)) = segs.split_last() else {
            return false;
        };
        let parent_path = parent_segs.join("/");
        let Some(siblings) = self.children_mut(&parent_path) else {
            return false;
        };
        if siblings.iter().any(|e| e.name == new_name) {
            return false;
        }
        let Some(entry) = siblings.iter_mut().find(|e| &e.name == target) else {
            return false;
        };
        entry.name = new_name.to_string();
        if entry.kind == EntryKind::File {
            entry.language = Some(language_for_path(new_name));
        }
        true
    }

    /// Remove the entry at a path. Missing paths are a silent no-op: the
    /// caller's view may be stale relative to the store.
    pub fn remove_at_path(&mut self, path: &str) {
        let _ = self.take_at_path(path);
    }

    /// Detach and return the subtree rooted at a path.
    pub fn take_at_path(&mut self, path: &str) -> Option<WorkspaceEntry> {
        let segs = segments(path);
        let (target, parent_segs) = segs.split_last()?;
        let parent_path = parent_segs.join("/");
        let siblings = self.children_mut(&parent_path)?;
        let index = siblings.iter().position(|e| &e.name == target)?;
        Some(siblings.remove(index))
    }

    /// Move the subtree at `src` into the folder at `dest_folder` (empty
    /// string for the root level). Returns false without mutating if the
    /// source is missing, the destination does not resolve to a folder, a
    /// sibling name collides, or the destination lies inside the source.
    pub fn move_at_path(&mut self, src: &str, dest_folder: &str) -> bool {
        if !self.move_is_valid(src, dest_folder) {
            return false;
        }
        let Some(entry) = self.take_at_path(src) else {
            return false;
        };
        match self.children_mut(dest_folder) {
            Some(children) => {
                children.push(entry);
                true
            }
            // Validated above; unreachable in practice
            None => false,
        }
    }

    /// Copy the subtree at `src` into the folder at `dest_folder`. The copy
    /// is a deep clone, so later edits to it never touch the original.
    pub fn copy_at_path(&mut self, src: &str, dest_folder: &str) -> bool {
        if !self.move_is_valid(src, dest_folder) {
            return false;
        }
        let Some(entry) = self.find_by_path(src).cloned() else {
            return false;
        };
        match self.children_mut(dest_folder) {
            Some(children) => {
                children.push(entry);
                true
            }
            None => false,
        }
    }

    /// Validity check shared by move and copy.
    fn move_is_valid(&self, src: &str, dest_folder: &str) -> bool {
        let Some(entry) = self.find_by_path(src) else {
            return false;
        };
        if path_is_within(dest_folder, src) {
            return false;
        }
        let dest_children: &[WorkspaceEntry] = if segments(dest_folder).is_empty() {
            &self.roots
        } else {
            match self.find_by_path(dest_folder) {
                Some(dest) if dest.kind == EntryKind::Folder => &dest.children,
                _ => return false,
            }
        };
        !dest_children.iter().any(|e| e.name == entry.name)
    }

    /// Set a folder's expand/collapse state.
    pub fn set_expanded(&mut self, path: &str, expanded: bool) {
        if let Some(entry) = self.find_by_path_mut(path) {
            if entry.kind == EntryKind::Folder {
                entry.expanded = expanded;
            }
        }
    }

    /// Computed `/`-joined paths of every file in the subtree at `path`,
    /// in depth-first order. A file path yields itself; a missing path
    /// yields nothing.
    pub fn file_paths_under(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(entry) = self.find_by_path(path) {
            collect_file_paths(entry, path, &mut out);
        }
        out
    }

    /// Computed paths of every file in the whole tree.
    pub fn all_file_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for entry in &self.roots {
            collect_file_paths(entry, &entry.name, &mut out);
        }
        out
    }
}

fn collect_file_paths(entry: &WorkspaceEntry, path: &str, out: &mut Vec<String>) {
    match entry.kind {
        EntryKind::File => out.push(path.to_string()),
        EntryKind::Folder => {
            for child in &entry.children {
                collect_file_paths(child, &format!("{}/{}", path, child.name), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> WorkspaceTree {
        WorkspaceTree::from_listing(["src/app.js", "src/lib/util.js", "README.md"])
    }

    #[test]
    fn builds_from_flat_listing() {
        let tree = sample_tree();
        let src = tree.find_by_path("src").unwrap();
        assert_eq!(src.kind, EntryKind::Folder);
        let app = tree.find_by_path("src/app.js").unwrap();
        assert_eq!(app.kind, EntryKind::File);
        assert_eq!(app.language, Some("javascript"));
        assert!(tree.find_by_path("src/lib/util.js").is_some());
        assert!(tree.find_by_path("missing.txt").is_none());
    }

    #[test]
    fn folder_creation_is_idempotent() {
        let mut tree = sample_tree();
        tree.create_at_path("src", EntryKind::Folder);
        tree.create_at_path("src", EntryKind::Folder);
        let count = tree.roots().iter().filter(|e| e.name == "src").count();
        assert_eq!(count, 1);
        // The existing folder kept its children
        assert!(tree.find_by_path("src/app.js").is_some());
    }

    #[test]
    fn file_nodes_never_take_children() {
        let mut tree = WorkspaceTree::new();
        assert!(tree.create_at_path("src", EntryKind::File));
        assert!(!tree.create_at_path("src/app.js", EntryKind::File));

        let src = tree.find_by_path("src").unwrap();
        assert_eq!(src.kind, EntryKind::File);
        assert!(src.children.is_empty());
        assert!(tree.find_by_path("src/app.js").is_none());

        // Deeper rejection leaves no half-made folders behind
        assert!(!tree.create_at_path("src/lib/util.js", EntryKind::File));
        assert!(tree.find_by_path("src/lib").is_none());
    }

    #[test]
    fn rename_changes_only_the_name() {
        let mut tree = sample_tree();
        assert!(tree.rename_at_path("src/app.js", "main.js"));
        assert!(tree.find_by_path("src/app.js").is_none());
        let renamed = tree.find_by_path("src/main.js").unwrap();
        assert_eq!(renamed.language, Some("javascript"));

        // Folder rename implicitly moves every descendant path
        assert!(tree.rename_at_path("src", "source"));
        assert!(tree.find_by_path("source/main.js").is_some());
        assert!(tree.find_by_path("source/lib/util.js").is_some());
    }

    #[test]
    fn rename_rejects_sibling_collision() {
        let mut tree = sample_tree();
        tree.create_at_path("src/main.js", EntryKind::File);
        assert!(!tree.rename_at_path("src/app.js", "main.js"));
        assert!(tree.find_by_path("src/app.js").is_some());
    }

    #[test]
    fn remove_of_missing_path_is_a_silent_no_op() {
        let mut tree = sample_tree();
        tree.remove_at_path("no/such/file.txt");
        tree.remove_at_path("src/nope.js");
        assert!(tree.find_by_path("src/app.js").is_some());
    }

    #[test]
    fn move_relocates_the_subtree() {
        let mut tree = sample_tree();
        tree.create_at_path("dest", EntryKind::Folder);
        assert!(tree.move_at_path("src/lib", "dest"));
        assert!(tree.find_by_path("src/lib").is_none());
        assert!(tree.find_by_path("dest/lib/util.js").is_some());
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut tree = sample_tree();
        assert!(!tree.move_at_path("src", "src/lib"));
        assert!(tree.find_by_path("src/lib/util.js").is_some());
    }

    #[test]
    fn copy_is_a_deep_clone() {
        let mut tree = sample_tree();
        tree.create_at_path("dest", EntryKind::Folder);
        assert!(tree.copy_at_path("src", "dest"));

        // Mutating the copy leaves the original untouched
        assert!(tree.rename_at_path("dest/src/app.js", "copy.js"));
        assert!(tree.find_by_path("src/app.js").is_some());
        assert!(tree.find_by_path("dest/src/copy.js").is_some());
    }

    #[test]
    fn file_paths_under_enumerates_the_subtree() {
        let tree = sample_tree();
        let mut files = tree.file_paths_under("src");
        files.sort();
        assert_eq!(files, vec!["src/app.js", "src/lib/util.js"]);
        assert_eq!(tree.file_paths_under("README.md"), vec!["README.md"]);
        assert!(tree.file_paths_under("missing").is_empty());
    }

    #[test]
    fn expand_state_applies_to_folders_only() {
        let mut tree = sample_tree();
        tree.set_expanded("src", true);
        assert!(tree.find_by_path("src").unwrap().expanded);
        tree.set_expanded("README.md", true);
        assert!(!tree.find_by_path("README.md").unwrap().expanded);
    }
}
