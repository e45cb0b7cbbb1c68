use std::path::{Path, PathBuf};

use crate::errors::KartotekResult;
use crate::index::SearchIndex;
use crate::models::{
    ClipboardMode, ClipboardState, ConfigDoc, DirectoryPatch, NewRecord, NodeId, ObjectKind,
    ObjectSnapshot, RecordPatch, RecordSnapshot, SearchRequest,
};
use crate::storage;
use crate::tree::{NodeEntry, ObjectTree};

/// On-disk layout of one session: two tree documents plus the config.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub data_file: PathBuf,
    pub recycle_bin_file: PathBuf,
    pub config_file: PathBuf,
}

impl SessionPaths {
    pub fn under(base: &Path) -> Self {
        Self {
            data_file: base.join("data").join("data.json"),
            recycle_bin_file: base.join("data").join("recycle_bin.json"),
            config_file: base.join("config").join("config.json"),
        }
    }
}

/// Owns the whole data engine of one running session: the arena holding the
/// main tree and the recycle bin, the search index over the main tree,
/// navigation history, clipboard, and favorites. Single-threaded and
/// synchronous; every operation runs to completion.
///
/// Callers observe state through pull-based snapshot accessors and must
/// re-fetch after any mutating call.
#[derive(Debug)]
pub struct Session {
    tree: ObjectTree,
    root: NodeId,
    bin: NodeId,
    index: SearchIndex,
    history: Vec<NodeId>,
    cursor: usize,
    clipboard: Vec<NodeId>,
    clipboard_mode: ClipboardMode,
    favorites: Vec<NodeId>,
    config: ConfigDoc,
    paths: SessionPaths,
}

impl Session {
    /// Opens a session under `base`. Tree documents are synthesized (and
    /// immediately persisted) when missing; a missing config is fatal.
    pub fn open(base: &Path) -> KartotekResult<Self> {
        let paths = SessionPaths::under(base);
        let mut tree = ObjectTree::new();

        let root = Self::load_or_create(&mut tree, &paths.data_file)?;
        let bin = Self::load_or_create(&mut tree, &paths.recycle_bin_file)?;
        let config = storage::load_config(&paths.config_file)?;

        let mut index = SearchIndex::new();
        index.rebuild(&tree, root);

        let mut favorites = Vec::new();
        for path in &config.favorites {
            match tree.resolve_path(root, path) {
                Some(dir) => favorites.push(dir),
                None => tracing::warn!(path = %path, "favorite path no longer resolves, dropping"),
            }
        }

        tracing::info!(
            records = index.len(),
            favorites = favorites.len(),
            "session opened"
        );
        Ok(Self {
            tree,
            root,
            bin,
            index,
            history: vec![root],
            cursor: 0,
            clipboard: Vec::new(),
            clipboard_mode: ClipboardMode::Copy,
            favorites,
            config,
            paths,
        })
    }

    /// First-run entry point: writes a default config when none exists, then
    /// opens normally.
    pub fn bootstrap(base: &Path) -> KartotekResult<Self> {
        let paths = SessionPaths::under(base);
        if !paths.config_file.exists() {
            storage::save_config(&ConfigDoc::default(), &paths.config_file)?;
        }
        Self::open(base)
    }

    fn load_or_create(tree: &mut ObjectTree, path: &Path) -> KartotekResult<NodeId> {
        match storage::load_tree(tree, path)? {
            Some(root) => Ok(root),
            None => {
                let root = tree.new_directory("");
                storage::save_tree(tree, root, path)?;
                Ok(root)
            }
        }
    }

    /// Persists both trees and the config (favorites serialized as paths).
    pub fn save_state(&mut self) -> KartotekResult<()> {
        self.config.favorites = self
            .favorites
            .iter()
            .map(|&dir| self.tree.full_path(dir))
            .collect();
        storage::save_tree(&self.tree, self.root, &self.paths.data_file)?;
        storage::save_tree(&self.tree, self.bin, &self.paths.recycle_bin_file)?;
        storage::save_config(&self.config, &self.paths.config_file)?;
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn recycle_bin(&self) -> NodeId {
        self.bin
    }

    pub fn config(&self) -> &ConfigDoc {
        &self.config
    }

    fn in_main_tree(&self, id: NodeId) -> bool {
        id == self.root || self.tree.is_ancestor_of(self.root, id)
    }

    fn in_recycle_bin(&self, id: NodeId) -> bool {
        self.tree.is_ancestor_of(self.bin, id)
    }

    fn index_subtree(&mut self, id: NodeId) {
        for record in self.tree.walk_records(id) {
            self.index.update(&self.tree, record);
        }
        if self.tree.is_record(id) {
            self.index.update(&self.tree, id);
        }
    }

    fn deindex_subtree(&mut self, id: NodeId) {
        let mut records: Vec<NodeId> = self.tree.walk_records(id).collect();
        if self.tree.is_record(id) {
            records.push(id);
        }
        for record in records {
            self.index.remove(record);
        }
    }

    // ---------------- navigation ----------------

    pub fn current_dir(&self) -> NodeId {
        self.history[self.cursor]
    }

    /// Visits a directory of the main tree. History is append-only: forward
    /// entries beyond the cursor are kept, matching the reference behavior.
    pub fn go_to(&mut self, dir: NodeId) -> bool {
        if !self.tree.is_directory(dir) || !self.in_main_tree(dir) {
            return false;
        }
        self.history.push(dir);
        self.cursor = self.history.len() - 1;
        true
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.history.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn up(&mut self) -> bool {
        let target = self.tree.parent(self.current_dir()).unwrap_or(self.root);
        self.go_to(target)
    }

    /// Drops history entries that no longer live under the root after a
    /// delete, keeping the cursor on the current directory when possible.
    fn prune_history(&mut self) {
        let current = self.history[self.cursor];
        let root = self.root;
        let tree = &self.tree;
        self.history
            .retain(|&dir| dir == root || tree.is_ancestor_of(root, dir));
        if self.history.is_empty() {
            self.history.push(root);
        }
        self.cursor = self
            .history
            .iter()
            .rposition(|&dir| dir == current)
            .unwrap_or(self.history.len() - 1);
    }

    // ---------------- create & edit ----------------

    /// Mints a Record under `parent`, registering it in the index. None when
    /// the parent is not a directory of the main tree.
    pub fn create_record(&mut self, parent: NodeId, request: NewRecord) -> Option<NodeId> {
        if !self.tree.is_directory(parent) || !self.in_main_tree(parent) {
            return None;
        }
        let record = self.tree.new_record(request);
        if self.tree.attach(parent, &[record], true).is_empty() {
            self.tree.remove_subtree(record);
            return None;
        }
        self.index.update(&self.tree, record);
        Some(record)
    }

    pub fn create_directory(&mut self, parent: NodeId, file_name: &str) -> Option<NodeId> {
        if !self.tree.is_directory(parent) || !self.in_main_tree(parent) {
            return None;
        }
        let dir = self.tree.new_directory(file_name);
        if self.tree.attach(parent, &[dir], true).is_empty() {
            self.tree.remove_subtree(dir);
            return None;
        }
        Some(dir)
    }

    /// Applies a partial update to a Record and re-indexes it. Identifier and
    /// timestamps are not caller-assignable.
    pub fn edit_record(&mut self, id: NodeId, patch: RecordPatch) -> bool {
        if !self.tree.is_record(id) {
            return false;
        }
        if let Some(file_name) = &patch.file_name {
            self.tree.set_file_name(id, file_name);
        }
        if let Some(name) = &patch.name {
            self.tree.set_record_name(id, name);
        }
        if let Some(description) = &patch.description {
            self.tree.set_record_description(id, description);
        }
        if let Some(validity) = &patch.validity {
            self.tree.set_record_validity(id, validity.start, validity.end);
        }
        if let Some(path) = &patch.data_folder_path {
            self.tree.set_record_data_folder_path(id, path);
        }
        if let Some(tags) = patch.tags {
            self.tree.set_record_tags(id, tags);
        }
        if let Some(icon) = &patch.icon_path {
            self.tree.set_icon_path(id, icon);
        }
        if self.in_main_tree(id) {
            self.index.update(&self.tree, id);
        }
        true
    }

    /// Directory edits need no index maintenance.
    pub fn edit_directory(&mut self, id: NodeId, patch: DirectoryPatch) -> bool {
        if !self.tree.is_directory(id) {
            return false;
        }
        if let Some(file_name) = &patch.file_name {
            self.tree.set_file_name(id, file_name);
        }
        if let Some(icon) = &patch.icon_path {
            self.tree.set_icon_path(id, icon);
        }
        true
    }

    // ---------------- delete / restore ----------------

    /// Soft-deletes an object into the recycle bin, or purges it permanently
    /// when it already sits there. The roots themselves are not deletable.
    pub fn delete(&mut self, id: NodeId) -> bool {
        if id == self.root || id == self.bin || !self.tree.contains(id) {
            return false;
        }
        if self.in_recycle_bin(id) {
            tracing::debug!(%id, "purging object from recycle bin");
            self.deindex_subtree(id);
            let removed = self.tree.remove_subtree(id);
            self.clipboard.retain(|staged| !removed.contains(staged));
            true
        } else {
            tracing::debug!(%id, "moving object to recycle bin");
            let parent = self.tree.parent(id).unwrap_or(self.root);
            let restore_path = self.tree.full_path(parent);
            self.tree.set_restore_path(id, Some(restore_path));
            if self.tree.attach(self.bin, &[id], true).is_empty() {
                self.tree.set_restore_path(id, None);
                return false;
            }
            self.deindex_subtree(id);
            self.clipboard
                .retain(|&staged| staged != id && !self.tree.is_ancestor_of(id, staged));
            self.favorites.retain(|&fav| fav != id && !self.tree.is_ancestor_of(id, fav));
            self.prune_history();
            true
        }
    }

    /// Restores a soft-deleted object to the directory it was deleted from,
    /// falling back to the root when the captured path no longer resolves.
    /// Refused on a name conflict at the target; the object stays in the bin.
    pub fn restore(&mut self, id: NodeId) -> bool {
        if !self.in_recycle_bin(id) {
            return false;
        }
        let Some(entry) = self.tree.get(id) else {
            return false;
        };
        let Some(restore_path) = entry.meta.restore_path.clone() else {
            tracing::warn!(%id, "no restore path recorded, cannot restore");
            return false;
        };
        let file_name = entry.meta.file_name.clone();

        let target = match self.tree.resolve_path(self.root, &restore_path) {
            Some(dir) => dir,
            None => {
                tracing::warn!(path = %restore_path, "restore path no longer resolves, using root");
                self.root
            }
        };
        if self.tree.has_child_named(target, &file_name) {
            tracing::warn!(path = %restore_path, name = %file_name, "restore refused, name conflict");
            return false;
        }
        if self.tree.attach(target, &[id], true).is_empty() {
            return false;
        }
        self.tree.set_restore_path(id, None);
        self.index_subtree(id);
        true
    }

    // ---------------- clipboard ----------------

    /// Stages objects for a later paste. Only live objects of the main tree
    /// qualify; bin residents leave the bin through `restore`, never the
    /// clipboard. Staging replaces the previous clipboard content.
    pub fn stage(&mut self, objects: &[NodeId], mode: ClipboardMode) -> bool {
        let staged: Vec<NodeId> = objects
            .iter()
            .copied()
            .filter(|&obj| obj != self.root && self.in_main_tree(obj))
            .collect();
        if staged.is_empty() {
            return false;
        }
        self.clipboard = staged;
        self.clipboard_mode = mode;
        true
    }

    /// Copy mode deep-clones the staged objects under `target` (fresh ids,
    /// registered in the index); cut mode reattaches them per object, skipping
    /// any that vanished or would form a cycle. Targets outside the main tree
    /// are refused. A minted clone id colliding with a live arena entry is a
    /// broken-generator invariant and surfaces as a hard error.
    pub fn paste(&mut self, target: NodeId) -> KartotekResult<bool> {
        if !self.tree.is_directory(target) || !self.in_main_tree(target) {
            return Ok(false);
        }
        if self.clipboard.is_empty() {
            return Ok(false);
        }
        let staged = self.clipboard.clone();
        let mut pasted_any = false;
        for staged_id in staged {
            if !self.tree.contains(staged_id) {
                tracing::warn!(id = %staged_id, "staged object vanished, skipping paste");
                continue;
            }
            match self.clipboard_mode {
                ClipboardMode::Copy => {
                    let clone = self.tree.deep_copy(staged_id)?;
                    if self.tree.attach(target, &[clone], true).is_empty() {
                        self.tree.remove_subtree(clone);
                        continue;
                    }
                    self.index_subtree(clone);
                }
                ClipboardMode::Cut => {
                    if self.tree.attach(target, &[staged_id], true).is_empty() {
                        continue;
                    }
                    self.index_subtree(staged_id);
                }
            }
            pasted_any = true;
        }
        Ok(pasted_any)
    }

    pub fn clipboard_state(&self) -> ClipboardState {
        ClipboardState {
            ids: self.clipboard.clone(),
            mode: self.clipboard_mode,
        }
    }

    // ---------------- favorites ----------------

    pub fn add_favorite(&mut self, dir: NodeId) -> bool {
        if !self.tree.is_directory(dir) || !self.in_main_tree(dir) {
            return false;
        }
        if self.favorites.contains(&dir) {
            return false;
        }
        self.favorites.push(dir);
        true
    }

    pub fn remove_favorite(&mut self, dir: NodeId) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|&fav| fav != dir);
        self.favorites.len() != before
    }

    pub fn favorites(&self) -> Vec<ObjectSnapshot> {
        self.favorites
            .iter()
            .filter_map(|&dir| self.object_snapshot(dir))
            .collect()
    }

    // ---------------- search & lookups ----------------

    pub fn search(&self, request: &SearchRequest) -> Vec<RecordSnapshot> {
        self.index
            .search(request)
            .into_iter()
            .filter_map(|id| self.record_snapshot(id))
            .collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    pub fn path_to_id(&self, path: &str) -> Option<NodeId> {
        self.tree.resolve_path(self.root, path)
    }

    pub fn id_to_path(&self, id: NodeId) -> Option<String> {
        self.tree.contains(id).then(|| self.tree.full_path(id))
    }

    // ---------------- snapshots ----------------

    pub fn object_snapshot(&self, id: NodeId) -> Option<ObjectSnapshot> {
        let entry = self.tree.get(id)?;
        Some(Self::snapshot_of(&self.tree, id, entry))
    }

    pub fn record_snapshot(&self, id: NodeId) -> Option<RecordSnapshot> {
        let entry = self.tree.get(id)?;
        let fields = entry.record()?;
        Some(RecordSnapshot {
            id,
            file_name: entry.meta.file_name.clone(),
            full_path: self.tree.full_path(id),
            name: fields.name.clone(),
            description: fields.description.clone(),
            validity_start: fields.validity_start,
            validity_end: fields.validity_end,
            data_folder_path: fields.data_folder_path.clone(),
            tags: fields.tags.clone(),
            created_at: entry.meta.created_at,
            modified_at: entry.meta.modified_at,
            icon_path: entry.meta.icon_path.clone(),
        })
    }

    /// Direct children of a directory, in insertion order.
    pub fn list_children(&self, dir: NodeId) -> Vec<ObjectSnapshot> {
        self.tree
            .children(dir)
            .iter()
            .filter_map(|&child| self.object_snapshot(child))
            .collect()
    }

    /// Direct Record children of a directory.
    pub fn list_records(&self, dir: NodeId) -> Vec<RecordSnapshot> {
        self.tree
            .children(dir)
            .iter()
            .filter_map(|&child| self.record_snapshot(child))
            .collect()
    }

    /// Every Record in the main tree, depth-first.
    pub fn all_records(&self) -> Vec<RecordSnapshot> {
        self.tree
            .walk_records(self.root)
            .filter_map(|id| self.record_snapshot(id))
            .collect()
    }

    fn snapshot_of(tree: &ObjectTree, id: NodeId, entry: &NodeEntry) -> ObjectSnapshot {
        ObjectSnapshot {
            id,
            kind: if entry.is_directory() {
                ObjectKind::Directory
            } else {
                ObjectKind::Record
            },
            file_name: entry.meta.file_name.clone(),
            full_path: tree.full_path(id),
            created_at: entry.meta.created_at,
            modified_at: entry.meta.modified_at,
            icon_path: entry.meta.icon_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_base() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp session base")
    }

    fn open_session(base: &Path) -> Session {
        Session::bootstrap(base).expect("session")
    }

    fn sample_record(name: &str) -> NewRecord {
        NewRecord {
            file_name: format!("{name}.pdf"),
            name: name.to_string(),
            description: format!("description of {name}"),
            ..NewRecord::default()
        }
    }

    #[test]
    fn bootstrap_synthesizes_and_persists_missing_documents() {
        let base = temp_base();
        let session = open_session(base.path());
        assert!(base.path().join("data/data.json").exists());
        assert!(base.path().join("data/recycle_bin.json").exists());
        assert!(base.path().join("config/config.json").exists());
        assert_eq!(session.current_dir(), session.root());
    }

    #[test]
    fn open_without_config_is_fatal() {
        let base = temp_base();
        let error = Session::open(base.path()).expect_err("must fail");
        assert!(error.to_string().starts_with("CONFIG_MISSING"));
    }

    #[test]
    fn create_edit_and_search_are_wired_through_the_index() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let invoices = session.create_directory(root, "invoices").expect("dir");
        let record = session
            .create_record(invoices, sample_record("Faktura A"))
            .expect("record");

        let hits = session.search(&SearchRequest {
            name: Some("fakt".to_string()),
            ..SearchRequest::default()
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, record);
        assert_eq!(hits[0].full_path, "/invoices/Faktura A.pdf");

        session.edit_record(
            record,
            RecordPatch {
                name: Some("Objednávka".to_string()),
                tags: Some(vec!["finance".to_string()]),
                ..RecordPatch::default()
            },
        );
        let hits = session.search(&SearchRequest {
            name: Some("objedn".to_string()),
            require_tags: vec!["FINANCE".to_string()],
            ..SearchRequest::default()
        });
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn navigation_history_is_append_only() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let a = session.create_directory(root, "a").expect("a");
        let b = session.create_directory(root, "b").expect("b");

        assert!(session.go_to(a));
        assert!(session.go_to(b));
        assert!(session.back());
        assert_eq!(session.current_dir(), a);

        // fresh navigation keeps the forward entry
        assert!(session.go_to(root));
        assert_eq!(session.current_dir(), root);
        assert!(session.back());
        assert!(session.back());
        assert_eq!(session.current_dir(), a);
        assert!(session.forward());
        assert_eq!(session.current_dir(), b);

        // the recycle bin is not a navigation target
        let bin = session.recycle_bin();
        assert!(!session.go_to(bin));
    }

    #[test]
    fn up_walks_to_parent_and_stops_at_root() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let outer = session.create_directory(root, "outer").expect("outer");
        let inner = session.create_directory(outer, "inner").expect("inner");

        session.go_to(inner);
        assert!(session.up());
        assert_eq!(session.current_dir(), outer);
        assert!(session.up());
        assert_eq!(session.current_dir(), root);
        assert!(session.up());
        assert_eq!(session.current_dir(), root);
    }

    #[test]
    fn delete_then_restore_round_trip() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let folder = session.create_directory(root, "folder").expect("folder");
        let record = session
            .create_record(folder, sample_record("Faktura A"))
            .expect("record");

        assert!(session.delete(record));
        assert!(session
            .search(&SearchRequest {
                name: Some("faktura".to_string()),
                ..SearchRequest::default()
            })
            .is_empty());
        assert_eq!(session.list_children(session.recycle_bin()).len(), 1);

        assert!(session.restore(record));
        let snapshot = session.record_snapshot(record).expect("snapshot");
        assert_eq!(snapshot.full_path, "/folder/Faktura A.pdf");
        assert_eq!(snapshot.name, "Faktura A");
        assert_eq!(
            session
                .search(&SearchRequest {
                    name: Some("faktura".to_string()),
                    ..SearchRequest::default()
                })
                .len(),
            1
        );
    }

    #[test]
    fn restore_falls_back_to_root_when_path_is_gone() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let folder = session.create_directory(root, "doomed").expect("folder");
        let record = session
            .create_record(folder, sample_record("Report"))
            .expect("record");

        assert!(session.delete(record));
        assert!(session.delete(folder));
        // purge the folder so the restore path cannot resolve
        assert!(session.delete(folder));

        assert!(session.restore(record));
        let snapshot = session.record_snapshot(record).expect("snapshot");
        assert_eq!(snapshot.full_path, "/Report.pdf");
    }

    #[test]
    fn restore_refused_on_name_conflict() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let record = session
            .create_record(root, sample_record("Report"))
            .expect("record");

        assert!(session.delete(record));
        session
            .create_record(root, sample_record("Report"))
            .expect("replacement");

        assert!(!session.restore(record));
        // still in the bin, restorable once the conflict is resolved
        assert!(session.list_children(session.recycle_bin()).len() == 1);
    }

    #[test]
    fn second_delete_purges_permanently() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let record = session
            .create_record(root, sample_record("Faktura A"))
            .expect("record");

        assert!(session.delete(record));
        assert!(session.contains(record));
        assert!(session.delete(record));
        assert!(!session.contains(record));
        assert!(session.record_snapshot(record).is_none());
        assert!(session
            .search(&SearchRequest {
                name: Some("faktura".to_string()),
                min_score: Some(0),
                ..SearchRequest::default()
            })
            .is_empty());
    }

    #[test]
    fn copy_paste_clones_with_fresh_ids() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let source = session.create_directory(root, "source").expect("source");
        let target = session.create_directory(root, "target").expect("target");
        let record = session
            .create_record(source, sample_record("Faktura A"))
            .expect("record");

        assert!(session.stage(&[record], ClipboardMode::Copy));
        assert!(session.paste(target).expect("paste"));

        assert_eq!(session.list_records(source).len(), 1);
        let copies = session.list_records(target);
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0].id, record);
        assert_eq!(copies[0].name, "Faktura A");

        // both the original and the clone are searchable
        let hits = session.search(&SearchRequest {
            name: Some("faktura".to_string()),
            ..SearchRequest::default()
        });
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn cut_paste_moves_without_cloning() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let source = session.create_directory(root, "source").expect("source");
        let target = session.create_directory(root, "target").expect("target");
        let record = session
            .create_record(source, sample_record("Faktura A"))
            .expect("record");

        assert!(session.stage(&[record], ClipboardMode::Cut));
        assert!(session.paste(target).expect("paste"));
        assert!(session.list_records(source).is_empty());
        assert_eq!(session.list_records(target)[0].id, record);
    }

    #[test]
    fn paste_into_own_descendant_is_refused() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let outer = session.create_directory(root, "outer").expect("outer");
        let inner = session.create_directory(outer, "inner").expect("inner");

        assert!(session.stage(&[outer], ClipboardMode::Cut));
        assert!(!session.paste(inner).expect("paste"));
        assert_eq!(session.id_to_path(inner), Some("/outer/inner".to_string()));
    }

    #[test]
    fn paste_into_recycle_bin_is_refused() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let record = session
            .create_record(root, sample_record("Faktura A"))
            .expect("record");

        assert!(session.stage(&[record], ClipboardMode::Cut));
        assert!(!session.paste(session.recycle_bin()).expect("paste"));
        assert!(session.list_children(session.recycle_bin()).is_empty());

        // the record never left the main tree and still resolves in search
        let hits = session.search(&SearchRequest {
            name: Some("faktura".to_string()),
            ..SearchRequest::default()
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_path, "/Faktura A.pdf");
    }

    #[test]
    fn bin_residents_cannot_be_staged() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let record = session
            .create_record(root, sample_record("Faktura A"))
            .expect("record");

        assert!(session.delete(record));
        assert!(!session.stage(&[record], ClipboardMode::Cut));
        assert!(session.clipboard_state().ids.is_empty());
    }

    #[test]
    fn soft_delete_clears_staged_ids_from_clipboard() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let target = session.create_directory(root, "target").expect("target");
        let record = session
            .create_record(root, sample_record("Faktura A"))
            .expect("record");

        assert!(session.stage(&[record], ClipboardMode::Cut));
        assert!(session.delete(record));
        assert!(session.clipboard_state().ids.is_empty());
        assert!(!session.paste(target).expect("paste"));
        assert!(session.list_children(target).is_empty());

        // the untouched restore path keeps the normal way out of the bin open
        assert!(session.restore(record));
        assert_eq!(
            session.record_snapshot(record).expect("restored").full_path,
            "/Faktura A.pdf"
        );
    }

    #[test]
    fn cut_paste_skips_invalid_entries_per_object() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let outer = session.create_directory(root, "outer").expect("outer");
        let inner = session.create_directory(outer, "inner").expect("inner");
        let sibling = session
            .create_record(root, sample_record("Faktura A"))
            .expect("sibling");

        // outer would form a cycle under its own child; the sibling still moves
        assert!(session.stage(&[outer, sibling], ClipboardMode::Cut));
        assert!(session.paste(inner).expect("paste"));
        assert_eq!(session.id_to_path(outer), Some("/outer".to_string()));
        assert_eq!(
            session.id_to_path(sibling),
            Some("/outer/inner/Faktura A.pdf".to_string())
        );
    }

    #[test]
    fn favorites_persist_as_paths_across_sessions() {
        let base = temp_base();
        {
            let mut session = open_session(base.path());
            let root = session.root();
            let dir = session.create_directory(root, "starred").expect("dir");
            assert!(session.add_favorite(dir));
            assert!(!session.add_favorite(dir));
            session.save_state().expect("save");
        }

        let session = open_session(base.path());
        let favorites = session.favorites();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].full_path, "/starred");
    }

    #[test]
    fn state_round_trip_preserves_ids_and_metadata() {
        let base = temp_base();
        let record_id;
        {
            let mut session = open_session(base.path());
            let root = session.root();
            let dir = session.create_directory(root, "invoices").expect("dir");
            record_id = session
                .create_record(dir, sample_record("Faktura A"))
                .expect("record");
            session.save_state().expect("save");
        }

        let session = open_session(base.path());
        let snapshot = session.record_snapshot(record_id).expect("snapshot");
        assert_eq!(snapshot.full_path, "/invoices/Faktura A.pdf");
        assert_eq!(snapshot.name, "Faktura A");
        let dir = session.path_to_id("/invoices").expect("dir resolves");
        assert_eq!(session.list_records(dir)[0].id, record_id);
    }

    #[test]
    fn deleted_subtree_drops_out_of_favorites_and_history() {
        let base = temp_base();
        let mut session = open_session(base.path());
        let root = session.root();
        let outer = session.create_directory(root, "outer").expect("outer");
        let inner = session.create_directory(outer, "inner").expect("inner");
        session.add_favorite(inner);
        session.go_to(inner);

        assert!(session.delete(outer));
        assert_eq!(session.current_dir(), root);
        assert!(session.favorites().is_empty());
    }
}
