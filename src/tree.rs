use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::VecDeque;

use crate::errors::{KartotekError, KartotekResult};
use crate::models::{NewRecord, NodeId};

/// Fields shared by every tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub id: NodeId,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub icon_path: String,
    /// Set only while the object sits in the recycle bin.
    pub restore_path: Option<String>,
    /// Lookup-only back-reference; the parent's child list owns the node.
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordFields {
    pub name: String,
    pub description: String,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: Option<DateTime<Utc>>,
    pub data_folder_path: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Directory { children: Vec<NodeId> },
    Record(RecordFields),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub meta: ObjectMeta,
    pub kind: NodeKind,
}

impl NodeEntry {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, NodeKind::Record(_))
    }

    pub fn record(&self) -> Option<&RecordFields> {
        match &self.kind {
            NodeKind::Record(fields) => Some(fields),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::Record(_) => &[],
        }
    }
}

/// Arena of tree nodes. Child lists are the single ownership edge; parent
/// links exist only for upward walks. Several roots may live in one arena
/// (the main tree and the recycle bin share it), and a node without a parent
/// is either a root or staged for attachment.
#[derive(Debug, Default)]
pub struct ObjectTree {
    nodes: HashMap<NodeId, NodeEntry>,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(&id)
    }

    pub fn is_directory(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(NodeEntry::is_directory)
    }

    pub fn is_record(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(NodeEntry::is_record)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|entry| entry.meta.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], NodeEntry::children)
    }

    // ---------------- factories ----------------

    pub fn new_directory(&mut self, file_name: &str) -> NodeId {
        self.insert_node(
            NodeId::mint(),
            file_name.to_string(),
            Utc::now(),
            Utc::now(),
            String::new(),
            None,
            NodeKind::Directory { children: Vec::new() },
        )
    }

    pub fn new_record(&mut self, request: NewRecord) -> NodeId {
        self.insert_node(
            NodeId::mint(),
            request.file_name,
            Utc::now(),
            Utc::now(),
            request.icon_path,
            None,
            NodeKind::Record(RecordFields {
                name: request.name,
                description: request.description,
                validity_start: request.validity_start,
                validity_end: request.validity_end,
                data_folder_path: request.data_folder_path,
                tags: request.tags,
            }),
        )
    }

    /// Inserts a fully specified node without a parent. Used by the factories
    /// and by deserialization, where ids and timestamps come from the file.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn insert_node(
        &mut self,
        id: NodeId,
        file_name: String,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
        icon_path: String,
        restore_path: Option<String>,
        kind: NodeKind,
    ) -> NodeId {
        let entry = NodeEntry {
            meta: ObjectMeta {
                id,
                file_name,
                created_at,
                modified_at,
                icon_path,
                restore_path,
                parent: None,
            },
            kind,
        };
        self.nodes.insert(id, entry);
        id
    }

    // ---------------- structure ----------------

    /// True if `a` appears in `b`'s parent chain.
    pub fn is_ancestor_of(&self, a: NodeId, b: NodeId) -> bool {
        let mut current = self.parent(b);
        while let Some(id) = current {
            if id == a {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Cycle guard: a directory cannot inherit itself, a missing node, or any
    /// of its own ancestors.
    pub fn can_attach(&self, parent: NodeId, candidate: NodeId) -> bool {
        if candidate == parent {
            return false;
        }
        if !self.contains(candidate) || !self.is_directory(parent) {
            return false;
        }
        !self.is_ancestor_of(candidate, parent)
    }

    /// Reparents `candidates` under `parent`. With `validate`, one failing
    /// candidate aborts the whole batch with no mutation. Already-attached
    /// candidates are detached from their current parent first. Returns the
    /// nodes actually moved.
    pub fn attach(&mut self, parent: NodeId, candidates: &[NodeId], validate: bool) -> Vec<NodeId> {
        if !self.is_directory(parent) {
            return Vec::new();
        }
        if validate && !candidates.iter().all(|&c| self.can_attach(parent, c)) {
            return Vec::new();
        }

        let mut attached = Vec::new();
        for &candidate in candidates {
            if !self.contains(candidate) {
                continue;
            }
            if self.children(parent).contains(&candidate) {
                continue;
            }
            if let Some(old_parent) = self.parent(candidate) {
                self.remove_child_link(old_parent, candidate);
            }
            if let Some(NodeKind::Directory { children }) =
                self.nodes.get_mut(&parent).map(|entry| &mut entry.kind)
            {
                children.push(candidate);
            }
            if let Some(entry) = self.nodes.get_mut(&candidate) {
                entry.meta.parent = Some(parent);
            }
            attached.push(candidate);
        }
        attached
    }

    /// Removes each listed node from its parent's child list and clears the
    /// back-reference. Returns the nodes actually released.
    pub fn detach(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut released = Vec::new();
        for &id in ids {
            let Some(parent) = self.parent(id) else {
                continue;
            };
            if !self.remove_child_link(parent, id) {
                continue;
            }
            if let Some(entry) = self.nodes.get_mut(&id) {
                entry.meta.parent = None;
            }
            released.push(id);
        }
        released
    }

    fn remove_child_link(&mut self, parent: NodeId, child: NodeId) -> bool {
        if let Some(NodeKind::Directory { children }) =
            self.nodes.get_mut(&parent).map(|entry| &mut entry.kind)
        {
            if let Some(pos) = children.iter().position(|&c| c == child) {
                children.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deep-clones a subtree. Every clone gets a freshly minted id and the
    /// top of the clone has no parent; other fields are copied verbatim.
    pub fn deep_copy(&mut self, id: NodeId) -> KartotekResult<NodeId> {
        let source = self
            .nodes
            .get(&id)
            .ok_or_else(|| KartotekError::Internal(format!("deep_copy of unknown node {id}")))?
            .clone();

        let new_id = NodeId::mint();
        if self.nodes.contains_key(&new_id) {
            return Err(KartotekError::IdCollision(format!(
                "minted id {new_id} already present in the arena"
            )));
        }

        let kind = match &source.kind {
            NodeKind::Record(fields) => NodeKind::Record(fields.clone()),
            NodeKind::Directory { children } => {
                let mut cloned_children = Vec::with_capacity(children.len());
                for &child in children {
                    let clone = self.deep_copy(child)?;
                    cloned_children.push(clone);
                }
                NodeKind::Directory { children: cloned_children }
            }
        };

        self.insert_node(
            new_id,
            source.meta.file_name.clone(),
            source.meta.created_at,
            source.meta.modified_at,
            source.meta.icon_path.clone(),
            None,
            kind,
        );
        for child in self.children(new_id).to_vec() {
            if let Some(entry) = self.nodes.get_mut(&child) {
                entry.meta.parent = Some(new_id);
            }
        }
        Ok(new_id)
    }

    /// Detaches `id` and drops its whole subtree from the arena. Returns every
    /// removed id so callers can clean derived structures.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(&[id]);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&current) {
                stack.extend(entry.children().iter().copied());
                removed.push(current);
            }
        }
        removed
    }

    // ---------------- walks & paths ----------------

    /// Lazy depth-first walk over every Record reachable from `root`; records
    /// of a directory are visited before its subdirectories.
    pub fn walk_records(&self, root: NodeId) -> RecordWalk<'_> {
        RecordWalk {
            tree: self,
            dirs: if self.contains(root) { vec![root] } else { Vec::new() },
            records: VecDeque::new(),
        }
    }

    /// `/`-delimited path from the root down to `id`; a bare root yields "/".
    pub fn full_path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let Some(entry) = self.nodes.get(&node) else {
                break;
            };
            parts.push(entry.meta.file_name.clone());
            current = entry.meta.parent;
        }
        parts.reverse();
        let joined = parts.join("/");
        format!("/{}", joined.trim_matches('/'))
    }

    /// Resolves a `/`-delimited path by walking directory children, first
    /// name match wins. Only directories participate in the walk.
    pub fn resolve_path(&self, root: NodeId, path: &str) -> Option<NodeId> {
        if !self.contains(root) {
            return None;
        }
        let mut current = root;
        for part in path.split('/').filter(|part| !part.is_empty()) {
            let next = self
                .children(current)
                .iter()
                .copied()
                .find(|&child| {
                    self.is_directory(child)
                        && self.nodes[&child].meta.file_name == part
                })?;
            current = next;
        }
        Some(current)
    }

    pub fn has_child_named(&self, dir: NodeId, name: &str) -> bool {
        self.children(dir)
            .iter()
            .any(|child| self.nodes[child].meta.file_name == name)
    }

    // ---------------- field setters ----------------

    fn touch(&mut self, id: NodeId, apply: impl FnOnce(&mut NodeEntry)) -> bool {
        let Some(entry) = self.nodes.get_mut(&id) else {
            return false;
        };
        apply(entry);
        entry.meta.modified_at = Utc::now();
        true
    }

    pub fn set_file_name(&mut self, id: NodeId, name: &str) -> bool {
        self.touch(id, |entry| entry.meta.file_name = name.to_string())
    }

    pub fn set_icon_path(&mut self, id: NodeId, path: &str) -> bool {
        self.touch(id, |entry| entry.meta.icon_path = path.to_string())
    }

    /// Restore-path bookkeeping does not count as a user edit, so the
    /// modified timestamp is left alone.
    pub fn set_restore_path(&mut self, id: NodeId, path: Option<String>) -> bool {
        let Some(entry) = self.nodes.get_mut(&id) else {
            return false;
        };
        entry.meta.restore_path = path;
        true
    }

    fn touch_record(&mut self, id: NodeId, apply: impl FnOnce(&mut RecordFields)) -> bool {
        if !self.is_record(id) {
            return false;
        }
        self.touch(id, |entry| {
            if let NodeKind::Record(fields) = &mut entry.kind {
                apply(fields);
            }
        })
    }

    pub fn set_record_name(&mut self, id: NodeId, name: &str) -> bool {
        self.touch_record(id, |fields| fields.name = name.to_string())
    }

    pub fn set_record_description(&mut self, id: NodeId, description: &str) -> bool {
        self.touch_record(id, |fields| fields.description = description.to_string())
    }

    pub fn set_record_validity(
        &mut self,
        id: NodeId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> bool {
        self.touch_record(id, |fields| {
            fields.validity_start = start;
            fields.validity_end = end;
        })
    }

    pub fn set_record_data_folder_path(&mut self, id: NodeId, path: &str) -> bool {
        self.touch_record(id, |fields| fields.data_folder_path = path.to_string())
    }

    pub fn set_record_tags(&mut self, id: NodeId, tags: Vec<String>) -> bool {
        self.touch_record(id, |fields| fields.tags = tags)
    }

    pub fn add_record_tag(&mut self, id: NodeId, tag: &str) -> bool {
        self.touch_record(id, |fields| {
            if !fields.tags.iter().any(|existing| existing == tag) {
                fields.tags.push(tag.to_string());
            }
        })
    }

    pub fn remove_record_tag(&mut self, id: NodeId, tag: &str) -> bool {
        self.touch_record(id, |fields| fields.tags.retain(|existing| existing != tag))
    }

    /// Whether the record's validity window contains `now`. Unbounded ends
    /// pass trivially. None for directories and unknown ids.
    pub fn record_is_valid(&self, id: NodeId, now: DateTime<Utc>) -> Option<bool> {
        let fields = self.nodes.get(&id)?.record()?;
        if fields.validity_start.is_some_and(|start| now < start) {
            return Some(false);
        }
        if fields.validity_end.is_some_and(|end| now > end) {
            return Some(false);
        }
        Some(true)
    }
}

pub struct RecordWalk<'a> {
    tree: &'a ObjectTree,
    dirs: Vec<NodeId>,
    records: VecDeque<NodeId>,
}

impl Iterator for RecordWalk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            if let Some(record) = self.records.pop_front() {
                return Some(record);
            }
            let dir = self.dirs.pop()?;
            let mut subdirs = Vec::new();
            for &child in self.tree.children(dir) {
                if self.tree.is_record(child) {
                    self.records.push_back(child);
                } else {
                    subdirs.push(child);
                }
            }
            // reversed so the stack pops them in child-list order
            self.dirs.extend(subdirs.into_iter().rev());
        }
    }
}
