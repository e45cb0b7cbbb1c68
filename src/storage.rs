use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{KartotekError, KartotekResult};
use crate::models::{ConfigDoc, NodeDoc, NodeId};
use crate::tree::{NodeKind, ObjectTree};

/// Serializes the subtree under `root` to `path`, rotating the previous file
/// into a single `.old` backup generation first.
pub fn save_tree(tree: &ObjectTree, root: NodeId, path: &Path) -> KartotekResult<()> {
    let doc = tree_to_doc(tree, root)
        .ok_or_else(|| KartotekError::Internal(format!("cannot serialize unknown root {root}")))?;
    let blob = serde_json::to_string_pretty(&doc)
        .map_err(|error| KartotekError::Internal(error.to_string()))?;
    write_document(path, &blob)
}

/// Loads a tree document into the arena and returns its root. A missing file
/// is `Ok(None)` (callers synthesize an empty tree); a present-but-empty
/// payload yields an empty root; malformed content is a hard error.
pub fn load_tree(tree: &mut ObjectTree, path: &Path) -> KartotekResult<Option<NodeId>> {
    if !path.exists() {
        return Ok(None);
    }
    let blob = fs::read_to_string(path)?;
    let trimmed = blob.trim();
    if trimmed.is_empty() || trimmed == "null" {
        tracing::warn!(path = %path.display(), "empty tree document, synthesizing empty root");
        return Ok(Some(tree.new_directory("")));
    }
    let doc: NodeDoc = serde_json::from_str(trimmed)
        .map_err(|error| KartotekError::Corrupt(format!("{}: {error}", path.display())))?;
    if matches!(doc, NodeDoc::Record { .. }) {
        return Err(KartotekError::Corrupt(format!(
            "{}: document root must be a directory",
            path.display()
        )));
    }
    let root = doc_into_tree(tree, doc, path)?;
    Ok(Some(root))
}

pub fn save_config(config: &ConfigDoc, path: &Path) -> KartotekResult<()> {
    let blob = serde_json::to_string_pretty(config)
        .map_err(|error| KartotekError::Internal(error.to_string()))?;
    write_document(path, &blob)
}

/// A missing config is a hard error, unlike the tree documents.
pub fn load_config(path: &Path) -> KartotekResult<ConfigDoc> {
    if !path.exists() {
        return Err(KartotekError::ConfigMissing(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let blob = fs::read_to_string(path)?;
    if blob.trim().is_empty() {
        return Err(KartotekError::Corrupt(format!(
            "{}: config document is empty",
            path.display()
        )));
    }
    serde_json::from_str(&blob)
        .map_err(|error| KartotekError::Corrupt(format!("{}: {error}", path.display())))
}

/// Rotate-then-write: the stale `.old` backup is deleted, the current primary
/// becomes the new `.old`, and only then is the new payload written. Exactly
/// one generation of rollback survives a crash in the write window.
fn write_document(path: &Path, blob: &str) -> KartotekResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let old = backup_path(path);
    if old.exists() {
        fs::remove_file(&old)?;
    }
    if path.exists() {
        fs::rename(path, &old)?;
    }
    fs::write(path, blob)?;
    tracing::debug!(path = %path.display(), bytes = blob.len(), "document written");
    Ok(())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".old");
    PathBuf::from(os)
}

fn tree_to_doc(tree: &ObjectTree, id: NodeId) -> Option<NodeDoc> {
    let entry = tree.get(id)?;
    let meta = &entry.meta;
    Some(match &entry.kind {
        NodeKind::Directory { children } => NodeDoc::Directory {
            id: Some(meta.id),
            file_name: meta.file_name.clone(),
            created_at: Some(meta.created_at),
            modified_at: Some(meta.modified_at),
            icon_path: meta.icon_path.clone(),
            restore_path: meta.restore_path.clone(),
            children: children
                .iter()
                .filter_map(|&child| tree_to_doc(tree, child))
                .collect(),
        },
        NodeKind::Record(fields) => NodeDoc::Record {
            id: Some(meta.id),
            file_name: meta.file_name.clone(),
            created_at: Some(meta.created_at),
            modified_at: Some(meta.modified_at),
            icon_path: meta.icon_path.clone(),
            restore_path: meta.restore_path.clone(),
            name: fields.name.clone(),
            description: fields.description.clone(),
            validity_start: fields.validity_start,
            validity_end: fields.validity_end,
            data_folder_path: fields.data_folder_path.clone(),
            tags: fields.tags.clone(),
        },
    })
}

/// Ids persist verbatim; documents without them (the pre-persistence format)
/// get fresh ones. A duplicate id inside one arena is corruption.
fn doc_into_tree(tree: &mut ObjectTree, doc: NodeDoc, path: &Path) -> KartotekResult<NodeId> {
    use chrono::Utc;

    let (id, file_name, created_at, modified_at, icon_path, restore_path) = match &doc {
        NodeDoc::Directory {
            id,
            file_name,
            created_at,
            modified_at,
            icon_path,
            restore_path,
            ..
        }
        | NodeDoc::Record {
            id,
            file_name,
            created_at,
            modified_at,
            icon_path,
            restore_path,
            ..
        } => (
            id.unwrap_or_else(NodeId::mint),
            file_name.clone(),
            created_at.unwrap_or_else(Utc::now),
            modified_at.unwrap_or_else(Utc::now),
            icon_path.clone(),
            restore_path.clone(),
        ),
    };
    if tree.contains(id) {
        return Err(KartotekError::Corrupt(format!(
            "{}: duplicate node id {id}",
            path.display()
        )));
    }

    match doc {
        NodeDoc::Record {
            name,
            description,
            validity_start,
            validity_end,
            data_folder_path,
            tags,
            ..
        } => Ok(tree.insert_node(
            id,
            file_name,
            created_at,
            modified_at,
            icon_path,
            restore_path,
            NodeKind::Record(crate::tree::RecordFields {
                name,
                description,
                validity_start,
                validity_end,
                data_folder_path,
                tags,
            }),
        )),
        NodeDoc::Directory { children, .. } => {
            let dir = tree.insert_node(
                id,
                file_name,
                created_at,
                modified_at,
                icon_path,
                restore_path,
                NodeKind::Directory { children: Vec::new() },
            );
            for child_doc in children {
                let child = doc_into_tree(tree, child_doc, path)?;
                tree.attach(dir, &[child], false);
            }
            Ok(dir)
        }
    }
}
