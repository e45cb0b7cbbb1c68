use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of a node in the object tree. Unique for the lifetime of the
/// arena and persisted verbatim, so external references survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Directory,
    Record,
}

/// Persisted tree document: a tagged union so Directory and Record nodes can
/// be told apart in the JSON without guessing at field shapes.
///
/// `id` and the timestamps are optional on read; documents written before
/// identifier persistence existed load fine and get fresh values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeDoc {
    #[serde(rename_all = "camelCase")]
    Directory {
        #[serde(default)]
        id: Option<NodeId>,
        #[serde(default)]
        file_name: String,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
        #[serde(default)]
        modified_at: Option<DateTime<Utc>>,
        #[serde(default)]
        icon_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restore_path: Option<String>,
        #[serde(default)]
        children: Vec<NodeDoc>,
    },
    #[serde(rename_all = "camelCase")]
    Record {
        #[serde(default)]
        id: Option<NodeId>,
        #[serde(default)]
        file_name: String,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
        #[serde(default)]
        modified_at: Option<DateTime<Utc>>,
        #[serde(default)]
        icon_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restore_path: Option<String>,
        #[serde(default)]
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        validity_start: Option<DateTime<Utc>>,
        #[serde(default)]
        validity_end: Option<DateTime<Utc>>,
        #[serde(default)]
        data_folder_path: String,
        #[serde(default)]
        tags: Vec<String>,
    },
}

/// Flat per-session configuration document. Missing file is a hard error at
/// load time; `Session::bootstrap` writes the defaults on first run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDoc {
    pub favorites: Vec<String>,
    pub column_widths: BTreeMap<String, u32>,
    pub visible_columns: Vec<String>,
}

impl Default for ConfigDoc {
    fn default() -> Self {
        Self {
            favorites: Vec::new(),
            column_widths: default_column_widths(),
            visible_columns: default_visible_columns(),
        }
    }
}

pub fn default_column_widths() -> BTreeMap<String, u32> {
    [
        ("name", 150),
        ("description", 300),
        ("validityStart", 100),
        ("validityEnd", 100),
        ("created", 100),
        ("modified", 100),
        ("tags", 100),
        ("dataFolderPath", 100),
        ("fileName", 100),
        ("iconPath", 100),
    ]
    .into_iter()
    .map(|(key, width)| (key.to_string(), width))
    .collect()
}

pub fn default_visible_columns() -> Vec<String> {
    ["name", "description", "validityStart", "validityEnd", "tags"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Parameters for creating a Record. Everything beyond the file name is
/// optional metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRecord {
    pub file_name: String,
    pub name: String,
    pub description: String,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: Option<DateTime<Utc>>,
    pub data_folder_path: String,
    pub tags: Vec<String>,
    pub icon_path: String,
}

/// Partial update for a Record. `None` leaves the field untouched; `validity`
/// replaces the whole window at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordPatch {
    pub file_name: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub validity: Option<ValidityPatch>,
    pub data_folder_path: Option<String>,
    pub tags: Option<Vec<String>>,
    pub icon_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidityPatch {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryPatch {
    pub file_name: Option<String>,
    pub icon_path: Option<String>,
}

/// Pull-based view of any tree node, for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSnapshot {
    pub id: NodeId,
    pub kind: ObjectKind,
    pub file_name: String,
    pub full_path: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub icon_path: String,
}

/// Pull-based view of a Record with its full metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    pub id: NodeId,
    pub file_name: String,
    pub full_path: String,
    pub name: String,
    pub description: String,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: Option<DateTime<Utc>>,
    pub data_folder_path: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub icon_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipboardMode {
    Copy,
    Cut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardState {
    pub ids: Vec<NodeId>,
    pub mode: ClipboardMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Relevance,
    Created,
    Modified,
    ValidityStart,
    ValidityEnd,
    Name,
    Filename,
    Id,
}

/// Multi-field search query. Text fields combine with AND semantics; absent
/// fields are skipped entirely. Defaults applied at search time: `min_score`
/// 65, `max_prefix_keys` 300, `limit` 100.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub filename: Option<String>,
    pub record_id: Option<String>,
    pub created_min: Option<DateTime<Utc>>,
    pub created_max: Option<DateTime<Utc>>,
    pub modified_min: Option<DateTime<Utc>>,
    pub modified_max: Option<DateTime<Utc>>,
    pub validity_start_min: Option<DateTime<Utc>>,
    pub validity_start_max: Option<DateTime<Utc>>,
    pub validity_end_min: Option<DateTime<Utc>>,
    pub validity_end_max: Option<DateTime<Utc>>,
    pub require_tags: Vec<String>,
    pub any_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub min_score: Option<u32>,
    pub max_prefix_keys: Option<usize>,
    pub limit: Option<usize>,
    pub sort_by: SortBy,
    pub descending: bool,
}
