use chrono::{DateTime, Utc};
use similar::TextDiff;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{NodeId, SearchRequest, SortBy};
use crate::tree::ObjectTree;
use crate::trie::Trie;

pub const DEFAULT_MIN_SCORE: u32 = 65;
pub const DEFAULT_MAX_PREFIX_KEYS: usize = 300;
pub const DEFAULT_LIMIT: usize = 100;

/// Canonical form used for indexing and comparison: NFD-decomposed with
/// combining marks stripped, lowercased, trimmed.
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// One indexed text dimension: forward map, inverted map, and a prefix trie
/// over the distinct normalized values.
#[derive(Debug, Default)]
struct TextField {
    forward: HashMap<NodeId, String>,
    inverted: HashMap<String, BTreeSet<NodeId>>,
    trie: Trie,
}

impl TextField {
    fn insert(&mut self, id: NodeId, value: String) {
        self.remove(id);
        self.inverted.entry(value.clone()).or_default().insert(id);
        self.trie.insert(&value);
        self.forward.insert(id, value);
    }

    fn remove(&mut self, id: NodeId) {
        let Some(value) = self.forward.remove(&id) else {
            return;
        };
        if let Some(ids) = self.inverted.get_mut(&value) {
            ids.remove(&id);
            if ids.is_empty() {
                self.inverted.remove(&value);
                self.trie.remove(&value);
            }
        }
    }

    /// Union of the id sets behind every trie key starting with `prefix`,
    /// expanding at most `cap` keys.
    fn expand_prefix(&self, prefix: &str, cap: usize) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        for key in self.trie.keys_with_prefix(prefix, cap) {
            if let Some(ids) = self.inverted.get(&key) {
                out.extend(ids.iter().copied());
            }
        }
        out
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Sidecar search index over every Record reachable from a tree root.
/// Explicitly maintained: callers re-index after any metadata edit and remove
/// on deletion; `rebuild` is only a session-start concern.
#[derive(Debug, Default)]
pub struct SearchIndex {
    name: TextField,
    file: TextField,
    desc: TextField,
    id_text: TextField,
    created: HashMap<NodeId, DateTime<Utc>>,
    modified: HashMap<NodeId, DateTime<Utc>>,
    vstart: HashMap<NodeId, Option<DateTime<Utc>>>,
    vend: HashMap<NodeId, Option<DateTime<Utc>>>,
    tags: HashMap<NodeId, BTreeSet<String>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// (Re)indexes one record; stale entries for the id are dropped first, so
    /// calling this after every rename/retag/edit is safe. Non-records are
    /// ignored.
    pub fn update(&mut self, tree: &ObjectTree, id: NodeId) {
        let Some(entry) = tree.get(id) else {
            return;
        };
        let Some(fields) = entry.record() else {
            return;
        };

        self.name.insert(id, normalize(&fields.name));
        self.file.insert(id, normalize(&entry.meta.file_name));
        self.desc.insert(id, normalize(&fields.description));
        self.id_text.insert(id, normalize(&id.to_string()));

        self.created.insert(id, entry.meta.created_at);
        self.modified.insert(id, entry.meta.modified_at);
        self.vstart.insert(id, fields.validity_start);
        self.vend.insert(id, fields.validity_end);
        self.tags
            .insert(id, fields.tags.iter().map(|tag| normalize(tag)).collect());
    }

    /// Drops every entry for the id, inverted maps and tries included, so a
    /// removed record can never surface as a stale hit.
    pub fn remove(&mut self, id: NodeId) {
        self.name.remove(id);
        self.file.remove(id);
        self.desc.remove(id);
        self.id_text.remove(id);
        self.created.remove(&id);
        self.modified.remove(&id);
        self.vstart.remove(&id);
        self.vend.remove(&id);
        self.tags.remove(&id);
    }

    /// Full re-scan via the tree walk. Used once at session start.
    pub fn rebuild(&mut self, tree: &ObjectTree, root: NodeId) {
        self.name.clear();
        self.file.clear();
        self.desc.clear();
        self.id_text.clear();
        self.created.clear();
        self.modified.clear();
        self.vstart.clear();
        self.vend.clear();
        self.tags.clear();
        for record in tree.walk_records(root) {
            self.update(tree, record);
        }
    }

    /// Multi-field search: trie candidate pool, date and tag filters, fuzzy
    /// scoring, ordering, truncation. Returns ids, best match first.
    pub fn search(&self, request: &SearchRequest) -> Vec<NodeId> {
        let cap = request.max_prefix_keys.unwrap_or(DEFAULT_MAX_PREFIX_KEYS);
        let limit = request.limit.unwrap_or(DEFAULT_LIMIT);
        let min_score = request.min_score.unwrap_or(DEFAULT_MIN_SCORE) as f32;

        let name_query = request.name.as_deref().map(normalize).filter(|q| !q.is_empty());
        let file_query = request.filename.as_deref().map(normalize).filter(|q| !q.is_empty());
        let desc_query = request.description.as_deref().map(normalize).filter(|q| !q.is_empty());
        let id_query = request.record_id.as_deref().map(normalize).filter(|q| !q.is_empty());

        // 1) candidate pool: AND across provided text fields, with the
        // permissive fallback to the full universe when the intersection
        // comes up empty.
        let mut pools: Vec<BTreeSet<NodeId>> = Vec::new();
        if let Some(query) = &name_query {
            pools.push(self.name.expand_prefix(query, cap));
        }
        if let Some(query) = &file_query {
            pools.push(self.file.expand_prefix(query, cap));
        }
        if let Some(query) = &desc_query {
            pools.push(self.desc.expand_prefix(query, cap));
        }
        if let Some(query) = &id_query {
            pools.push(self.id_text.expand_prefix(query, cap));
        }

        let mut pool: BTreeSet<NodeId> = match pools.split_first() {
            None => self.created.keys().copied().collect(),
            Some((first, rest)) => {
                let mut intersection = first.clone();
                for other in rest {
                    intersection.retain(|id| other.contains(id));
                }
                if intersection.is_empty() {
                    self.created.keys().copied().collect()
                } else {
                    intersection
                }
            }
        };

        // 2) date windows: an absent value fails any bounded dimension
        pool.retain(|id| {
            in_range(self.created.get(id).copied(), request.created_min, request.created_max)
                && in_range(self.modified.get(id).copied(), request.modified_min, request.modified_max)
                && in_range(
                    self.vstart.get(id).copied().flatten(),
                    request.validity_start_min,
                    request.validity_start_max,
                )
                && in_range(
                    self.vend.get(id).copied().flatten(),
                    request.validity_end_min,
                    request.validity_end_max,
                )
        });

        // 3) tag predicates
        let require: BTreeSet<String> = request.require_tags.iter().map(|t| normalize(t)).collect();
        let any: BTreeSet<String> = request.any_tags.iter().map(|t| normalize(t)).collect();
        let exclude: BTreeSet<String> = request.exclude_tags.iter().map(|t| normalize(t)).collect();
        if !require.is_empty() || !any.is_empty() || !exclude.is_empty() {
            let empty = BTreeSet::new();
            pool.retain(|id| {
                let tags = self.tags.get(id).unwrap_or(&empty);
                if !require.is_empty() && !require.is_subset(tags) {
                    return false;
                }
                if !any.is_empty() && any.is_disjoint(tags) {
                    return false;
                }
                if !exclude.is_empty() && !exclude.is_disjoint(tags) {
                    return false;
                }
                true
            });
        }

        // 4) scoring over the fields the caller actually provided
        let text_supplied = name_query.is_some()
            || file_query.is_some()
            || desc_query.is_some()
            || id_query.is_some();
        let mut scored: Vec<(f32, NodeId)> = Vec::new();
        for id in pool {
            let mut sims: Vec<f32> = Vec::new();
            if let Some(query) = &name_query {
                sims.push(similarity(self.name.forward.get(&id).map_or("", String::as_str), query));
            }
            if let Some(query) = &file_query {
                sims.push(similarity(self.file.forward.get(&id).map_or("", String::as_str), query));
            }
            if let Some(query) = &desc_query {
                sims.push(similarity(self.desc.forward.get(&id).map_or("", String::as_str), query));
            }
            if let Some(query) = &id_query {
                sims.push(similarity(self.id_text.forward.get(&id).map_or("", String::as_str), query));
            }
            let score = if sims.is_empty() {
                100.0
            } else {
                sims.iter().sum::<f32>() / sims.len() as f32
            };
            if text_supplied && score < min_score {
                continue;
            }
            scored.push((score, id));
        }

        // 5) ordering, 6) truncation
        match request.sort_by {
            SortBy::Relevance => {
                scored.sort_by(|a, b| {
                    b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1))
                });
            }
            sort_by => {
                scored.sort_by(|a, b| {
                    let ordering = self.compare_field(a.1, b.1, sort_by);
                    if request.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
        }
        scored.into_iter().take(limit).map(|(_, id)| id).collect()
    }

    fn compare_field(&self, a: NodeId, b: NodeId, sort_by: SortBy) -> Ordering {
        let date = |map: &HashMap<NodeId, DateTime<Utc>>, id: NodeId| {
            map.get(&id).copied().unwrap_or(DateTime::<Utc>::MIN_UTC)
        };
        // absent validity bounds sort last, like an unbounded window
        let optional_date = |map: &HashMap<NodeId, Option<DateTime<Utc>>>, id: NodeId| {
            map.get(&id).copied().flatten().unwrap_or(DateTime::<Utc>::MAX_UTC)
        };
        let text = |field: &TextField, id: NodeId| {
            field.forward.get(&id).cloned().unwrap_or_default()
        };
        let ordering = match sort_by {
            SortBy::Created => date(&self.created, a).cmp(&date(&self.created, b)),
            SortBy::Modified => date(&self.modified, a).cmp(&date(&self.modified, b)),
            SortBy::ValidityStart => optional_date(&self.vstart, a).cmp(&optional_date(&self.vstart, b)),
            SortBy::ValidityEnd => optional_date(&self.vend, a).cmp(&optional_date(&self.vend, b)),
            SortBy::Name => text(&self.name, a).cmp(&text(&self.name, b)),
            SortBy::Filename => text(&self.file, a).cmp(&text(&self.file, b)),
            SortBy::Id | SortBy::Relevance => Ordering::Equal,
        };
        ordering.then(a.cmp(&b))
    }
}

fn in_range(
    value: Option<DateTime<Utc>>,
    lo: Option<DateTime<Utc>>,
    hi: Option<DateTime<Utc>>,
) -> bool {
    let Some(value) = value else {
        return lo.is_none() && hi.is_none();
    };
    if lo.is_some_and(|lo| value < lo) {
        return false;
    }
    if hi.is_some_and(|hi| value > hi) {
        return false;
    }
    true
}

/// 0-100 closeness between an indexed value and a query, both already
/// normalized. Composite of the full-string diff ratio and a 0.9-weighted
/// best window ratio so short queries still rank well against longer values.
fn similarity(value: &str, query: &str) -> f32 {
    if value == query {
        return 100.0;
    }
    let full = TextDiff::from_chars(value, query).ratio() * 100.0;
    let windowed = best_window_ratio(value, query) * 90.0;
    full.max(windowed)
}

fn best_window_ratio(value: &str, query: &str) -> f32 {
    let value_chars: Vec<char> = value.chars().collect();
    let query_len = query.chars().count();
    if query_len == 0 || value_chars.len() <= query_len {
        return 0.0;
    }
    let mut best = 0.0f32;
    for start in 0..=value_chars.len() - query_len {
        let window: String = value_chars[start..start + query_len].iter().collect();
        let ratio = TextDiff::from_chars(window.as_str(), query).ratio();
        if ratio > best {
            best = ratio;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}
