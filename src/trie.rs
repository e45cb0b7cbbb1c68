use std::collections::BTreeMap;

/// Char-keyed prefix trie over normalized index keys. `BTreeMap` children
/// keep prefix expansion in lexicographic order.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
    len: usize,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    terminal: bool,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a key. Returns false if it was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        let mut node = &mut self.root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        if node.terminal {
            return false;
        }
        node.terminal = true;
        self.len += 1;
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descend(key).is_some_and(|node| node.terminal)
    }

    /// Removes a key and prunes branches that no longer lead to a terminal.
    /// Returns false if the key was not present.
    pub fn remove(&mut self, key: &str) -> bool {
        let chars: Vec<char> = key.chars().collect();
        if !Self::remove_at(&mut self.root, &chars) {
            return false;
        }
        self.len -= 1;
        true
    }

    fn remove_at(node: &mut TrieNode, rest: &[char]) -> bool {
        let Some((&ch, tail)) = rest.split_first() else {
            if !node.terminal {
                return false;
            }
            node.terminal = false;
            return true;
        };
        let Some(child) = node.children.get_mut(&ch) else {
            return false;
        };
        if !Self::remove_at(child, tail) {
            return false;
        }
        if !child.terminal && child.children.is_empty() {
            node.children.remove(&ch);
        }
        true
    }

    /// All stored keys starting with `prefix`, lexicographic, at most `cap`.
    pub fn keys_with_prefix(&self, prefix: &str, cap: usize) -> Vec<String> {
        let mut out = Vec::new();
        if cap == 0 {
            return out;
        }
        let Some(node) = self.descend(prefix) else {
            return out;
        };
        let mut buf = prefix.to_string();
        Self::collect(node, &mut buf, cap, &mut out);
        out
    }

    fn collect(node: &TrieNode, buf: &mut String, cap: usize, out: &mut Vec<String>) {
        if out.len() >= cap {
            return;
        }
        if node.terminal {
            out.push(buf.clone());
        }
        for (&ch, child) in &node.children {
            if out.len() >= cap {
                return;
            }
            buf.push(ch);
            Self::collect(child, buf, cap, out);
            buf.pop();
        }
    }

    fn descend(&self, key: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_prefix_expansion() {
        let mut trie = Trie::new();
        assert!(trie.insert("faktura a"));
        assert!(trie.insert("faktura b"));
        assert!(trie.insert("smlouva"));
        assert!(!trie.insert("smlouva"));
        assert_eq!(trie.len(), 3);

        assert_eq!(
            trie.keys_with_prefix("fakt", 10),
            vec!["faktura a".to_string(), "faktura b".to_string()]
        );
        assert_eq!(trie.keys_with_prefix("", 10).len(), 3);
        assert!(trie.keys_with_prefix("x", 10).is_empty());
    }

    #[test]
    fn expansion_respects_cap() {
        let mut trie = Trie::new();
        for i in 0..20 {
            trie.insert(&format!("key{i:02}"));
        }
        assert_eq!(trie.keys_with_prefix("key", 5).len(), 5);
        assert!(trie.keys_with_prefix("key", 0).is_empty());
    }

    #[test]
    fn remove_prunes_dead_branches() {
        let mut trie = Trie::new();
        trie.insert("abc");
        trie.insert("abd");
        trie.insert("ab");

        assert!(trie.remove("abc"));
        assert!(!trie.remove("abc"));
        assert!(!trie.contains("abc"));
        assert!(trie.contains("ab"));
        assert_eq!(trie.keys_with_prefix("ab", 10), vec!["ab".to_string(), "abd".to_string()]);

        assert!(trie.remove("ab"));
        assert!(trie.remove("abd"));
        assert!(trie.is_empty());
        assert!(trie.keys_with_prefix("a", 10).is_empty());
    }

    #[test]
    fn prefix_longer_than_any_key_is_empty() {
        let mut trie = Trie::new();
        trie.insert("abc");
        assert!(trie.keys_with_prefix("abcd", 10).is_empty());
    }
}
