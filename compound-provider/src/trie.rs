//! Suffix trie keyed on reversed DNS labels (spec §4.4 "Index structure").
//! Each node carries the set of providers whose domain scope includes or
//! excludes that suffix; a name's candidate providers are whatever is
//! accumulated walking root-to-leaf along its reversed labels.

use std::collections::{HashMap, HashSet};

use compound_model::dns_name;

use crate::record::ProviderKey;

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    include: HashSet<ProviderKey>,
    exclude: HashSet<ProviderKey>,
}

impl Node {
    fn child_mut(&mut self, label: &str) -> &mut Node {
        self.children.entry(label.to_string()).or_default()
    }
}

/// A built trie over every Ready provider's domain scope. Immutable once
/// constructed — the registry swaps in a freshly built trie under a
/// writer lock rather than mutating this one in place (spec §5 "readers
/// use a snapshot pointer swap to avoid stalling reconciles").
#[derive(Default)]
pub struct SuffixTrie {
    root: Node,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes one provider's include/exclude domain suffixes. An empty
    /// suffix string (`""`) means "every domain" and is indexed at the
    /// root.
    pub fn insert(&mut self, key: &ProviderKey, includes: &[String], excludes: &[String]) {
        for suffix in includes {
            let node = self.walk_to(suffix);
            node.include.insert(key.clone());
        }
        for suffix in excludes {
            let node = self.walk_to(suffix);
            node.exclude.insert(key.clone());
        }
    }

    fn walk_to(&mut self, suffix: &str) -> &mut Node {
        let normalized = dns_name::normalize(suffix);
        let mut node = &mut self.root;
        for label in dns_name::reversed_labels(&normalized) {
            node = node.child_mut(label);
        }
        node
    }

    /// Candidates for `dns_name`: providers whose include scope covers the
    /// name and whose exclude scope does not, each paired with the depth
    /// of the deepest (most specific) include suffix that matched — the
    /// spec's tie-break input (spec §4.4 step 1-2).
    pub fn candidates(&self, dns_name: &str) -> Vec<(ProviderKey, usize)> {
        let normalized = dns_name::normalize(dns_name);
        let mut include_depth: HashMap<ProviderKey, usize> = HashMap::new();
        let mut excluded: HashSet<ProviderKey> = HashSet::new();

        let mut node = &self.root;
        for key in &node.include {
            include_depth.entry(key.clone()).or_insert(0);
        }
        excluded.extend(node.exclude.iter().cloned());

        for (depth, label) in dns_name::reversed_labels(&normalized).into_iter().enumerate() {
            let Some(next) = node.children.get(label) else {
                break;
            };
            node = next;
            for key in &node.include {
                include_depth.insert(key.clone(), depth + 1);
            }
            excluded.extend(node.exclude.iter().cloned());
        }

        include_depth
            .into_iter()
            .filter(|(key, _)| !excluded.contains(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: &str) -> ProviderKey {
        ProviderKey::new("default", n)
    }

    #[test]
    fn longer_suffix_wins_depth() {
        let mut trie = SuffixTrie::new();
        trie.insert(&key("broad"), &["test".to_string()], &[]);
        trie.insert(&key("narrow"), &["example.test".to_string()], &[]);

        let candidates = trie.candidates("a.example.test");
        let depths: HashMap<_, _> = candidates.into_iter().collect();
        assert!(depths[&key("narrow")] > depths[&key("broad")]);
    }

    #[test]
    fn exclude_removes_candidate() {
        let mut trie = SuffixTrie::new();
        trie.insert(
            &key("p"),
            &["example.test".to_string()],
            &["excluded.example.test".to_string()],
        );
        assert!(trie.candidates("a.example.test").iter().any(|(k, _)| k == &key("p")));
        assert!(
            !trie
                .candidates("a.excluded.example.test")
                .iter()
                .any(|(k, _)| k == &key("p"))
        );
    }

    #[test]
    fn no_match_returns_empty() {
        let trie = SuffixTrie::new();
        assert!(trie.candidates("foreign.test").is_empty());
    }
}
