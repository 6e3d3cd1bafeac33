//! Parent/child adjacency and roots derived from record tags.

use indexmap::IndexMap;
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::index::RawIndex;

/// Direct adjacency of the tag graph.
///
/// Every index key has an entry in both `parents` and `children`, possibly
/// empty. Tags that do not name a record are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    parents: IndexMap<String, Vec<String>>,
    children: IndexMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl Graph {
    /// Build the adjacency for `index`, reporting dangling tags into `diagnostics`.
    pub fn build(index: &RawIndex, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let mut parents: IndexMap<String, Vec<String>> = IndexMap::with_capacity(index.len());
        let mut children: IndexMap<String, Vec<String>> = IndexMap::with_capacity(index.len());

        for key in index.keys() {
            parents.insert(key.to_string(), Vec::new());
            children.insert(key.to_string(), Vec::new());
        }

        for (key, record) in index.iter() {
            for tag in &record.tags {
                if !index.contains_key(tag) {
                    Diagnostic::MissingTag {
                        key: key.to_string(),
                        tag: tag.clone(),
                    }
                    .report(diagnostics);
                    continue;
                }

                let own = &mut parents[key];
                if own.contains(tag) {
                    continue;
                }
                own.push(tag.clone());
                children[tag.as_str()].push(key.to_string());
            }
        }

        let roots: Vec<String> = parents
            .iter()
            .filter(|(_, p)| p.is_empty())
            .map(|(k, _)| k.clone())
            .collect();

        debug!(nodes = parents.len(), roots = roots.len(), "mapped registry tree");

        Self {
            parents,
            children,
            roots,
        }
    }

    /// Direct parents of `key`; empty for roots and unknown keys.
    pub fn parents(&self, key: &str) -> &[String] {
        self.parents.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct children of `key`; empty for leaves and unknown keys.
    pub fn children(&self, key: &str) -> &[String] {
        self.children.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys without parents, in index order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Direct parents of every key, in index order.
    pub fn parent_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.parents
    }

    /// Direct children of every key, in index order.
    pub fn child_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Record;
    use pretty_assertions::assert_eq;

    fn chain() -> RawIndex {
        [
            ("a", Record::new(Vec::<String>::new())),
            ("b", Record::new(["a"])),
            ("c", Record::new(["b"])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_chain_adjacency() {
        let mut diags = Vec::new();
        let graph = Graph::build(&chain(), &mut diags);

        assert!(diags.is_empty());
        assert_eq!(graph.parents("c"), ["b"]);
        assert_eq!(graph.children("a"), ["b"]);
        assert_eq!(graph.roots(), ["a"]);
        assert!(graph.children("c").is_empty());
    }

    #[test]
    fn test_dangling_tag_is_dropped() {
        let index: RawIndex = [
            ("a", Record::new(Vec::<String>::new())),
            ("b", Record::new(["ghost", "a"])),
            ("c", Record::new(["ghost"])),
        ]
        .into_iter()
        .collect();
        let mut diags = Vec::new();
        let graph = Graph::build(&index, &mut diags);

        assert_eq!(graph.parents("b"), ["a"]);
        assert!(graph.parents("c").is_empty());
        assert_eq!(graph.roots(), ["a", "c"]);
        assert_eq!(
            diags,
            vec![
                Diagnostic::MissingTag {
                    key: "b".into(),
                    tag: "ghost".into()
                },
                Diagnostic::MissingTag {
                    key: "c".into(),
                    tag: "ghost".into()
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let index: RawIndex = [
            ("a", Record::new(Vec::<String>::new())),
            ("b", Record::new(["a", "a"])),
        ]
        .into_iter()
        .collect();
        let graph = Graph::build(&index, &mut Vec::new());

        assert_eq!(graph.parents("b"), ["a"]);
        assert_eq!(graph.children("a"), ["b"]);
    }

    #[test]
    fn test_multi_parent_children_order() {
        let index: RawIndex = [
            ("x", Record::new(Vec::<String>::new())),
            ("y", Record::new(Vec::<String>::new())),
            ("m", Record::new(["x", "y"])),
            ("n", Record::new(["y"])),
        ]
        .into_iter()
        .collect();
        let graph = Graph::build(&index, &mut Vec::new());

        assert_eq!(graph.children("y"), ["m", "n"]);
        assert_eq!(graph.parents("m"), ["x", "y"]);
        assert_eq!(graph.roots(), ["x", "y"]);
    }

    #[test]
    fn test_adjacency_maps_cover_every_key() {
        let graph = Graph::build(&chain(), &mut Vec::new());

        assert_eq!(
            graph.parent_map().keys().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(graph.parent_map()["a"].is_empty());
        assert_eq!(graph.parent_map()["c"], vec!["b"]);
        assert_eq!(
            graph.child_map().keys().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(graph.child_map()["a"], vec!["b"]);
        assert!(graph.child_map()["c"].is_empty());
    }

    #[test]
    fn test_empty_index() {
        let graph = Graph::build(&RawIndex::default(), &mut Vec::new());
        assert!(graph.roots().is_empty());
        assert!(graph.parents("anything").is_empty());
    }
}
