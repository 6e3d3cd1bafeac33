//! Attribute inheritance through the tag graph.
//!
//! Flattening walks a key's ancestors depth-first, self first, and merges
//! attributes so that the value seen earliest wins: a record's own value
//! shadows every ancestor's, and among ancestors the first one reached in
//! declaration order wins. The same walk collects the deduplicated tag
//! closure in first-visited order.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use tagtree_config::CyclePolicy;

use crate::diagnostics::Diagnostic;
use crate::error::{RegistryError, Result};
use crate::index::{AttrValue, RawIndex};

/// Merged attributes and full ancestor closure of one key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlattenedView {
    /// Own and inherited attributes, own values first.
    pub attributes: IndexMap<String, AttrValue>,
    /// Every ancestor key, deduplicated, in first-visited order.
    pub tags: Vec<String>,
}

impl FlattenedView {
    /// Whether `tag` is among this key's ancestors.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }
}

/// Computes [`FlattenedView`]s over a [`RawIndex`].
///
/// The walk keeps its own work stack, so ancestor chains of any length are
/// flattened without growing the call stack. Each record is walked at most
/// once per flatten unless a depth budget lets a later path reach further.
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'a> {
    index: &'a RawIndex,
    depth: Option<usize>,
    cycle_policy: CyclePolicy,
}

/// A record on the walk stack: its tags and how far past them to go.
struct Frame<'k> {
    key: &'k str,
    tags: &'k [String],
    next: usize,
    /// `None` once the budget is spent, `Some(None)` when unbounded.
    child_depth: Option<Option<usize>>,
}

#[derive(Default)]
struct Walk<'k> {
    stack: Vec<Frame<'k>>,
    on_path: HashSet<&'k str>,
    recorded: HashSet<&'k str>,
    /// Largest remaining budget each record has been walked with.
    best: HashMap<&'k str, Option<usize>>,
}

impl<'a> Flattener<'a> {
    pub fn new(index: &'a RawIndex) -> Self {
        Self {
            index,
            depth: None,
            cycle_policy: CyclePolicy::default(),
        }
    }

    /// Limit how many ancestor levels are walked. `Some(0)` merges only the
    /// key's own record, though its direct tags are still recorded.
    pub fn with_depth(mut self, depth: Option<usize>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Flatten one key.
    ///
    /// An unknown key yields an empty view and an [`Diagnostic::UnknownKey`].
    /// Fails only on a cycle under [`CyclePolicy::Reject`]. Under
    /// [`CyclePolicy::Truncate`] each distinct cycle is reported once per
    /// diagnostics sink.
    pub fn flatten(&self, key: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<FlattenedView> {
        let mut view = FlattenedView::default();
        if !self.index.contains_key(key) {
            Diagnostic::UnknownKey {
                key: key.to_string(),
            }
            .report(diagnostics);
            return Ok(view);
        }

        self.walk(key, &mut view, diagnostics)?;
        Ok(view)
    }

    /// Flatten every key of the index, in index order.
    pub fn flatten_all(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<IndexMap<String, FlattenedView>> {
        let mut flat = IndexMap::with_capacity(self.index.len());
        for key in self.index.keys() {
            flat.insert(key.to_string(), self.flatten(key, diagnostics)?);
        }
        debug!(count = flat.len(), "flattened registry");
        Ok(flat)
    }

    fn walk<'k>(
        &self,
        key: &'k str,
        view: &mut FlattenedView,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()>
    where
        'a: 'k,
    {
        let mut walk = Walk::default();
        self.enter(&mut walk, key, self.depth, view);

        while let Some(frame) = walk.stack.last_mut() {
            let tags = frame.tags;
            let parent = frame.key;
            let Some(tag) = tags.get(frame.next) else {
                walk.on_path.remove(parent);
                walk.stack.pop();
                continue;
            };
            frame.next += 1;
            let child_depth = frame.child_depth;
            let tag = tag.as_str();

            if !self.index.contains_key(tag) {
                debug!(key = parent, tag, "skipping tag missing from index");
                continue;
            }

            if walk.recorded.insert(tag) {
                view.tags.push(tag.to_string());
            }

            let Some(depth) = child_depth else {
                continue;
            };

            if walk.on_path.contains(tag) {
                let start = walk
                    .stack
                    .iter()
                    .position(|f| f.key == tag)
                    .unwrap_or_default();
                let mut cycle: Vec<String> =
                    walk.stack[start..].iter().map(|f| f.key.to_string()).collect();
                cycle.push(tag.to_string());
                match self.cycle_policy {
                    CyclePolicy::Reject => {
                        return Err(RegistryError::CycleDetected { path: cycle });
                    }
                    CyclePolicy::Truncate => {
                        let diagnostic = Diagnostic::CycleTruncated {
                            path: canonical_cycle(cycle),
                        };
                        if !diagnostics.contains(&diagnostic) {
                            diagnostic.report(diagnostics);
                        }
                        continue;
                    }
                }
            }

            if walk.best.get(tag).is_some_and(|&seen| covers(seen, depth)) {
                continue;
            }
            self.enter(&mut walk, tag, depth, view);
        }

        Ok(())
    }

    /// Merge `key`'s own attributes and push it onto the walk stack.
    fn enter<'k>(
        &self,
        walk: &mut Walk<'k>,
        key: &'k str,
        depth: Option<usize>,
        view: &mut FlattenedView,
    ) where
        'a: 'k,
    {
        let Some(record) = self.index.get(key) else {
            return;
        };

        for (name, value) in &record.attributes {
            if !view.attributes.contains_key(name) {
                view.attributes.insert(name.clone(), value.clone());
            }
        }

        let child_depth = match depth {
            None => Some(None),
            Some(0) => None,
            Some(d) => Some(Some(d - 1)),
        };

        walk.best.insert(key, depth);
        walk.on_path.insert(key);
        walk.stack.push(Frame {
            key,
            tags: &record.tags,
            next: 0,
            child_depth,
        });
    }
}

/// Whether a walk with budget `seen` already reached everything `depth` would.
fn covers(seen: Option<usize>, depth: Option<usize>) -> bool {
    match (seen, depth) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(seen), Some(depth)) => seen >= depth,
    }
}

/// Rotate a closed cycle `[k0, .., kn, k0]` to start at its smallest key.
fn canonical_cycle(mut cycle: Vec<String>) -> Vec<String> {
    cycle.pop();
    let start = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or_default();
    cycle.rotate_left(start);
    if let Some(first) = cycle.first().cloned() {
        cycle.push(first);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Record;
    use pretty_assertions::assert_eq;

    fn sample() -> RawIndex {
        RawIndex::from_json_str(
            r#"{
                "A": {"tags": []},
                "B": {"tags": ["A"], "color": "red"},
                "C": {"tags": ["B"], "color": "blue", "size": "L"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_own_value_wins() {
        let index = sample();
        let view = Flattener::new(&index).flatten("C", &mut Vec::new()).unwrap();

        assert_eq!(view.tags, vec!["B", "A"]);
        assert_eq!(
            view.attributes.keys().collect::<Vec<_>>(),
            vec!["color", "size"]
        );
        assert_eq!(view.get("color"), Some(&AttrValue::from("blue")));
    }

    #[test]
    fn test_inherits_from_first_declared_parent() {
        let index: RawIndex = [
            ("p1", Record::new(Vec::<String>::new()).with("gpu", "orin")),
            ("p2", Record::new(Vec::<String>::new()).with("gpu", "thor").with("ram", 64_i64)),
            ("k", Record::new(["p1", "p2"])),
        ]
        .into_iter()
        .collect();
        let view = Flattener::new(&index).flatten("k", &mut Vec::new()).unwrap();

        assert_eq!(view.get("gpu"), Some(&AttrValue::from("orin")));
        assert_eq!(view.get("ram"), Some(&AttrValue::from(64_i64)));
        assert_eq!(view.tags, vec!["p1", "p2"]);
    }

    #[test]
    fn test_depth_first_before_siblings() {
        let index: RawIndex = [
            ("root", Record::new(Vec::<String>::new()).with("v", "root")),
            ("left", Record::new(["root"])),
            ("right", Record::new(Vec::<String>::new()).with("v", "right")),
            ("k", Record::new(["left", "right"])),
        ]
        .into_iter()
        .collect();
        let view = Flattener::new(&index).flatten("k", &mut Vec::new()).unwrap();

        assert_eq!(view.tags, vec!["left", "root", "right"]);
        assert_eq!(view.get("v"), Some(&AttrValue::from("root")));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let index: RawIndex = [
            ("base", Record::new(Vec::<String>::new())),
            ("l", Record::new(["base"])),
            ("r", Record::new(["base"])),
            ("d", Record::new(["l", "r"])),
        ]
        .into_iter()
        .collect();
        let mut diags = Vec::new();
        let view = Flattener::new(&index).flatten("d", &mut diags).unwrap();

        assert_eq!(view.tags, vec!["l", "base", "r"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_depth_budget() {
        let index = sample();
        let mut diags = Vec::new();

        let zero = Flattener::new(&index)
            .with_depth(Some(0))
            .flatten("C", &mut diags)
            .unwrap();
        assert_eq!(zero.tags, vec!["B"]);
        assert_eq!(zero.get("color"), Some(&AttrValue::from("blue")));

        let index = RawIndex::from_json_str(
            r#"{
                "A": {"tags": [], "deep": true},
                "B": {"tags": ["A"], "mid": true},
                "C": {"tags": ["B"]}
            }"#,
        )
        .unwrap();
        let one = Flattener::new(&index)
            .with_depth(Some(1))
            .flatten("C", &mut diags)
            .unwrap();
        assert_eq!(one.tags, vec!["B", "A"]);
        assert!(one.get("mid").is_some());
        assert!(one.get("deep").is_none());
    }

    #[test]
    fn test_unknown_key_yields_empty_view() {
        let index = sample();
        let mut diags = Vec::new();
        let view = Flattener::new(&index).flatten("Z", &mut diags).unwrap();

        assert_eq!(view, FlattenedView::default());
        assert_eq!(diags, vec![Diagnostic::UnknownKey { key: "Z".into() }]);
    }

    #[test]
    fn test_cycle_rejected() {
        let index: RawIndex = [("a", Record::new(["b"])), ("b", Record::new(["a"]))]
            .into_iter()
            .collect();
        let err = Flattener::new(&index)
            .flatten("a", &mut Vec::new())
            .unwrap_err();

        match err {
            RegistryError::CycleDetected { path } => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_truncated() {
        let index: RawIndex = [
            ("a", Record::new(["b"]).with("x", 1_i64)),
            ("b", Record::new(["a"]).with("y", 2_i64)),
        ]
        .into_iter()
        .collect();
        let mut diags = Vec::new();
        let view = Flattener::new(&index)
            .with_cycle_policy(CyclePolicy::Truncate)
            .flatten("a", &mut diags)
            .unwrap();

        assert_eq!(view.tags, vec!["b", "a"]);
        assert_eq!(view.attributes.len(), 2);
        assert_eq!(
            diags,
            vec![Diagnostic::CycleTruncated {
                path: vec!["a".into(), "b".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn test_each_cycle_reported_once() {
        let index: RawIndex = [
            ("a", Record::new(["b"])),
            ("b", Record::new(["c"])),
            ("c", Record::new(["a"])),
            ("d", Record::new(["a", "b"])),
        ]
        .into_iter()
        .collect();
        let mut diags = Vec::new();
        let flat = Flattener::new(&index)
            .with_cycle_policy(CyclePolicy::Truncate)
            .flatten_all(&mut diags)
            .unwrap();

        assert_eq!(flat["d"].tags, vec!["a", "b", "c"]);
        assert_eq!(
            diags,
            vec![Diagnostic::CycleTruncated {
                path: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn test_canonical_cycle_starts_at_smallest_key() {
        let cycle = canonical_cycle(vec!["c".into(), "a".into(), "b".into(), "c".into()]);
        assert_eq!(cycle, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_deeper_budget_revisits_shared_ancestor() {
        // "top" is first reached through "mid" with no budget left for
        // "root", then directly from k with one level to spare.
        let index: RawIndex = [
            ("root", Record::new(Vec::<String>::new()).with("deep", true)),
            ("top", Record::new(["root"])),
            ("mid", Record::new(["top"])),
            ("k", Record::new(["mid", "top"])),
        ]
        .into_iter()
        .collect();
        let view = Flattener::new(&index)
            .with_depth(Some(2))
            .flatten("k", &mut Vec::new())
            .unwrap();

        assert_eq!(view.tags, vec!["mid", "top", "root"]);
        assert_eq!(view.get("deep"), Some(&AttrValue::from(true)));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        const DEPTH: usize = 100_000;
        let index: RawIndex = (0..DEPTH)
            .map(|i| {
                let tags = if i == 0 {
                    Vec::new()
                } else {
                    vec![format!("n{}", i - 1)]
                };
                (format!("n{i}"), Record::new(tags))
            })
            .collect();

        let view = Flattener::new(&index)
            .flatten(&format!("n{}", DEPTH - 1), &mut Vec::new())
            .unwrap();
        assert_eq!(view.tags.len(), DEPTH - 1);
        assert_eq!(view.tags.last().map(String::as_str), Some("n0"));
    }

    #[test]
    fn test_self_tag_is_a_cycle() {
        let index: RawIndex = [("loop", Record::new(["loop"]))].into_iter().collect();
        assert!(Flattener::new(&index).flatten("loop", &mut Vec::new()).is_err());
    }

    #[test]
    fn test_flatten_idempotent() {
        let index = sample();
        let flattener = Flattener::new(&index);
        let first = flattener.flatten_all(&mut Vec::new()).unwrap();
        let second = flattener.flatten_all(&mut Vec::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }
}
