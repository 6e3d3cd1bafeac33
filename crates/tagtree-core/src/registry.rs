//! The registry facade: one immutable object holding the raw index and
//! everything derived from it.
//!
//! Construction runs the whole pipeline eagerly (flatten, fields, graph).
//! Nothing is recomputed afterwards; to pick up new data, build a new
//! [`Registry`]. The read surface takes `&self` only, so a registry can be
//! shared freely between readers (e.g. behind an `Arc`).

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::info;

use tagtree_config::{CyclePolicy, RegistryConfig};

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::fields::compute_fields;
use crate::flatten::{FlattenedView, Flattener};
use crate::graph::Graph;
use crate::index::{AttrValue, RawIndex, Record};
use crate::query::{FilterOp, Filtered, Query, QueryEngine};

/// Default sentinel tag for configurable fields.
pub const DEFAULT_FIELD_TAG: &str = "field";

/// Settings applied while building a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Tag whose descendants mark an attribute as a field.
    pub field_tag: String,
    /// Ancestor levels walked when flattening (`None` = unbounded).
    pub max_depth: Option<usize>,
    pub cycle_policy: CyclePolicy,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            field_tag: DEFAULT_FIELD_TAG.to_string(),
            max_depth: None,
            cycle_policy: CyclePolicy::default(),
        }
    }
}

impl From<&RegistryConfig> for RegistryOptions {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            field_tag: config.field_tag.clone(),
            max_depth: config.max_depth,
            cycle_policy: config.cycle_policy,
        }
    }
}

/// Resolved, read-only view of a tagged resource index.
#[derive(Debug, Clone)]
pub struct Registry {
    index: RawIndex,
    flat: IndexMap<String, FlattenedView>,
    props: IndexMap<String, Vec<String>>,
    graph: Graph,
    options: RegistryOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Registry {
    /// Build a registry with default options.
    pub fn new(index: RawIndex) -> Result<Self> {
        Self::with_options(index, RegistryOptions::default())
    }

    /// Build a registry.
    ///
    /// Fails only on a tag cycle under [`CyclePolicy::Reject`]; dangling tags
    /// are dropped and recorded in [`Registry::diagnostics`].
    pub fn with_options(index: RawIndex, options: RegistryOptions) -> Result<Self> {
        let mut diagnostics = Vec::new();

        let flat = Flattener::new(&index)
            .with_depth(options.max_depth)
            .with_cycle_policy(options.cycle_policy)
            .flatten_all(&mut diagnostics)?;
        let props = compute_fields(&index, &flat, &options.field_tag);
        let graph = Graph::build(&index, &mut diagnostics);

        info!(
            records = index.len(),
            roots = graph.roots().len(),
            diagnostics = diagnostics.len(),
            "built registry"
        );

        Ok(Self {
            index,
            flat,
            props,
            graph,
            options,
            diagnostics,
        })
    }

    /// Parse a JSON index and build a registry from it.
    pub fn from_json_str(s: &str, options: RegistryOptions) -> Result<Self> {
        Self::with_options(RawIndex::from_json_str(s)?, options)
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// The unmodified source index.
    pub fn index(&self) -> &RawIndex {
        &self.index
    }

    /// Raw record of `key`.
    pub fn record(&self, key: &str) -> Option<&Record> {
        self.index.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Flattened view of `key`, computed at construction.
    pub fn flat(&self, key: &str) -> Option<&FlattenedView> {
        self.flat.get(key)
    }

    /// All flattened views, in index order.
    pub fn flat_all(&self) -> &IndexMap<String, FlattenedView> {
        &self.flat
    }

    /// Flatten `key` afresh with a custom depth budget, bypassing the cache.
    ///
    /// Prefer [`Registry::flat`]; this walks the graph on every call.
    pub fn flatten(&self, key: &str, depth: Option<usize>) -> Result<FlattenedView> {
        Flattener::new(&self.index)
            .with_depth(depth)
            .with_cycle_policy(self.options.cycle_policy)
            .flatten(key, &mut Vec::new())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn parents(&self, key: &str) -> &[String] {
        self.graph.parents(key)
    }

    pub fn children(&self, key: &str) -> &[String] {
        self.graph.children(key)
    }

    /// Keys without parents, in index order.
    pub fn roots(&self) -> &[String] {
        self.graph.roots()
    }

    /// Transitive parents of `key` (the flattened tag closure).
    pub fn ancestors(&self, key: &str) -> &[String] {
        self.flat
            .get(key)
            .map(|view| view.tags.as_slice())
            .unwrap_or(&[])
    }

    /// Transitive children of `key`, breadth-first, each listed once.
    pub fn descendants(&self, key: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out: Vec<&str> = Vec::new();
        let mut frontier: Vec<&str> = vec![key];

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for k in frontier {
                for child in self.children(k) {
                    if child != key && seen.insert(child.as_str()) {
                        out.push(child);
                        next.push(child.as_str());
                    }
                }
            }
            frontier = next;
        }
        out
    }

    /// Names of the configurable attributes of `key`.
    pub fn props(&self, key: &str) -> &[String] {
        self.props.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Alias of [`Registry::props`].
    pub fn fields(&self, key: &str) -> &[String] {
        self.props(key)
    }

    /// Inherited value of one attribute of `key`.
    pub fn property(&self, key: &str, name: &str) -> Option<&AttrValue> {
        self.flat.get(key)?.get(name)
    }

    /// Each field of `key` with its resolved value.
    pub fn field_values(&self, key: &str) -> Vec<(&str, &AttrValue)> {
        self.props(key)
            .iter()
            .filter_map(|name| Some((name.as_str(), self.property(key, name)?)))
            .collect()
    }

    /// Tag-membership test over the ancestor closure.
    ///
    /// With `key`, yields [`Filtered::Matches`]; without, the matching subset
    /// of the index. No tags or an unknown key yields [`Filtered::Unfiltered`].
    pub fn filter<S: AsRef<str>>(
        &self,
        tags: &[S],
        op: FilterOp,
        key: Option<&str>,
    ) -> Filtered<'_> {
        let query = Query::new(tags.iter().map(|t| t.as_ref()), op);
        self.query(&query, key)
    }

    /// Like [`Registry::filter`] with the op given as text; anything other
    /// than `and`/`or` yields [`Filtered::Unfiltered`].
    pub fn filter_str<S: AsRef<str>>(
        &self,
        tags: &[S],
        op: &str,
        key: Option<&str>,
    ) -> Filtered<'_> {
        match op.parse::<FilterOp>() {
            Ok(op) => self.filter(tags, op, key),
            Err(_) => {
                Diagnostic::InvalidOp { op: op.to_string() }.emit();
                Filtered::Unfiltered(&self.index)
            }
        }
    }

    /// Run a [`Query`] against one key or the whole index.
    pub fn query(&self, query: &Query, key: Option<&str>) -> Filtered<'_> {
        QueryEngine::new(&self.index, &self.flat, &self.graph).run(query, key)
    }

    /// Fold the child tree bottom-up starting from `start`.
    ///
    /// For every node, its children are folded first (in child order) and
    /// `f(key, child_results, depth)` produces the node's result. Start keys
    /// have depth 0. A key already on the current path is skipped.
    pub fn gather_reduce<T, F>(&self, start: &[String], mut f: F) -> Vec<T>
    where
        F: FnMut(&str, Vec<T>, usize) -> T,
    {
        let mut path = Vec::new();
        start
            .iter()
            .filter(|key| self.contains(key))
            .map(|key| self.gather(key, 0, &mut path, &mut f))
            .collect()
    }

    fn gather<'s, T, F>(
        &'s self,
        key: &'s str,
        depth: usize,
        path: &mut Vec<&'s str>,
        f: &mut F,
    ) -> T
    where
        F: FnMut(&str, Vec<T>, usize) -> T,
    {
        path.push(key);
        let mut results = Vec::new();
        for child in self.children(key) {
            if path.contains(&child.as_str()) {
                continue;
            }
            results.push(self.gather(child, depth + 1, path, f));
        }
        path.pop();
        f(key, results, depth)
    }

    /// Diagnostics recorded during construction.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
