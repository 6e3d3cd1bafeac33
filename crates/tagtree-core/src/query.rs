//! Tag-membership queries over the flattened registry.
//!
//! Queries are pure: they read the views built at construction and keep no
//! state of their own. Malformed queries (no tags, unknown op, unknown key)
//! degrade to [`Filtered::Unfiltered`] with a logged diagnostic.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::flatten::FlattenedView;
use crate::graph::Graph;
use crate::index::{RawIndex, Record};

/// How requested tags combine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Every tag must be present.
    #[default]
    And,
    /// At least one tag must be present.
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("filter op must be 'and' or 'or' (was '{0}')")]
pub struct ParseFilterOpError(pub String);

impl FromStr for FilterOp {
    type Err = ParseFilterOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(ParseFilterOpError(other.to_string())),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// Which tag set of a key a query tests against.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The flattened tag closure (direct and transitive parents).
    #[default]
    Ancestors,
    /// Direct parents only.
    Parents,
    /// Direct children.
    Children,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("relation must be 'ancestors', 'parents' or 'children' (was '{0}')")]
pub struct ParseRelationError(pub String);

impl FromStr for Relation {
    type Err = ParseRelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ancestors" => Ok(Self::Ancestors),
            "parents" => Ok(Self::Parents),
            "children" => Ok(Self::Children),
            other => Err(ParseRelationError(other.to_string())),
        }
    }
}

/// A tag query: which tags, how they combine, and against which relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub tags: Vec<String>,
    pub op: FilterOp,
    pub relation: Relation,
}

impl Query {
    pub fn new<I, S>(tags: I, op: FilterOp) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            op,
            relation: Relation::default(),
        }
    }

    /// Keys carrying every one of `tags`.
    pub fn all_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(tags, FilterOp::And)
    }

    /// Keys carrying at least one of `tags`.
    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(tags, FilterOp::Or)
    }

    /// Test against `relation` instead of the ancestor closure.
    pub fn on(mut self, relation: Relation) -> Self {
        self.relation = relation;
        self
    }
}

/// Result of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered<'a> {
    /// Single-key mode: whether the key satisfies the query.
    Matches(bool),
    /// Whole-index mode: matching records in index order.
    Subset(IndexMap<&'a str, &'a Record>),
    /// The query was malformed; the full index stands in for the result.
    Unfiltered(&'a RawIndex),
}

impl<'a> Filtered<'a> {
    /// Whether the result admits the queried key (single-key mode) or is
    /// non-empty (whole-index mode).
    pub fn is_match(&self) -> bool {
        match self {
            Self::Matches(m) => *m,
            Self::Subset(subset) => !subset.is_empty(),
            Self::Unfiltered(index) => !index.is_empty(),
        }
    }

    /// Keys of the result set; empty in single-key mode.
    pub fn keys(&self) -> Vec<&'a str> {
        match self {
            Self::Matches(_) => Vec::new(),
            Self::Subset(subset) => subset.keys().copied().collect(),
            Self::Unfiltered(index) => index.keys().collect(),
        }
    }
}

/// Evaluates [`Query`]s over a built registry.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    index: &'a RawIndex,
    flat: &'a IndexMap<String, FlattenedView>,
    graph: &'a Graph,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        index: &'a RawIndex,
        flat: &'a IndexMap<String, FlattenedView>,
        graph: &'a Graph,
    ) -> Self {
        Self { index, flat, graph }
    }

    /// Run `query` against one key, or against the whole index when `key` is `None`.
    pub fn run(&self, query: &Query, key: Option<&str>) -> Filtered<'a> {
        if query.tags.is_empty() {
            Diagnostic::EmptyFilter.emit();
            return Filtered::Unfiltered(self.index);
        }

        match key {
            Some(key) => {
                if !self.index.contains_key(key) {
                    Diagnostic::UnknownKey {
                        key: key.to_string(),
                    }
                    .emit();
                    return Filtered::Unfiltered(self.index);
                }
                Filtered::Matches(self.matches(query, key))
            }
            None => Filtered::Subset(
                self.index
                    .iter()
                    .filter(|(k, _)| self.matches(query, k))
                    .collect(),
            ),
        }
    }

    fn matches(&self, query: &Query, key: &str) -> bool {
        let related = self.related(key, query.relation);
        let has = |tag: &String| related.contains(tag);
        match query.op {
            FilterOp::And => query.tags.iter().all(has),
            FilterOp::Or => query.tags.iter().any(has),
        }
    }

    fn related(&self, key: &str, relation: Relation) -> &'a [String] {
        match relation {
            Relation::Ancestors => self
                .flat
                .get(key)
                .map(|view| view.tags.as_slice())
                .unwrap_or(&[]),
            Relation::Parents => self.graph.parents(key),
            Relation::Children => self.graph.children(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Flattener;
    use pretty_assertions::assert_eq;

    struct Fixture {
        index: RawIndex,
        flat: IndexMap<String, FlattenedView>,
        graph: Graph,
    }

    impl Fixture {
        fn new() -> Self {
            let index = RawIndex::from_json_str(
                r#"{
                    "container": {"tags": []},
                    "llm": {"tags": []},
                    "vlm": {"tags": ["llm"]},
                    "llama": {"tags": ["llm", "container"]},
                    "llava": {"tags": ["vlm"]},
                    "whisper": {"tags": ["container"]}
                }"#,
            )
            .unwrap();
            let flat = Flattener::new(&index).flatten_all(&mut Vec::new()).unwrap();
            let graph = Graph::build(&index, &mut Vec::new());
            Self { index, flat, graph }
        }

        fn engine(&self) -> QueryEngine<'_> {
            QueryEngine::new(&self.index, &self.flat, &self.graph)
        }
    }

    #[test]
    fn test_single_key_and_or() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let both = Query::all_of(["llm", "container"]);
        let either = Query::any_of(["llm", "container"]);

        assert_eq!(engine.run(&both, Some("llama")), Filtered::Matches(true));
        assert_eq!(engine.run(&both, Some("llava")), Filtered::Matches(false));
        assert_eq!(engine.run(&either, Some("llava")), Filtered::Matches(true));
        assert_eq!(engine.run(&either, Some("llm")), Filtered::Matches(false));
    }

    #[test]
    fn test_whole_index_preserves_order() {
        let fx = Fixture::new();
        let result = fx.engine().run(&Query::all_of(["llm"]), None);
        assert_eq!(result.keys(), vec!["vlm", "llama", "llava"]);

        let result = fx.engine().run(&Query::any_of(["vlm", "container"]), None);
        assert_eq!(result.keys(), vec!["llama", "llava", "whisper"]);
    }

    #[test]
    fn test_parents_relation_excludes_transitive() {
        let fx = Fixture::new();
        let query = Query::all_of(["llm"]).on(Relation::Parents);
        assert_eq!(fx.engine().run(&query, None).keys(), vec!["vlm", "llama"]);
    }

    #[test]
    fn test_children_relation() {
        let fx = Fixture::new();
        let query = Query::any_of(["whisper"]).on(Relation::Children);
        assert_eq!(fx.engine().run(&query, None).keys(), vec!["container"]);
    }

    #[test]
    fn test_empty_tags_unfiltered() {
        let fx = Fixture::new();
        let result = fx.engine().run(&Query::all_of(Vec::<String>::new()), None);
        assert_eq!(result, Filtered::Unfiltered(&fx.index));
        assert_eq!(result.keys().len(), fx.index.len());
    }

    #[test]
    fn test_unknown_key_unfiltered() {
        let fx = Fixture::new();
        let result = fx.engine().run(&Query::all_of(["llm"]), Some("gpt"));
        assert!(matches!(result, Filtered::Unfiltered(_)));
    }

    #[test]
    fn test_filter_op_parse() {
        assert_eq!("and".parse::<FilterOp>(), Ok(FilterOp::And));
        assert_eq!("or".parse::<FilterOp>(), Ok(FilterOp::Or));
        assert_eq!(
            "xor".parse::<FilterOp>(),
            Err(ParseFilterOpError("xor".into()))
        );
        assert_eq!(FilterOp::Or.to_string(), "or");
    }

    #[test]
    fn test_relation_parse() {
        assert_eq!("parents".parse::<Relation>(), Ok(Relation::Parents));
        assert!("siblings".parse::<Relation>().is_err());
    }
}
