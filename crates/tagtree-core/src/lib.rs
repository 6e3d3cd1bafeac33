#![deny(unsafe_code)]

//! Tag-graph inheritance resolution for JSON resource catalogs.
//!
//! A catalog is a flat JSON object of resources, each listing its parents in
//! a `tags` array. [`Registry`] turns it into a parent/child graph, a
//! flattened view per resource with inherited attributes, the set of roots,
//! and the attributes that reference configurable fields. Renderers and
//! command generators only ever read from a built registry.

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Soft-fail diagnostics for bad references and malformed queries.
pub mod diagnostics;
/// Registry construction and loading errors.
pub mod error;
/// Detection of attributes that reference field nodes.
pub mod fields;
/// Attribute inheritance and tag closure.
pub mod flatten;
/// Parent/child adjacency and roots.
pub mod graph;
/// The raw index and its attribute values.
pub mod index;
/// Loading an index from disk or HTTP.
pub mod load;
/// Tag-membership queries.
pub mod query;
/// The registry facade.
pub mod registry;

pub use diagnostics::Diagnostic;
pub use error::{RegistryError, Result};
pub use flatten::{FlattenedView, Flattener};
pub use graph::Graph;
pub use index::{AttrValue, RawIndex, Record};
pub use load::Loader;
pub use query::{FilterOp, Filtered, Query, QueryEngine, Relation};
pub use registry::{DEFAULT_FIELD_TAG, Registry, RegistryOptions};
pub use tagtree_config::CyclePolicy;
