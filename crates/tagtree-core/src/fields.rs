//! Detection of user-configurable attributes.
//!
//! An attribute is a field when its value names a record whose tag closure
//! contains the sentinel field tag (`field` by default).

use indexmap::IndexMap;

use crate::flatten::FlattenedView;
use crate::index::RawIndex;

/// Field names per key, in flattened attribute order.
///
/// Every key of `flat` gets an entry, empty when it has no fields.
pub fn compute_fields(
    index: &RawIndex,
    flat: &IndexMap<String, FlattenedView>,
    field_tag: &str,
) -> IndexMap<String, Vec<String>> {
    flat.iter()
        .map(|(key, view)| (key.clone(), fields_of(index, flat, view, field_tag)))
        .collect()
}

fn fields_of(
    index: &RawIndex,
    flat: &IndexMap<String, FlattenedView>,
    view: &FlattenedView,
    field_tag: &str,
) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for (name, value) in &view.attributes {
        let Some(target) = value.as_key_ref(index) else {
            continue;
        };
        let is_field = flat.get(target).is_some_and(|t| t.has_tag(field_tag));
        if is_field && !fields.contains(name) {
            fields.push(name.clone());
        }
    }
    fields
}
