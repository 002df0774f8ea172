use serde_yaml_ng::{Mapping, Value};

/// Walk a document tree depth-first, pre-order.
///
/// `visit(mapping, key)` runs for every key of every mapping, including the
/// root, before the walk descends into that mapping's values; whatever the
/// visitor leaves under the key is what gets descended into. Sequences are
/// walked element by element and scalars end the recursion.
///
/// `$ref` nodes are plain data here and are never followed, so the walk
/// terminates on any parsed document.
pub fn crawl<F>(node: &mut Value, visit: &mut F)
where
    F: FnMut(&mut Mapping, &Value),
{
    match node {
        Value::Mapping(map) => {
            let keys: Vec<Value> = map.keys().cloned().collect();
            for key in &keys {
                visit(map, key);
            }
            for value in map.values_mut() {
                crawl(value, visit);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                crawl(item, visit);
            }
        }
        Value::Tagged(tagged) => crawl(&mut tagged.value, visit),
        _ => {}
    }
}
