//! PropertyMap: the key-value store on nodes and relationships.

use std::collections::HashMap;
use super::Value;

/// A map of property names to values.
pub type PropertyMap = HashMap<String, Value>;

/// Build a PropertyMap from `(key, value)` pairs.
pub fn props<K, V, I>(pairs: I) -> PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
