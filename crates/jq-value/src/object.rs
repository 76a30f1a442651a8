//! Insertion-ordered object map.
//!
//! A hash map alone cannot satisfy the language's ordering rules: key
//! iteration and serialization are order-sensitive (insertion/parse order),
//! while equality is order-insensitive. `IndexMap` gives us both for free —
//! insertion order preserved, O(1) lookup — instead of hand-rolling a
//! parallel keys-vector + hash-index structure.

use indexmap::IndexMap;

use crate::value::Value;

/// A JSON object that remembers the order its keys were inserted in.
#[derive(Debug, Clone, Default)]
pub struct OrderedObject {
    entries: IndexMap<String, Value>,
}

impl OrderedObject {
    pub fn new() -> Self {
        OrderedObject { entries: IndexMap::new() }
    }

    /// Insert a key/value pair. Duplicate keys: last write wins, but the
    /// key keeps its *original* insertion position (matches `IndexMap`'s
    /// `insert`, so values update in place while iteration order follows
    /// the first occurrence).
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    /// Order-insensitive structural equality: same key set, and every
    /// value compares equal under [`Value::structural_eq`].
    pub fn structural_eq(&self, other: &OrderedObject) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.entries.get(k).is_some_and(|ov| v.structural_eq(ov)))
    }
}

impl FromIterator<(String, Value)> for OrderedObject {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut obj = OrderedObject::new();
        for (k, v) in iter {
            obj.insert(k, v);
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_order_insensitive() {
        let mut a = OrderedObject::new();
        a.insert("a", Value::Number(1.0));
        a.insert("b", Value::Number(2.0));

        let mut b = OrderedObject::new();
        b.insert("b", Value::Number(2.0));
        b.insert("a", Value::Number(1.0));

        assert!(a.structural_eq(&b));
    }

    #[test]
    fn iteration_is_insertion_ordered() {
        let mut obj = OrderedObject::new();
        obj.insert("z", Value::Null);
        obj.insert("a", Value::Null);
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn duplicate_key_last_write_wins_first_position() {
        let mut obj = OrderedObject::new();
        obj.insert("a", Value::Number(1.0));
        obj.insert("b", Value::Number(2.0));
        obj.insert("a", Value::Number(3.0));
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(obj.get("a"), Some(&Value::Number(3.0)));
    }
}
