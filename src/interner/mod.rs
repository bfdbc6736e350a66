use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Assigns stable, 1-based sequential ids to values on first sight.
///
/// Ids are never reused or removed; iteration yields values in the order
/// they were first interned, so `iter().nth(i)` has id `i + 1`.
#[derive(Debug, Clone)]
pub struct Interner<K> {
    ids: HashMap<K, usize>,
    values: Vec<K>,
}

impl<K> Default for Interner<K> {
    fn default() -> Self {
        Interner { ids: HashMap::new(), values: Vec::new() }
    }
}

impl<K: Eq + Hash + Clone> Interner<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `value`, allocating the next one if it has not been seen before.
    pub fn intern(&mut self, value: K) -> usize {
        if let Some(&id) = self.ids.get(&value) {
            return id;
        }
        self.values.push(value.clone());
        let id = self.values.len();
        self.ids.insert(value, id);
        id
    }

    /// Value behind an id handed out by [`Interner::intern`].
    pub fn resolve(&self, id: usize) -> Option<&K> {
        id.checked_sub(1).and_then(|i| self.values.get(i))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(id, value)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &K)> {
        self.values.iter().enumerate().map(|(i, v)| (i + 1, v))
    }
}

impl<K: PartialEq> PartialEq for Interner<K> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

// Serialized as the plain value list; ids are positional.
impl<K: Serialize> Serialize for Interner<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de, K: Deserialize<'de> + Eq + Hash + Clone> Deserialize<'de> for Interner<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<K>::deserialize(deserializer)?;
        let mut interner = Interner::new();
        for value in values {
            interner.intern(value);
        }
        Ok(interner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_in_first_seen_order() {
        let mut names = Interner::new();
        assert_eq!(names.intern("x".to_string()), 1);
        assert_eq!(names.intern("a".to_string()), 2);
        assert_eq!(names.intern("b".to_string()), 3);
        let order: Vec<_> = names.iter().map(|(id, v)| (id, v.as_str())).collect();
        assert_eq!(order, vec![(1, "x"), (2, "a"), (3, "b")]);
    }

    #[test]
    fn interning_is_idempotent() {
        let mut consts = Interner::new();
        let first = consts.intern(50i64);
        let again = consts.intern(50i64);
        assert_eq!(first, again);
        assert_eq!(consts.len(), 1);
    }

    #[test]
    fn resolve_maps_back() {
        let mut names = Interner::new();
        names.intern("x".to_string());
        names.intern("y".to_string());
        assert_eq!(names.resolve(2).map(String::as_str), Some("y"));
        assert_eq!(names.resolve(0), None);
        assert_eq!(names.resolve(3), None);
    }

    #[test]
    fn independent_instances_do_not_share_ids() {
        let mut consts: Interner<i64> = Interner::new();
        let mut names: Interner<String> = Interner::new();
        consts.intern(10);
        consts.intern(20);
        assert_eq!(names.intern("x".to_string()), 1);
    }

    #[test]
    fn serde_preserves_ids() {
        let mut names = Interner::new();
        names.intern("x".to_string());
        names.intern("a".to_string());
        let json = serde_json::to_string(&names).unwrap();
        assert_eq!(json, r#"["x","a"]"#);
        let mut back: Interner<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, names);
        assert_eq!(back.intern("a".to_string()), 2);
    }
}
