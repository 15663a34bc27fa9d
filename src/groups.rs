// groups.rs
// Insertion-ordered grouping of parsed records by key

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Groups values by key, remembering the order in which keys first appeared.
///
/// Every grouping in the reducers (ticks, DPEs, modes, `left:right` pairs)
/// is reported in first-seen order, so a plain `HashMap` is never enough.
#[derive(Debug, Clone)]
pub struct OrderedGroups<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for OrderedGroups<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> OrderedGroups<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The group for `key`, created with `make` if this is the first sighting.
    pub fn entry_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> &mut V {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.index.insert(key.clone(), position);
                self.entries.push((key, make()));
                position
            }
        };
        &mut self.entries[position].1
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut().map(|(key, value)| (&*key, value))
    }
}

impl<K: Hash + Eq + Clone, V: Default> OrderedGroups<K, V> {
    pub fn entry(&mut self, key: K) -> &mut V {
        self.entry_or_insert_with(key, V::default)
    }
}

impl<K: Hash + Eq + Clone, T> OrderedGroups<K, Vec<T>> {
    pub fn push(&mut self, key: K, value: T) {
        self.entry(key).push(value);
    }
}

impl<K, V> IntoIterator for OrderedGroups<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Hash + Eq + Clone, V: Default> FromIterator<(K, V)> for OrderedGroups<K, V>
where
    V: Extend<<V as IntoIterator>::Item> + IntoIterator,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut groups = Self::new();
        for (key, value) in iter {
            groups.entry(key).extend(value);
        }
        groups
    }
}

/// An `f64` usable as a grouping key. Equality is bitwise, with `-0.0`
/// folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialOrd)]
pub struct FloatKey(pub f64);

impl FloatKey {
    fn bits(self) -> u64 {
        if self.0 == 0.0 {
            0.0f64.to_bits()
        } else {
            self.0.to_bits()
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for FloatKey {}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_first_seen_order() {
        let mut groups: OrderedGroups<&str, Vec<i32>> = OrderedGroups::new();
        groups.push("b", 1);
        groups.push("a", 2);
        groups.push("b", 3);
        groups.push("c", 4);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(groups.get(&"b"), Some(&vec![1, 3]));
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn collecting_merges_repeated_keys() {
        let groups: OrderedGroups<String, Vec<u8>> = vec![
            ("x".to_string(), vec![1]),
            ("y".to_string(), vec![2]),
            ("x".to_string(), vec![3, 4]),
        ]
        .into_iter()
        .collect();
        let merged: Vec<_> = groups.into_iter().collect();
        assert_eq!(
            merged,
            vec![("x".to_string(), vec![1, 3, 4]), ("y".to_string(), vec![2])]
        );
    }

    #[test]
    fn float_keys_fold_negative_zero() {
        let mut groups: OrderedGroups<FloatKey, usize> = OrderedGroups::new();
        *groups.entry(FloatKey(0.0)) += 1;
        *groups.entry(FloatKey(-0.0)) += 1;
        *groups.entry(FloatKey(0.05)) += 1;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get(&FloatKey(0.0)), Some(&2));
    }
}
