use std::collections::BTreeMap;

/// Per-run surrogate key allocator for one dimension. Keys are handed
/// out starting at 1 in insertion order; each transform run owns its
/// own index so repeated runs over the same snapshot assign identical
/// keys (builders insert in sorted source order).
#[derive(Debug, Clone)]
pub struct SurrogateIndex<K: Ord> {
    assigned: BTreeMap<K, u32>,
    next: u32,
}

impl<K: Ord + Clone> Default for SurrogateIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> SurrogateIndex<K> {
    pub fn new() -> Self {
        Self {
            assigned: BTreeMap::new(),
            next: 1,
        }
    }

    /// Returns the surrogate key for `key`, allocating the next key if
    /// this natural key has not been seen yet.
    pub fn get_or_insert(&mut self, key: K) -> u32 {
        if let Some(id) = self.assigned.get(&key) {
            return *id;
        }
        let id = self.next;
        self.next += 1;
        self.assigned.insert(key, id);
        id
    }

    pub fn get(&self, key: &K) -> Option<u32> {
        self.assigned.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_start_at_one_and_dedupe() {
        let mut index = SurrogateIndex::new();
        assert_eq!(index.get_or_insert("beauty"), 1);
        assert_eq!(index.get_or_insert("groceries"), 2);
        assert_eq!(index.get_or_insert("beauty"), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_get_without_insert() {
        let index: SurrogateIndex<&str> = SurrogateIndex::new();
        assert_eq!(index.get(&"missing"), None);
    }
}
